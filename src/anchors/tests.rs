use super::*;
use crate::events::HostEvent;
use crate::scene::{Geometry, Scene};
use nalgebra::{Matrix4, Vector3};

fn object_anchor(id: &str, extent: Vector3<f64>) -> Anchor {
    Anchor::new(
        AnchorId::new(id),
        AnchorKind::RecognizedObject {
            extent,
            reference_object_name: Some("chair".to_string()),
        },
    )
}

fn node_name(event: &HostEvent) -> &str {
    match event {
        HostEvent::NodeAdded { node_name, .. }
        | HostEvent::NodeUpdated { node_name, .. }
        | HostEvent::NodeRemoved { node_name, .. } => node_name,
        other => panic!("Unexpected event: {:?}", other),
    }
}

#[test]
fn test_identity_stable_across_lifecycle() {
    let mut scene = Scene::new();
    let mut sync = AnchorNodeSynchronizer::new();
    let anchor = object_anchor("a-1", Vector3::new(0.1, 0.1, 0.1));

    let added = sync.on_added(&anchor, &mut scene).unwrap();
    let updated1 = sync
        .on_updated(&object_anchor("a-1", Vector3::new(0.2, 0.1, 0.1)), &mut scene)
        .unwrap();
    let updated2 = sync
        .on_updated(&object_anchor("a-1", Vector3::new(0.3, 0.1, 0.1)), &mut scene)
        .unwrap();
    let removed = sync.on_removed(&anchor, &mut scene).unwrap();

    assert_eq!(added.method(), "didAddNodeForAnchor");
    assert_eq!(updated1.method(), "didUpdateNodeForAnchor");
    assert_eq!(removed.method(), "didRemoveNodeForAnchor");

    let name = node_name(&added);
    assert_eq!(node_name(&updated1), name);
    assert_eq!(node_name(&updated2), name);
    assert_eq!(node_name(&removed), name);
}

#[test]
fn test_single_geometry_after_many_updates() {
    let mut scene = Scene::new();
    let mut sync = AnchorNodeSynchronizer::new();
    let id = AnchorId::new("object");

    sync.on_added(&object_anchor("object", Vector3::repeat(0.1)), &mut scene);
    for i in 1..=25 {
        let extent = Vector3::new(0.1 + i as f64 * 0.01, 0.2, 0.3);
        sync.on_updated(&object_anchor("object", extent), &mut scene);
    }

    let binding = sync.binding(&id).unwrap();
    assert_eq!(scene.geometry_count(binding.representation_id), 1);
    assert_eq!(scene.node(binding.representation_id).unwrap().children.len(), 1);

    let wireframe = scene.node(binding.wireframe.unwrap()).unwrap();
    match &wireframe.geometry {
        Some(Geometry::Wireframe(outline)) => {
            assert!((outline.extent - Vector3::new(0.35, 0.2, 0.3)).norm() < 1e-12);
        }
        other => panic!("Unexpected geometry: {:?}", other),
    }
    assert_eq!(binding.kind.extent(), Some(Vector3::new(0.1 + 25.0 * 0.01, 0.2, 0.3)));
}

#[test]
fn test_unchanged_extent_keeps_geometry() {
    let mut scene = Scene::new();
    let mut sync = AnchorNodeSynchronizer::new();
    let anchor = object_anchor("same", Vector3::repeat(0.5));

    sync.on_added(&anchor, &mut scene);
    let wireframe = sync.binding(&anchor.identifier).unwrap().wireframe.unwrap();
    let before = scene.node(wireframe).unwrap().clone();

    let moved = anchor
        .clone()
        .with_transform(Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)));
    assert!(sync.on_updated(&moved, &mut scene).is_some());

    assert_eq!(scene.node(wireframe).unwrap(), &before);
    let representation = sync.binding(&anchor.identifier).unwrap().representation_id;
    assert_eq!(scene.node(representation).unwrap().transform, moved.transform);
}

#[test]
fn test_generic_and_mesh_anchors_get_no_geometry() {
    let mut scene = Scene::new();
    let mut sync = AnchorNodeSynchronizer::new();

    for (id, kind) in [("plain", AnchorKind::Generic), ("mesh", AnchorKind::Mesh)] {
        let anchor = Anchor::new(AnchorId::new(id), kind);
        let event = sync.on_added(&anchor, &mut scene).unwrap();
        assert_eq!(event.method(), "didAddNodeForAnchor");

        let binding = sync.binding(&anchor.identifier).unwrap();
        assert!(binding.wireframe.is_none());
        assert_eq!(scene.geometry_count(binding.representation_id), 0);

        assert!(sync.on_updated(&anchor, &mut scene).is_some());
    }

    assert_eq!(sync.len(), 2);
}

#[test]
fn test_removal_drops_representation_before_event() {
    let mut scene = Scene::new();
    let mut sync = AnchorNodeSynchronizer::new();
    let anchor = object_anchor("gone", Vector3::repeat(0.2));

    sync.on_added(&anchor, &mut scene);
    let binding = sync.binding(&anchor.identifier).unwrap().clone();

    let event = sync.on_removed(&anchor, &mut scene).unwrap();
    assert_eq!(node_name(&event), binding.node_name());
    assert!(!scene.contains(binding.representation_id));
    assert!(!scene.contains(binding.wireframe.unwrap()));
    assert!(sync.is_empty());
    assert!(scene.is_empty());
}

#[test]
fn test_out_of_order_notifications_are_ignored() {
    let mut scene = Scene::new();
    let mut sync = AnchorNodeSynchronizer::new();
    let anchor = object_anchor("late", Vector3::repeat(0.2));

    assert!(sync.on_updated(&anchor, &mut scene).is_none());
    assert!(sync.on_removed(&anchor, &mut scene).is_none());

    let first = sync.on_added(&anchor, &mut scene).unwrap();
    assert!(sync.on_added(&anchor, &mut scene).is_none());
    assert_eq!(sync.len(), 1);
    assert_eq!(scene.len(), 3);

    sync.on_removed(&anchor, &mut scene);
    let readded = sync.on_added(&anchor, &mut scene).unwrap();
    assert_ne!(node_name(&first), node_name(&readded));
}

#[test]
fn test_clear_removes_all_representations() {
    let mut scene = Scene::new();
    let mut sync = AnchorNodeSynchronizer::new();

    for i in 0..4 {
        sync.on_added(&object_anchor(&format!("a{}", i), Vector3::repeat(0.1)), &mut scene);
    }
    assert_eq!(scene.len(), 9);

    sync.clear(&mut scene);
    assert!(sync.is_empty());
    assert!(scene.is_empty());
}

#[test]
fn test_anchor_kind_deserializes_from_tagged_json() {
    let anchor: Anchor = serde_json::from_value(serde_json::json!({
        "identifier": "obj-9",
        "kind": { "type": "recognized_object", "extent": [0.1, 0.2, 0.3] }
    }))
    .unwrap();

    assert_eq!(anchor.kind.extent(), Some(Vector3::new(0.1, 0.2, 0.3)));
    assert_eq!(anchor.transform, Matrix4::identity());
    assert_eq!(anchor.kind.type_name(), "ARObjectAnchor");
}
