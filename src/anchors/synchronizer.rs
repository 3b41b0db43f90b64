use super::types::{Anchor, AnchorId, AnchorKind};
use crate::events::HostEvent;
use crate::scene::{Geometry, NodeId, Scene};

use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Local record tying a live anchor to the representation node that stands for it
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorBinding {
    pub anchor_id: AnchorId,
    /// Assigned on first sight, never regenerated
    pub representation_id: NodeId,
    pub kind: AnchorKind,
    /// Single wireframe slot for recognized objects
    pub wireframe: Option<NodeId>,
}

impl AnchorBinding {
    /// Name of the representation node shared with the host
    pub fn node_name(&self) -> String {
        self.representation_id.to_string()
    }
}

/// Keeps scene representations in step with the anchors reported by the tracking host.
///
/// Each anchor moves through `Unbound -> Bound -> Removed`. Lifecycle
/// notifications that do not fit the current state are logged and dropped.
#[derive(Debug, Default)]
pub struct AnchorNodeSynchronizer {
    bindings: HashMap<AnchorId, AnchorBinding>,
}

impl AnchorNodeSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a newly reported anchor and build its representation
    pub fn on_added(&mut self, anchor: &Anchor, scene: &mut Scene) -> Option<HostEvent> {
        if self.bindings.contains_key(&anchor.identifier) {
            warn!(
                "Anchor {} reported as added while already bound, ignoring",
                anchor.identifier
            );
            return None;
        }

        let Some(representation_id) = scene.add_node(scene.root(), anchor.transform, None) else {
            warn!("Failed to create representation for anchor {}", anchor.identifier);
            return None;
        };

        let wireframe = match &anchor.kind {
            AnchorKind::RecognizedObject { extent, .. } => {
                info!(
                    "Object recognized for anchor {} with extent ({:.3}, {:.3}, {:.3})",
                    anchor.identifier, extent.x, extent.y, extent.z
                );
                scene.add_node(
                    representation_id,
                    nalgebra::Matrix4::identity(),
                    Some(Geometry::wireframe(*extent)),
                )
            }
            AnchorKind::Generic | AnchorKind::Mesh => None,
        };

        let binding = AnchorBinding {
            anchor_id: anchor.identifier.clone(),
            representation_id,
            kind: anchor.kind.clone(),
            wireframe,
        };
        let node_name = binding.node_name();

        debug!(
            "Bound anchor {} ({}) to node {}",
            anchor.identifier,
            anchor.kind.type_name(),
            node_name
        );
        self.bindings.insert(anchor.identifier.clone(), binding);

        Some(HostEvent::NodeAdded {
            anchor: anchor.clone(),
            node_name,
        })
    }

    /// Apply a geometry change reported for a bound anchor
    pub fn on_updated(&mut self, anchor: &Anchor, scene: &mut Scene) -> Option<HostEvent> {
        let Some(binding) = self.bindings.get_mut(&anchor.identifier) else {
            warn!(
                "Update for unbound anchor {}, ignoring",
                anchor.identifier
            );
            return None;
        };

        scene.set_transform(binding.representation_id, anchor.transform);

        if let (
            AnchorKind::RecognizedObject { extent: bound, .. },
            AnchorKind::RecognizedObject { extent: reported, .. },
        ) = (&mut binding.kind, &anchor.kind)
        {
            if bound != reported {
                match binding.wireframe {
                    Some(wireframe) if scene.contains(wireframe) => {
                        scene.set_geometry(wireframe, Geometry::wireframe(*reported));
                    }
                    _ => {
                        binding.wireframe = scene.add_node(
                            binding.representation_id,
                            nalgebra::Matrix4::identity(),
                            Some(Geometry::wireframe(*reported)),
                        );
                    }
                }
                debug!(
                    "Regenerated wireframe for anchor {} ({:.3}, {:.3}, {:.3})",
                    anchor.identifier, reported.x, reported.y, reported.z
                );
                *bound = *reported;
            }
        }

        Some(HostEvent::NodeUpdated {
            anchor: anchor.clone(),
            node_name: binding.node_name(),
        })
    }

    /// Tear down the representation of a removed anchor and forget its binding
    pub fn on_removed(&mut self, anchor: &Anchor, scene: &mut Scene) -> Option<HostEvent> {
        let Some(binding) = self.bindings.remove(&anchor.identifier) else {
            warn!(
                "Removal of unbound anchor {}, ignoring",
                anchor.identifier
            );
            return None;
        };

        let removed = scene.remove_subtree(binding.representation_id);
        debug!(
            "Removed {} scene nodes for anchor {}",
            removed, anchor.identifier
        );

        Some(HostEvent::NodeRemoved {
            anchor: anchor.clone(),
            node_name: binding.node_name(),
        })
    }

    pub fn binding(&self, anchor_id: &AnchorId) -> Option<&AnchorBinding> {
        self.bindings.get(anchor_id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Drop every binding and its representation (session teardown)
    pub fn clear(&mut self, scene: &mut Scene) {
        for (_, binding) in self.bindings.drain() {
            scene.remove_subtree(binding.representation_id);
        }
    }
}
