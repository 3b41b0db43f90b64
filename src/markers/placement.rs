use crate::config::MarkerConfig;
use crate::frame::TrackedFrame;
use crate::scene::{Geometry, NodeId, Scene};

use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion, Vector3};
use tracing::debug;

/// World transform for a marker `distance` meters in front of the camera, facing back at it
pub fn marker_transform(
    camera_position: Vector3<f64>,
    forward: Vector3<f64>,
    distance: f64,
) -> Matrix4<f64> {
    let target = camera_position + forward * distance;

    let up = if forward.y.abs() > 0.999 {
        Vector3::z()
    } else {
        Vector3::y()
    };
    let orientation = UnitQuaternion::face_towards(&-forward, &up);

    Isometry3::from_parts(Translation3::from(target), orientation).to_homogeneous()
}

/// Creates pyramid marker nodes in front of the camera
#[derive(Debug, Clone)]
pub struct MarkerPlacer {
    config: MarkerConfig,
}

impl MarkerPlacer {
    pub fn new(config: MarkerConfig) -> Self {
        Self { config }
    }

    /// Attach a marker for `frame` under the scene root
    pub fn place(&self, scene: &mut Scene, frame: &TrackedFrame) -> Option<NodeId> {
        let transform = marker_transform(
            frame.camera_position(),
            frame.camera_forward(),
            self.config.distance_from_camera,
        );

        let geometry = Geometry::Pyramid {
            width: self.config.pyramid_width,
            height: self.config.pyramid_height,
            length: self.config.pyramid_width,
        };

        let node = scene.add_node(scene.root(), transform, Some(geometry))?;
        debug!("Placed marker node {} at t={:.3}", node, frame.timestamp);
        Some(node)
    }
}
