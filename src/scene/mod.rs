mod geometry;
mod graph;

pub use geometry::{Geometry, WireframeBox, WIREFRAME_EDGE_INDICES};
pub use graph::{NodeId, Scene, SceneNode};
