use super::geometry::Geometry;

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Stable identity of a scene node; its string form is the node name shared with the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated().to_string().to_uppercase())
    }
}

/// A locally owned representation in the tracked space
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Local transform relative to the parent
    pub transform: Matrix4<f64>,
    /// At most one geometry per node; replaced in place, never appended
    pub geometry: Option<Geometry>,
}

impl SceneNode {
    fn new(id: NodeId, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name: id.to_string(),
            parent,
            children: Vec::new(),
            transform: Matrix4::identity(),
            geometry: None,
        }
    }
}

/// Arena of scene nodes rooted at a single root node.
///
/// Owned by the tracking context; never shared across threads.
#[derive(Debug)]
pub struct Scene {
    root: NodeId,
    nodes: HashMap<NodeId, SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        let root = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(root, SceneNode::new(root, None));
        Self { root, nodes }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a node under `parent`. Returns `None` when the parent does not exist.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        transform: Matrix4<f64>,
        geometry: Option<Geometry>,
    ) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            debug!("Cannot attach node to missing parent {}", parent);
            return None;
        }

        let id = NodeId::new();
        let mut node = SceneNode::new(id, Some(parent));
        node.transform = transform;
        node.geometry = geometry;

        self.nodes.insert(id, node);
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }

        Some(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Update the local transform of a node
    pub fn set_transform(&mut self, id: NodeId, transform: Matrix4<f64>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Overwrite the geometry slot of a node
    pub fn set_geometry(&mut self, id: NodeId, geometry: Geometry) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.geometry = Some(geometry);
                true
            }
            None => false,
        }
    }

    /// Detach and drop a node with all of its descendants. Returns the number of nodes removed.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        if id == self.root {
            debug!("Refusing to remove the scene root");
            return 0;
        }

        let Some(parent) = self.nodes.get(&id).map(|node| node.parent) else {
            return 0;
        };

        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != id);
            }
        }

        let mut removed = 0;
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children);
                removed += 1;
            }
        }

        removed
    }

    /// Number of nodes carrying a geometry in the subtree rooted at `id`
    pub fn geometry_count(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.get(&next) {
                if node.geometry.is_some() {
                    count += 1;
                }
                pending.extend(node.children.iter().copied());
            }
        }
        count
    }

    /// Total node count, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Nodes directly under the root whose geometry matches `kind`
    pub fn top_level_with_geometry(&self, kind: &str) -> Vec<&SceneNode> {
        self.nodes
            .get(&self.root)
            .map(|root| {
                root.children
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .filter(|node| node.geometry.as_ref().map(Geometry::kind) == Some(kind))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every node except the root
    pub fn clear(&mut self) {
        let root = self.root;
        self.nodes.retain(|id, _| *id == root);
        if let Some(root_node) = self.nodes.get_mut(&root) {
            root_node.children.clear();
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
