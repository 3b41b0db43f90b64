use crate::frame::column_major;

use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Identity of an anchor as reported by the tracking host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(String);

impl AnchorId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anchor subtype, decided once when the anchor is first seen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnchorKind {
    Generic,
    RecognizedObject {
        extent: Vector3<f64>,
        #[serde(default)]
        reference_object_name: Option<String>,
    },
    Mesh,
}

impl AnchorKind {
    /// Host-side type name
    pub fn type_name(&self) -> &'static str {
        match self {
            AnchorKind::Generic => "ARAnchor",
            AnchorKind::RecognizedObject { .. } => "ARObjectAnchor",
            AnchorKind::Mesh => "ARMeshAnchor",
        }
    }

    pub fn extent(&self) -> Option<Vector3<f64>> {
        match self {
            AnchorKind::RecognizedObject { extent, .. } => Some(*extent),
            _ => None,
        }
    }
}

/// Snapshot of an anchor carried by a lifecycle notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub identifier: AnchorId,
    pub kind: AnchorKind,
    #[serde(with = "column_major", default = "Matrix4::identity")]
    pub transform: Matrix4<f64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Anchor {
    pub fn new(identifier: AnchorId, kind: AnchorKind) -> Self {
        Self {
            identifier,
            kind,
            transform: Matrix4::identity(),
            name: None,
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    /// Serialized anchor fields sent with anchor lifecycle events
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("identifier".to_string(), json!(self.identifier.as_str()));
        params.insert("anchorType".to_string(), json!(self.kind.type_name()));
        params.insert("transform".to_string(), json!(self.transform.as_slice()));

        if let Some(name) = &self.name {
            params.insert("name".to_string(), json!(name));
        }

        if let AnchorKind::RecognizedObject {
            extent,
            reference_object_name,
        } = &self.kind
        {
            params.insert("extent".to_string(), json!([extent.x, extent.y, extent.z]));
            if let Some(reference) = reference_object_name {
                params.insert("referenceObjectName".to_string(), json!(reference));
            }
        }

        params
    }
}
