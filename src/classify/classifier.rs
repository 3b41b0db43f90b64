use crate::error::ClassifierError;
use crate::frame::CameraImage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Top observation returned by a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl Classification {
    pub fn new<S: Into<String>>(label: S, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Text shown in the scene, e.g. `cup (87%)`
    pub fn display_text(&self) -> String {
        format!("{} ({}%)", self.label, (self.confidence * 100.0) as u32)
    }
}

/// Image classification backend.
///
/// Called off the tracking context; implementations may take as long as
/// they need without stalling pose processing.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: CameraImage) -> Result<Classification, ClassifierError>;

    /// Name used in log messages
    fn name(&self) -> &str;
}

/// Classifier that answers every request with the same label
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    classification: Classification,
}

impl StaticClassifier {
    pub fn new<S: Into<String>>(label: S, confidence: f32) -> Self {
        Self {
            classification: Classification::new(label, confidence),
        }
    }
}

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(&self, image: CameraImage) -> Result<Classification, ClassifierError> {
        if image.data.is_empty() {
            return Err(ClassifierError::Inference {
                details: "empty image buffer".to_string(),
            });
        }
        Ok(self.classification.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ImageFormat;

    #[test]
    fn test_display_text_truncates_percent() {
        assert_eq!(Classification::new("cup", 0.876).display_text(), "cup (87%)");
        assert_eq!(Classification::new("chair", 1.0).display_text(), "chair (100%)");
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Classification::new("x", 1.7).confidence, 1.0);
        assert_eq!(Classification::new("x", -0.2).confidence, 0.0);
    }

    #[tokio::test]
    async fn test_static_classifier() {
        let classifier = StaticClassifier::new("keyboard", 0.9);
        let image = CameraImage::new(1, 1, ImageFormat::Gray8, vec![1u8]);

        let result = classifier.classify(image).await.unwrap();
        assert_eq!(result.label, "keyboard");

        let empty = CameraImage::new(0, 0, ImageFormat::Gray8, Vec::new());
        assert!(classifier.classify(empty).await.is_err());
    }
}
