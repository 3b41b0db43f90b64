use bytes::Bytes;
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ArSceneError, Result};

/// Pixel layout of a captured camera image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// 8-bit RGB, 3 bytes per pixel
    Rgb8,
    /// 8-bit RGBA, 4 bytes per pixel
    Rgba8,
    /// 8-bit luminance, 1 byte per pixel
    Gray8,
}

impl ImageFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ImageFormat::Rgb8 => 3,
            ImageFormat::Rgba8 => 4,
            ImageFormat::Gray8 => 1,
        }
    }
}

/// Opaque camera image delivered with each tracking frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraImage {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Raw pixel data (cheap to clone across the classification hand-off)
    pub data: Bytes,
}

impl CameraImage {
    pub fn new(width: u32, height: u32, format: ImageFormat, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            format,
            data: data.into(),
        }
    }

    /// Expected buffer length for the declared dimensions and format
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Validate buffer length against the declared dimensions
    pub fn validate_size(&self) -> bool {
        self.data.len() == self.expected_size()
    }

    /// Encode the image as PNG
    #[cfg(feature = "image_encoding")]
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        use image::codecs::png::PngEncoder;
        use image::{ColorType, ImageEncoder};

        if !self.validate_size() {
            return Err(ArSceneError::ImageEncoding {
                details: format!(
                    "buffer has {} bytes, expected {} for {}x{} {:?}",
                    self.data.len(),
                    self.expected_size(),
                    self.width,
                    self.height,
                    self.format
                ),
            });
        }

        let color_type = match self.format {
            ImageFormat::Rgb8 => ColorType::Rgb8,
            ImageFormat::Rgba8 => ColorType::Rgba8,
            ImageFormat::Gray8 => ColorType::L8,
        };

        let mut encoded = Vec::new();
        PngEncoder::new(&mut encoded)
            .write_image(&self.data, self.width, self.height, color_type)
            .map_err(|e| ArSceneError::ImageEncoding {
                details: e.to_string(),
            })?;

        Ok(encoded)
    }

    #[cfg(not(feature = "image_encoding"))]
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        Err(ArSceneError::ImageEncoding {
            details: "image_encoding feature not enabled".to_string(),
        })
    }
}

/// A single frame reported by the tracking host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedFrame {
    /// Host timestamp in seconds
    pub timestamp: f64,
    /// Camera-to-world transform, serialized column-major
    #[serde(with = "column_major")]
    pub camera_transform: Matrix4<f64>,
    pub image: CameraImage,
}

impl TrackedFrame {
    pub fn new(timestamp: f64, camera_transform: Matrix4<f64>, image: CameraImage) -> Self {
        Self {
            timestamp,
            camera_transform,
            image,
        }
    }

    /// Camera position in world space (translation column)
    pub fn camera_position(&self) -> Vector3<f64> {
        translation_of(&self.camera_transform)
    }

    /// Unit vector the camera is looking along. The camera looks down its -Z axis.
    pub fn camera_forward(&self) -> Vector3<f64> {
        let back = Vector3::new(
            self.camera_transform[(0, 2)],
            self.camera_transform[(1, 2)],
            self.camera_transform[(2, 2)],
        );
        (-back).try_normalize(f64::EPSILON).unwrap_or_else(|| -Vector3::z())
    }

    /// Pose sample derived from this frame
    pub fn pose_sample(&self) -> PoseSample {
        PoseSample::new(self.timestamp, self.camera_position())
    }
}

/// A timestamped camera position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub timestamp: f64,
    pub position: Vector3<f64>,
}

impl PoseSample {
    pub fn new(timestamp: f64, position: Vector3<f64>) -> Self {
        Self {
            timestamp,
            position,
        }
    }
}

/// Translation column of a homogeneous transform
pub fn translation_of(transform: &Matrix4<f64>) -> Vector3<f64> {
    Vector3::new(transform[(0, 3)], transform[(1, 3)], transform[(2, 3)])
}

/// Serialize a 4x4 matrix as 16 column-major values
pub mod column_major {
    use nalgebra::Matrix4;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(matrix: &Matrix4<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut values = [0.0f64; 16];
        values.copy_from_slice(matrix.as_slice());
        values.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Matrix4<f64>, D::Error> {
        let values = <[f64; 16]>::deserialize(deserializer)?;
        Ok(Matrix4::from_column_slice(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    #[test]
    fn test_camera_position_from_transform() {
        let image = CameraImage::new(1, 1, ImageFormat::Gray8, vec![0u8]);
        let frame = TrackedFrame::new(1.5, translation(1.0, 2.0, 3.0), image);

        assert_eq!(frame.camera_position(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(frame.pose_sample().timestamp, 1.5);
    }

    #[test]
    fn test_identity_camera_looks_down_negative_z() {
        let image = CameraImage::new(1, 1, ImageFormat::Gray8, vec![0u8]);
        let frame = TrackedFrame::new(0.0, Matrix4::identity(), image);

        assert_eq!(frame.camera_forward(), Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_image_size_validation() {
        let ok = CameraImage::new(2, 2, ImageFormat::Rgb8, vec![0u8; 12]);
        let short = CameraImage::new(2, 2, ImageFormat::Rgba8, vec![0u8; 12]);

        assert!(ok.validate_size());
        assert!(!short.validate_size());
    }

    #[cfg(feature = "image_encoding")]
    #[test]
    fn test_png_encoding() {
        let image = CameraImage::new(2, 2, ImageFormat::Rgb8, vec![255u8; 12]);
        let png = image.encode_png().unwrap();

        assert_eq!(&png[1..4], b"PNG");
        assert!(CameraImage::new(4, 4, ImageFormat::Rgb8, vec![0u8; 3])
            .encode_png()
            .is_err());
    }

    #[test]
    fn test_frame_json_uses_column_major_transform() {
        let image = CameraImage::new(1, 1, ImageFormat::Gray8, vec![7u8]);
        let frame = TrackedFrame::new(0.25, translation(4.0, 5.0, 6.0), image);

        let json = serde_json::to_value(&frame).unwrap();
        let transform = json["camera_transform"].as_array().unwrap();
        assert_eq!(transform.len(), 16);
        assert_eq!(transform[12].as_f64(), Some(4.0));
        assert_eq!(transform[14].as_f64(), Some(6.0));

        let decoded: TrackedFrame = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, frame);
    }
}
