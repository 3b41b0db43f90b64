use crate::config::SessionDefaults;
use crate::error::CommandError;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneDetection {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

impl PlaneDetection {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(PlaneDetection::None),
            1 => Some(PlaneDetection::Horizontal),
            2 => Some(PlaneDetection::Vertical),
            3 => Some(PlaneDetection::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentTexturing {
    #[default]
    None,
    Manual,
    Automatic,
}

impl EnvironmentTexturing {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(EnvironmentTexturing::None),
            1 => Some(EnvironmentTexturing::Manual),
            2 => Some(EnvironmentTexturing::Automatic),
            _ => None,
        }
    }
}

/// Image the host should detect, with its real-world width in meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    pub name: String,
    pub physical_width: f64,
}

/// Session types a host may be able to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationKind {
    WorldTracking,
    ObjectScanning,
}

impl ConfigurationKind {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(ConfigurationKind::WorldTracking),
            1 => Some(ConfigurationKind::ObjectScanning),
            _ => None,
        }
    }
}

/// Lookup of named resource groups bundled with the host application
pub trait ResourceCatalog: Send + Sync {
    fn image_group(&self, name: &str) -> Option<Vec<ReferenceImage>>;

    /// Names of the reference objects in a group
    fn object_group(&self, name: &str) -> Option<Vec<String>>;

    fn supports(&self, _kind: ConfigurationKind) -> bool {
        true
    }
}

/// In-memory catalog, used by the replay binary and tests
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    images: HashMap<String, Vec<ReferenceImage>>,
    objects: HashMap<String, Vec<String>>,
    unsupported: Vec<ConfigurationKind>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_group<S: Into<String>>(mut self, name: S, images: Vec<ReferenceImage>) -> Self {
        self.images.insert(name.into(), images);
        self
    }

    pub fn with_object_group<S: Into<String>>(mut self, name: S, objects: Vec<String>) -> Self {
        self.objects.insert(name.into(), objects);
        self
    }

    pub fn without_support_for(mut self, kind: ConfigurationKind) -> Self {
        self.unsupported.push(kind);
        self
    }
}

impl ResourceCatalog for StaticCatalog {
    fn image_group(&self, name: &str) -> Option<Vec<ReferenceImage>> {
        self.images.get(name).cloned()
    }

    fn object_group(&self, name: &str) -> Option<Vec<String>> {
        self.objects.get(name).cloned()
    }

    fn supports(&self, kind: ConfigurationKind) -> bool {
        !self.unsupported.contains(&kind)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldTrackingConfiguration {
    pub plane_detection: PlaneDetection,
    pub environment_texturing: EnvironmentTexturing,
    pub detection_images: Vec<ReferenceImage>,
    pub maximum_number_of_tracked_images: u32,
    pub detection_objects: Vec<String>,
    pub scene_reconstruction: bool,
}

/// Session configuration resolved from `init` options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingConfiguration {
    WorldTracking(WorldTrackingConfiguration),
    ObjectScanning,
}

impl TrackingConfiguration {
    pub fn kind(&self) -> ConfigurationKind {
        match self {
            TrackingConfiguration::WorldTracking(_) => ConfigurationKind::WorldTracking,
            TrackingConfiguration::ObjectScanning => ConfigurationKind::ObjectScanning,
        }
    }

    /// Resolve host options on top of the configured session defaults.
    ///
    /// Unknown codes and missing resource groups are logged and leave the
    /// feature disabled; only an unsupported session type is an error.
    pub fn from_options(
        options: &Map<String, Value>,
        defaults: &SessionDefaults,
        catalog: &dyn ResourceCatalog,
    ) -> Result<Self, CommandError> {
        let kind_code = options.get("configuration").and_then(Value::as_u64).unwrap_or(0);
        let kind = ConfigurationKind::from_code(kind_code).ok_or_else(|| {
            CommandError::Unsupported {
                configuration: format!("configuration code {}", kind_code),
            }
        })?;

        if !catalog.supports(kind) {
            return Err(CommandError::Unsupported {
                configuration: format!("{:?}", kind),
            });
        }

        match kind {
            ConfigurationKind::ObjectScanning => {
                info!("Using object scanning configuration");
                Ok(TrackingConfiguration::ObjectScanning)
            }
            ConfigurationKind::WorldTracking => {
                let world = world_tracking(options, defaults, catalog);
                info!(
                    "Using world tracking configuration (planes: {:?}, texturing: {:?}, {} images, {} objects)",
                    world.plane_detection,
                    world.environment_texturing,
                    world.detection_images.len(),
                    world.detection_objects.len()
                );
                Ok(TrackingConfiguration::WorldTracking(world))
            }
        }
    }
}

fn world_tracking(
    options: &Map<String, Value>,
    defaults: &SessionDefaults,
    catalog: &dyn ResourceCatalog,
) -> WorldTrackingConfiguration {
    let mut world = WorldTrackingConfiguration {
        scene_reconstruction: defaults.scene_reconstruction,
        ..Default::default()
    };

    let plane_code = options
        .get("planeDetection")
        .and_then(Value::as_u64)
        .unwrap_or(defaults.plane_detection as u64);
    match PlaneDetection::from_code(plane_code) {
        Some(plane_detection) => world.plane_detection = plane_detection,
        None => warn!("Unknown plane detection code {}, plane detection disabled", plane_code),
    }

    let texturing_code = options
        .get("environmentTexturing")
        .and_then(Value::as_u64)
        .unwrap_or(defaults.environment_texturing as u64);
    match EnvironmentTexturing::from_code(texturing_code) {
        Some(texturing) => world.environment_texturing = texturing,
        None => warn!(
            "Unknown environment texturing code {}, texturing disabled",
            texturing_code
        ),
    }

    let image_group = options
        .get("detectionImagesGroupName")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| defaults.detection_images_group_name.clone());
    if let Some(group) = image_group {
        match catalog.image_group(&group) {
            Some(images) => world.detection_images = images,
            None => warn!("Detection image group '{}' not found, image detection disabled", group),
        }
    }

    // Inline images replace any group lookup
    if let Some(images) = options.get("detectionImages") {
        match serde_json::from_value::<Vec<ReferenceImage>>(images.clone()) {
            Ok(images) => world.detection_images = images,
            Err(e) => warn!("Ignoring malformed detectionImages: {}", e),
        }
    }

    let tracked_images = options
        .get("maximumNumberOfTrackedImages")
        .and_then(Value::as_u64)
        .and_then(|count| match u32::try_from(count) {
            Ok(count) => Some(count),
            Err(_) => {
                warn!("Ignoring out of range maximumNumberOfTrackedImages {}", count);
                None
            }
        });
    world.maximum_number_of_tracked_images = tracked_images
        .or(defaults.maximum_number_of_tracked_images)
        .unwrap_or(0);

    let object_group = options
        .get("referenceObjectsGroupName")
        .and_then(Value::as_str)
        .unwrap_or(&defaults.reference_objects_group_name);
    match catalog.object_group(object_group) {
        Some(objects) => {
            debug!("Loaded {} reference objects from '{}'", objects.len(), object_group);
            world.detection_objects = objects;
        }
        None => warn!(
            "Reference object group '{}' not found, object detection disabled",
            object_group
        ),
    }

    if let Some(reconstruction) = options.get("sceneReconstruction").and_then(Value::as_bool) {
        world.scene_reconstruction = reconstruction;
    }

    world
}
