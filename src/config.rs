use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ArSceneConfig {
    pub motion: MotionConfig,
    pub markers: MarkerConfig,
    pub classifier: ClassifierConfig,
    pub events: EventConfig,
    pub session: SessionDefaults,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MotionConfig {
    /// Minimum camera displacement (meters) that counts as movement
    #[serde(default = "default_min_position_delta")]
    pub min_position_delta: f64,

    /// Speed (meters/second) above which a too-fast warning is raised
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,

    /// Minimum seconds between two too-fast warnings
    #[serde(default = "default_velocity_warning_cooldown")]
    pub velocity_warning_cooldown_seconds: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MarkerConfig {
    /// Distance in front of the camera where markers are placed
    #[serde(default = "default_marker_distance")]
    pub distance_from_camera: f64,

    /// Pyramid base width and length
    #[serde(default = "default_pyramid_width")]
    pub pyramid_width: f64,

    /// Pyramid height
    #[serde(default = "default_pyramid_height")]
    pub pyramid_height: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Submit frames for classification at all
    #[serde(default = "default_classifier_enabled")]
    pub enabled: bool,

    /// Cap on concurrently running classifications (unbounded when unset)
    #[serde(default)]
    pub max_in_flight: Option<usize>,

    /// Label returned by the fixed-label classifier used for replays
    #[serde(default)]
    pub static_label: Option<String>,

    /// Confidence reported alongside `static_label`
    #[serde(default = "default_static_confidence")]
    pub static_confidence: f32,

    /// Uniform scale applied to classification label nodes
    #[serde(default = "default_label_scale")]
    pub label_scale: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventConfig {
    /// Host event channel capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Log every published event at debug level
    #[serde(default)]
    pub debug_logging: bool,

    /// Forward renderer ticks as updateAtTime events
    #[serde(default = "default_emit_update_at_time")]
    pub emit_update_at_time: bool,

    /// Encode camera images as PNG before sending them to the host
    #[serde(default = "default_encode_images_as_png")]
    pub encode_images_as_png: bool,
}

/// Session options applied when the host sends `init` without overriding them
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionDefaults {
    /// 0 = none, 1 = horizontal, 2 = vertical, 3 = both
    #[serde(default)]
    pub plane_detection: u8,

    /// 0 = none, 1 = manual, 2 = automatic
    #[serde(default)]
    pub environment_texturing: u8,

    #[serde(default)]
    pub detection_images_group_name: Option<String>,

    #[serde(default = "default_reference_objects_group")]
    pub reference_objects_group_name: String,

    #[serde(default = "default_scene_reconstruction")]
    pub scene_reconstruction: bool,

    #[serde(default)]
    pub maximum_number_of_tracked_images: Option<u32>,
}

impl ArSceneConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("arscene.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("motion.min_position_delta", default_min_position_delta())?
            .set_default("motion.max_velocity", default_max_velocity())?
            .set_default(
                "motion.velocity_warning_cooldown_seconds",
                default_velocity_warning_cooldown(),
            )?
            .set_default("markers.distance_from_camera", default_marker_distance())?
            .set_default("markers.pyramid_width", default_pyramid_width())?
            .set_default("markers.pyramid_height", default_pyramid_height())?
            .set_default("classifier.enabled", default_classifier_enabled())?
            .set_default(
                "classifier.static_confidence",
                default_static_confidence() as f64,
            )?
            .set_default("classifier.label_scale", default_label_scale())?
            .set_default(
                "events.channel_capacity",
                default_channel_capacity() as i64,
            )?
            .set_default("events.debug_logging", false)?
            .set_default("events.emit_update_at_time", default_emit_update_at_time())?
            .set_default(
                "events.encode_images_as_png",
                default_encode_images_as_png(),
            )?
            .set_default("session.plane_detection", 0)?
            .set_default("session.environment_texturing", 0)?
            .set_default(
                "session.reference_objects_group_name",
                default_reference_objects_group(),
            )?
            .set_default(
                "session.scene_reconstruction",
                default_scene_reconstruction(),
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with ARSCENE_ prefix, sections split on "__"
            .add_source(
                Environment::with_prefix("ARSCENE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ArSceneConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.motion.min_position_delta > 0.0) {
            return Err(ConfigError::Message(
                "Motion min_position_delta must be greater than 0".to_string(),
            ));
        }

        if !(self.motion.max_velocity > 0.0) {
            return Err(ConfigError::Message(
                "Motion max_velocity must be greater than 0".to_string(),
            ));
        }

        if !(self.motion.velocity_warning_cooldown_seconds >= 0.0) {
            return Err(ConfigError::Message(
                "Motion velocity_warning_cooldown_seconds must not be negative".to_string(),
            ));
        }

        if !(self.markers.distance_from_camera >= 0.0) {
            return Err(ConfigError::Message(
                "Marker distance_from_camera must not be negative".to_string(),
            ));
        }

        if self.classifier.max_in_flight == Some(0) {
            return Err(ConfigError::Message(
                "Classifier max_in_flight must be greater than 0 when set".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.classifier.static_confidence) {
            return Err(ConfigError::Message(
                "Classifier static_confidence must be within [0, 1]".to_string(),
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "Event channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.session.plane_detection > 3 {
            return Err(ConfigError::Message(
                "Session plane_detection must be between 0 and 3".to_string(),
            ));
        }

        if self.session.environment_texturing > 2 {
            return Err(ConfigError::Message(
                "Session environment_texturing must be between 0 and 2".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for ArSceneConfig {
    fn default() -> Self {
        Self {
            motion: MotionConfig::default(),
            markers: MarkerConfig::default(),
            classifier: ClassifierConfig::default(),
            events: EventConfig::default(),
            session: SessionDefaults::default(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            min_position_delta: default_min_position_delta(),
            max_velocity: default_max_velocity(),
            velocity_warning_cooldown_seconds: default_velocity_warning_cooldown(),
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            distance_from_camera: default_marker_distance(),
            pyramid_width: default_pyramid_width(),
            pyramid_height: default_pyramid_height(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: default_classifier_enabled(),
            max_in_flight: None,
            static_label: None,
            static_confidence: default_static_confidence(),
            label_scale: default_label_scale(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            debug_logging: false,
            emit_update_at_time: default_emit_update_at_time(),
            encode_images_as_png: default_encode_images_as_png(),
        }
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            plane_detection: 0,
            environment_texturing: 0,
            detection_images_group_name: None,
            reference_objects_group_name: default_reference_objects_group(),
            scene_reconstruction: default_scene_reconstruction(),
            maximum_number_of_tracked_images: None,
        }
    }
}

// Default value functions
fn default_min_position_delta() -> f64 {
    0.05
}
fn default_max_velocity() -> f64 {
    1.0
}
fn default_velocity_warning_cooldown() -> f64 {
    5.0
}

fn default_marker_distance() -> f64 {
    0.1
}
fn default_pyramid_width() -> f64 {
    0.05
}
fn default_pyramid_height() -> f64 {
    0.02
}

fn default_classifier_enabled() -> bool {
    true
}
fn default_static_confidence() -> f32 {
    0.5
}
fn default_label_scale() -> f64 {
    0.002
}

fn default_channel_capacity() -> usize {
    256
}
fn default_emit_update_at_time() -> bool {
    true
}
fn default_encode_images_as_png() -> bool {
    true
}

fn default_reference_objects_group() -> String {
    "ARObjects".to_string()
}
fn default_scene_reconstruction() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::env;
    use std::io::Write;

    // Environment overrides are process-wide
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = ArSceneConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.motion.min_position_delta, 0.05);
        assert_eq!(config.motion.max_velocity, 1.0);
        assert_eq!(config.motion.velocity_warning_cooldown_seconds, 5.0);
        assert_eq!(config.classifier.max_in_flight, None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ArSceneConfig::default();
        config.motion.min_position_delta = 0.0;
        assert!(config.validate().is_err());

        config.motion.min_position_delta = 0.05;
        config.classifier.max_in_flight = Some(0);
        assert!(config.validate().is_err());

        config.classifier.max_in_flight = Some(4);
        config.events.channel_capacity = 0;
        assert!(config.validate().is_err());

        config.events.channel_capacity = 16;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let _env = ENV_LOCK.lock();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[motion]\nmin_position_delta = 0.1\n\n[classifier]\nmax_in_flight = 2\nstatic_label = \"cup\""
        )
        .unwrap();

        let config = ArSceneConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.motion.min_position_delta, 0.1);
        assert_eq!(config.motion.max_velocity, 1.0);
        assert_eq!(config.classifier.max_in_flight, Some(2));
        assert_eq!(config.classifier.static_label.as_deref(), Some("cup"));
        assert_eq!(config.session.reference_objects_group_name, "ARObjects");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let _env = ENV_LOCK.lock();
        let config = ArSceneConfig::load_from_file("/nonexistent/arscene.toml").unwrap();
        assert_eq!(config, ArSceneConfig::default());
    }

    #[test]
    fn test_environment_overrides_file_and_defaults() {
        let _env = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("arscene.toml");

        env::set_var("ARSCENE_MOTION__MAX_VELOCITY", "7.5");
        env::set_var("ARSCENE_CLASSIFIER__LABEL_SCALE", "0.01");
        let loaded = ArSceneConfig::load_from_file(&missing);
        env::remove_var("ARSCENE_MOTION__MAX_VELOCITY");
        env::remove_var("ARSCENE_CLASSIFIER__LABEL_SCALE");

        let config = loaded.unwrap();
        assert_eq!(config.motion.max_velocity, 7.5);
        assert_eq!(config.classifier.label_scale, 0.01);
        assert_eq!(config.motion.min_position_delta, 0.05);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let rendered = ArSceneConfig::default().to_toml().unwrap();
        let parsed: ArSceneConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, ArSceneConfig::default());
    }
}
