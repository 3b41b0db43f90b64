mod commands;
mod configuration;

pub use commands::{CommandResponse, HostCommand};
pub use configuration::{
    ConfigurationKind, EnvironmentTexturing, PlaneDetection, ReferenceImage, ResourceCatalog,
    StaticCatalog, TrackingConfiguration, WorldTrackingConfiguration,
};
