pub mod anchors;
pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod host;
pub mod markers;
pub mod motion;
pub mod scene;
pub mod tracking;

pub use anchors::{Anchor, AnchorBinding, AnchorId, AnchorKind, AnchorNodeSynchronizer};
pub use classify::{
    Classification, ClassificationDispatcher, ClassificationOutcome, Classifier, DispatcherStats,
    StaticClassifier,
};
pub use config::ArSceneConfig;
pub use error::{ArSceneError, ClassifierError, CommandError, EventSinkError, Result};
pub use events::{
    ChannelSink, EventFilter, EventMetrics, EventReceiver, EventSink, HostEvent,
    HostMessage, RecordingSink,
};
pub use frame::{CameraImage, ImageFormat, PoseSample, TrackedFrame};
pub use host::{
    CommandResponse, HostCommand, ResourceCatalog, StaticCatalog, TrackingConfiguration,
};
pub use markers::{MarkerDeduplicator, MarkerPlacer};
pub use motion::{MotionEvents, MotionGate, MotionState};
pub use scene::{Geometry, NodeId, Scene, SceneNode};
pub use tracking::{
    HostInput, LimitedReason, SessionRuntime, SessionStats, TrackingSession,
    TrackingSessionBuilder, TrackingState,
};
