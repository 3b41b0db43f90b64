use super::input::HostInput;
use super::state::TrackingState;
use crate::anchors::{Anchor, AnchorNodeSynchronizer};
use crate::classify::{
    ClassificationDispatcher, ClassificationOutcome, Classifier, DispatcherStats,
};
use crate::config::ArSceneConfig;
use crate::error::{ArSceneError, CommandError, Result};
use crate::events::{EventSink, HostEvent};
use crate::frame::{CameraImage, TrackedFrame};
use crate::host::{CommandResponse, HostCommand, ResourceCatalog, StaticCatalog, TrackingConfiguration};
use crate::markers::{MarkerDeduplicator, MarkerPlacer};
use crate::motion::MotionGate;
use crate::scene::{Geometry, NodeId, Scene};

use bytes::Bytes;
use nalgebra::{Matrix4, Vector3};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Counters for a single tracking session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub frames_received: u64,
    pub frames_ignored: u64,
    pub movements: u64,
    pub markers_placed: u64,
    pub duplicate_positions: u64,
    pub velocity_warnings: u64,
    pub classifications_submitted: u64,
    pub labels_placed: u64,
    pub classification_failures: u64,
    pub events_emitted: u64,
    pub emit_failures: u64,
}

impl SessionStats {
    pub fn log_summary(&self) {
        info!(
            "Session summary: {} frames ({} ignored), {} movements, {} markers, {} duplicates skipped",
            self.frames_received,
            self.frames_ignored,
            self.movements,
            self.markers_placed,
            self.duplicate_positions
        );
        info!(
            "Classifications: {} submitted, {} labels placed, {} failed; {} events emitted, {} delivery failures",
            self.classifications_submitted,
            self.labels_placed,
            self.classification_failures,
            self.events_emitted,
            self.emit_failures
        );
    }
}

/// State owned by the tracking context.
///
/// Every method runs on that context. Classification is the only work
/// handed off; its results come back through [`Self::apply_classification`].
pub struct TrackingSession {
    config: ArSceneConfig,
    sink: Arc<dyn EventSink>,
    catalog: Arc<dyn ResourceCatalog>,
    classifier: Option<Arc<dyn Classifier>>,
    gate: MotionGate,
    markers: MarkerDeduplicator,
    placer: MarkerPlacer,
    scene: Scene,
    anchors: AnchorNodeSynchronizer,
    dispatcher: Option<ClassificationDispatcher>,
    dispatcher_generation: u64,
    classification_results: Option<mpsc::UnboundedReceiver<ClassificationOutcome>>,
    configuration: Option<TrackingConfiguration>,
    recording: bool,
    last_camera_position: Option<Vector3<f64>>,
    pending_classifications: usize,
    stats: SessionStats,
}

impl TrackingSession {
    pub fn builder() -> TrackingSessionBuilder {
        TrackingSessionBuilder::new()
    }

    /// Route one host notification or command
    pub fn handle_input(&mut self, input: HostInput) -> std::result::Result<CommandResponse, CommandError> {
        match input {
            HostInput::Command { method, arguments } => {
                if !self.is_initialized() && method != "init" {
                    let err = CommandError::NotInitialized;
                    error!("Rejected '{}': {}", method, err);
                    self.emit(HostEvent::Error {
                        message: err.to_string(),
                    });
                    return Err(err);
                }

                let command = HostCommand::parse(&method, &arguments).map_err(|e| {
                    warn!("Rejected host command '{}': {}", method, e);
                    e
                })?;
                return self.handle_command(command);
            }
            HostInput::Frame(frame) => self.on_frame(&frame),
            HostInput::AnchorAdded(anchor) => self.on_anchor_added(&anchor),
            HostInput::AnchorUpdated(anchor) => self.on_anchor_updated(&anchor),
            HostInput::AnchorRemoved(anchor) => self.on_anchor_removed(&anchor),
            HostInput::TrackingState { state } => self.on_tracking_state_changed(state),
            HostInput::SessionFailed { message } => self.on_session_failed(&message),
            HostInput::SessionInterrupted => self.on_session_interrupted(),
            HostInput::SessionInterruptionEnded => self.on_session_interruption_ended(),
            HostInput::RenderTick { time } => self.on_render_tick(time),
        }

        Ok(CommandResponse::None)
    }

    /// Apply a parsed host command
    pub fn handle_command(
        &mut self,
        command: HostCommand,
    ) -> std::result::Result<CommandResponse, CommandError> {
        debug!("Handling host command '{}'", command.method());

        match command {
            HostCommand::Init(options) => {
                if self.is_initialized() {
                    warn!("Session re-initialized, discarding previous tracking state");
                    self.teardown();
                }

                let configuration = TrackingConfiguration::from_options(
                    &options,
                    &self.config.session,
                    self.catalog.as_ref(),
                )
                .map_err(|e| {
                    error!("Failed to configure session: {}", e);
                    self.emit(HostEvent::Error {
                        message: e.to_string(),
                    });
                    e
                })?;

                self.start_classification();
                self.configuration = Some(configuration);
                info!("Tracking session initialized");
                Ok(CommandResponse::None)
            }
            HostCommand::SetIsRecording(recording) => {
                self.set_recording(recording);
                Ok(CommandResponse::None)
            }
            HostCommand::Dispose => {
                self.teardown();
                info!("Tracking session disposed");
                Ok(CommandResponse::None)
            }
            HostCommand::CameraPosition => {
                Ok(CommandResponse::CameraPosition(self.last_camera_position))
            }
        }
    }

    /// Process one pose/image frame from the tracking host
    pub fn on_frame(&mut self, frame: &TrackedFrame) {
        self.stats.frames_received += 1;
        self.last_camera_position = Some(frame.camera_position());

        if !self.recording {
            self.stats.frames_ignored += 1;
            return;
        }

        let events = self.gate.observe(frame.pose_sample());

        if let Some(position) = events.movement {
            self.stats.movements += 1;
            debug!(
                "Camera moved {:.3} to ({:.3}, {:.3}, {:.3})",
                events.distance, position.x, position.y, position.z
            );

            let data = self.image_payload(&frame.image);
            self.emit(HostEvent::CameraImageUpdate { data });

            if self.markers.try_place(position) {
                if self.placer.place(&mut self.scene, frame).is_some() {
                    self.stats.markers_placed += 1;
                }
                self.submit_classification(frame.image.clone());
            } else {
                self.stats.duplicate_positions += 1;
                debug!("Position already marked, skipping marker and classification");
            }
        }

        if events.too_fast {
            self.stats.velocity_warnings += 1;
            if let Some(velocity) = events.velocity {
                info!("Camera velocity {:.2} m/s over limit", velocity);
            }
            self.emit(HostEvent::MoveTooFast);
        }
    }

    pub fn on_anchor_added(&mut self, anchor: &Anchor) {
        if let Some(event) = self.anchors.on_added(anchor, &mut self.scene) {
            self.emit(event);
        }
    }

    pub fn on_anchor_updated(&mut self, anchor: &Anchor) {
        if let Some(event) = self.anchors.on_updated(anchor, &mut self.scene) {
            self.emit(event);
        }
    }

    pub fn on_anchor_removed(&mut self, anchor: &Anchor) {
        if let Some(event) = self.anchors.on_removed(anchor, &mut self.scene) {
            self.emit(event);
        }
    }

    pub fn on_tracking_state_changed(&mut self, state: TrackingState) {
        info!("Tracking state changed to {}", state);
        self.emit(HostEvent::TrackingStateChanged { state });
    }

    /// Host session failures are forwarded verbatim and not recovered
    pub fn on_session_failed(&mut self, message: &str) {
        error!("Tracking host session failed: {}", message);
        self.emit(HostEvent::Error {
            message: format!("sessionDidFailWithError: {}", message),
        });
    }

    pub fn on_session_interrupted(&mut self) {
        self.emit(HostEvent::SessionInterrupted);
    }

    pub fn on_session_interruption_ended(&mut self) {
        self.emit(HostEvent::SessionInterruptionEnded);
    }

    pub fn on_render_tick(&mut self, time: f64) {
        if self.config.events.emit_update_at_time {
            self.emit(HostEvent::UpdateAtTime { time });
        }
    }

    /// Handle a classification completion on the tracking context.
    ///
    /// Outcomes from a dispatcher that has since been torn down are discarded.
    pub fn apply_classification(&mut self, outcome: ClassificationOutcome) {
        let current = self
            .dispatcher
            .as_ref()
            .is_some_and(|dispatcher| dispatcher.generation() == outcome.generation);
        if !current {
            debug!(
                "Discarding classification {} from torn-down dispatcher {}",
                outcome.sequence, outcome.generation
            );
            return;
        }

        self.pending_classifications = self.pending_classifications.saturating_sub(1);

        match outcome.result {
            Ok(classification) => {
                let base = self.last_camera_position.unwrap_or_else(Vector3::zeros);
                let position = base + Vector3::new(0.0, -0.1, -0.5);
                let transform = Matrix4::new_translation(&position)
                    * Matrix4::new_scaling(self.config.classifier.label_scale);
                let text = classification.display_text();

                match self.scene.add_node(
                    self.scene.root(),
                    transform,
                    Some(Geometry::Text {
                        string: text.clone(),
                        extrusion_depth: 0.1,
                    }),
                ) {
                    Some(node) => {
                        self.stats.labels_placed += 1;
                        info!(
                            "Classification {} placed label '{}' as node {}",
                            outcome.sequence, text, node
                        );
                    }
                    None => warn!("Failed to place label '{}'", text),
                }
            }
            Err(e) => {
                self.stats.classification_failures += 1;
                warn!("Classification {} failed: {}", outcome.sequence, e);
            }
        }
    }

    /// Apply every completion that has already arrived. Returns how many were applied.
    pub fn drain_classifications(&mut self) -> usize {
        let mut outcomes = Vec::new();
        if let Some(results) = self.classification_results.as_mut() {
            while let Ok(outcome) = results.try_recv() {
                outcomes.push(outcome);
            }
        }

        let applied = outcomes.len();
        for outcome in outcomes {
            self.apply_classification(outcome);
        }
        applied
    }

    /// Hand the completion channel to an event loop that awaits it
    pub fn take_classification_receiver(
        &mut self,
    ) -> Option<mpsc::UnboundedReceiver<ClassificationOutcome>> {
        self.classification_results.take()
    }

    /// Enable or disable frame processing. Disabling forgets motion history.
    pub fn set_recording(&mut self, recording: bool) {
        if self.recording == recording {
            debug!("Recording already {}", if recording { "on" } else { "off" });
            return;
        }

        self.recording = recording;
        if recording {
            info!("Recording started");
        } else {
            self.gate.reset();
            info!("Recording stopped");
        }
    }

    /// Drop all per-session state; in-flight classifications are discarded
    pub fn teardown(&mut self) {
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.cancel();
            let stats = dispatcher.stats();
            debug!(
                "Classification dispatcher stopped ({} submitted, {} dropped, {} delivered)",
                stats.submitted, stats.dropped, stats.delivered
            );
        }
        self.classification_results = None;
        self.pending_classifications = 0;

        self.anchors.clear(&mut self.scene);
        self.scene.clear();
        self.markers.clear();
        self.gate.reset();
        self.recording = false;
        self.configuration = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.configuration.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn configuration(&self) -> Option<&TrackingConfiguration> {
        self.configuration.as_ref()
    }

    pub fn config(&self) -> &ArSceneConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn anchors(&self) -> &AnchorNodeSynchronizer {
        &self.anchors
    }

    pub fn markers(&self) -> &MarkerDeduplicator {
        &self.markers
    }

    pub fn gate(&self) -> &MotionGate {
        &self.gate
    }

    pub fn last_camera_position(&self) -> Option<Vector3<f64>> {
        self.last_camera_position
    }

    pub fn pending_classifications(&self) -> usize {
        self.pending_classifications
    }

    pub fn dispatcher_stats(&self) -> Option<DispatcherStats> {
        self.dispatcher.as_ref().map(ClassificationDispatcher::stats)
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Text label nodes placed from classification results
    pub fn label_nodes(&self) -> Vec<NodeId> {
        self.scene
            .top_level_with_geometry("text")
            .into_iter()
            .map(|node| node.id)
            .collect()
    }

    fn start_classification(&mut self) {
        if !self.config.classifier.enabled {
            debug!("Classification disabled by configuration");
            return;
        }

        let Some(classifier) = self.classifier.clone() else {
            debug!("No classifier configured");
            return;
        };

        self.dispatcher_generation += 1;
        match ClassificationDispatcher::new(
            classifier,
            self.config.classifier.max_in_flight,
            self.dispatcher_generation,
        ) {
            Ok((dispatcher, results)) => {
                self.dispatcher = Some(dispatcher);
                self.classification_results = Some(results);
            }
            Err(e) => warn!("Classification unavailable: {}", e),
        }
    }

    fn submit_classification(&mut self, image: CameraImage) {
        let Some(dispatcher) = self.dispatcher.as_mut() else {
            return;
        };

        if dispatcher.submit(image).is_some() {
            self.pending_classifications += 1;
            self.stats.classifications_submitted += 1;
        }
    }

    fn image_payload(&self, image: &CameraImage) -> Bytes {
        if !self.config.events.encode_images_as_png {
            return image.data.clone();
        }

        match image.encode_png() {
            Ok(png) => Bytes::from(png),
            Err(e) => {
                warn!("Sending raw camera image, PNG encoding failed: {}", e);
                image.data.clone()
            }
        }
    }

    fn emit(&mut self, event: HostEvent) {
        if self.config.events.debug_logging {
            debug!("Emitting {}", event.description());
        }

        match self.sink.emit(event) {
            Ok(()) => self.stats.events_emitted += 1,
            Err(e) => {
                self.stats.emit_failures += 1;
                error!("Failed to deliver host event: {}", e);
            }
        }
    }
}

/// Builder for [`TrackingSession`]
#[derive(Default)]
pub struct TrackingSessionBuilder {
    config: Option<ArSceneConfig>,
    sink: Option<Arc<dyn EventSink>>,
    classifier: Option<Arc<dyn Classifier>>,
    catalog: Option<Arc<dyn ResourceCatalog>>,
}

impl TrackingSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ArSceneConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn ResourceCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> Result<TrackingSession> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| ArSceneError::component("tracking_session", e.to_string().as_str()))?;

        let sink = self
            .sink
            .ok_or_else(|| ArSceneError::component("tracking_session", "event sink is required"))?;

        Ok(TrackingSession {
            gate: MotionGate::new(config.motion.clone()),
            markers: MarkerDeduplicator::new(config.motion.min_position_delta),
            placer: MarkerPlacer::new(config.markers.clone()),
            scene: Scene::new(),
            anchors: AnchorNodeSynchronizer::new(),
            dispatcher: None,
            dispatcher_generation: 0,
            classification_results: None,
            configuration: None,
            recording: false,
            last_camera_position: None,
            pending_classifications: 0,
            stats: SessionStats::default(),
            catalog: self
                .catalog
                .unwrap_or_else(|| Arc::new(StaticCatalog::new()) as Arc<dyn ResourceCatalog>),
            classifier: self.classifier,
            sink,
            config,
        })
    }
}
