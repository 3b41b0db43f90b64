use crate::anchors::Anchor;
use crate::error::EventSinkError;
use crate::tracking::TrackingState;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Notifications delivered to the host application
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The camera moved far enough for a new image to be reported
    CameraImageUpdate { data: Bytes },
    /// The camera is moving faster than the configured maximum
    MoveTooFast,
    /// The host tracking quality changed
    TrackingStateChanged { state: TrackingState },
    /// The tracking session was interrupted
    SessionInterrupted,
    /// The tracking session resumed after an interruption
    SessionInterruptionEnded,
    /// Plugin or session error surfaced to the host verbatim
    Error { message: String },
    /// A representation node was created for a new anchor
    NodeAdded { anchor: Anchor, node_name: String },
    /// The anchor behind a representation node changed
    NodeUpdated { anchor: Anchor, node_name: String },
    /// The representation node for an anchor was removed
    NodeRemoved { anchor: Anchor, node_name: String },
    /// Renderer tick
    UpdateAtTime { time: f64 },
}

impl HostEvent {
    /// Method name the host application dispatches on
    pub fn method(&self) -> &'static str {
        match self {
            HostEvent::CameraImageUpdate { .. } => "onCameraImageUpdate",
            HostEvent::MoveTooFast => "onMoveTooFast",
            HostEvent::TrackingStateChanged { .. } => "onCameraDidChangeTrackingState",
            HostEvent::SessionInterrupted => "onSessionWasInterrupted",
            HostEvent::SessionInterruptionEnded => "onSessionInterruptionEnded",
            HostEvent::Error { .. } => "onError",
            HostEvent::NodeAdded { .. } => "didAddNodeForAnchor",
            HostEvent::NodeUpdated { .. } => "didUpdateNodeForAnchor",
            HostEvent::NodeRemoved { .. } => "didRemoveNodeForAnchor",
            HostEvent::UpdateAtTime { .. } => "updateAtTime",
        }
    }

    /// Key-value payload sent with the event
    pub fn arguments(&self) -> Value {
        match self {
            HostEvent::CameraImageUpdate { data } => json!({ "data": data.as_ref() }),
            HostEvent::MoveTooFast
            | HostEvent::SessionInterrupted
            | HostEvent::SessionInterruptionEnded => Value::Null,
            HostEvent::TrackingStateChanged { state } => {
                let mut params = Map::new();
                params.insert("trackingState".to_string(), json!(state.code()));
                if let Some(reason) = state.reason_code() {
                    params.insert("reason".to_string(), json!(reason));
                }
                Value::Object(params)
            }
            HostEvent::Error { message } => json!({ "message": message }),
            HostEvent::NodeAdded { anchor, node_name }
            | HostEvent::NodeUpdated { anchor, node_name }
            | HostEvent::NodeRemoved { anchor, node_name } => {
                let mut params = anchor.to_params();
                params.insert("nodeName".to_string(), json!(node_name));
                Value::Object(params)
            }
            HostEvent::UpdateAtTime { time } => json!({ "time": time }),
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            HostEvent::CameraImageUpdate { data } => {
                format!("Camera image update ({} bytes)", data.len())
            }
            HostEvent::MoveTooFast => "Camera moving too fast".to_string(),
            HostEvent::TrackingStateChanged { state } => {
                format!("Tracking state changed to {:?}", state)
            }
            HostEvent::SessionInterrupted => "Session interrupted".to_string(),
            HostEvent::SessionInterruptionEnded => "Session interruption ended".to_string(),
            HostEvent::Error { message } => format!("Error: {}", message),
            HostEvent::NodeAdded { anchor, node_name } => {
                format!("Node {} added for anchor {}", node_name, anchor.identifier)
            }
            HostEvent::NodeUpdated { anchor, node_name } => {
                format!("Node {} updated for anchor {}", node_name, anchor.identifier)
            }
            HostEvent::NodeRemoved { anchor, node_name } => {
                format!("Node {} removed for anchor {}", node_name, anchor.identifier)
            }
            HostEvent::UpdateAtTime { time } => format!("Update at time {:.3}", time),
        }
    }

    /// Wire form of the event
    pub fn to_message(&self) -> HostMessage {
        HostMessage {
            method: self.method().to_string(),
            arguments: self.arguments(),
        }
    }
}

/// Method invocation as delivered to the host application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostMessage {
    pub method: String,
    pub arguments: Value,
}

/// Outward-facing notification channel to the host application
pub trait EventSink: Send + Sync {
    /// Deliver one event; ordering across calls must be preserved
    fn emit(&self, event: HostEvent) -> Result<(), EventSinkError>;
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: HostEvent) -> Result<(), EventSinkError> {
        (**self).emit(event)
    }
}

/// Lossless single-consumer sink backed by an unbounded channel
#[derive(Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<HostEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: HostEvent) -> Result<(), EventSinkError> {
        self.sender
            .send(event)
            .map_err(|_| EventSinkError::ChannelClosed)
    }
}

/// In-memory sink that keeps every emitted event
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events emitted so far
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    /// Method names of all events emitted so far
    pub fn methods(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(HostEvent::method).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.method() == method)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: HostEvent) -> Result<(), EventSinkError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific host methods
    Methods(Vec<String>),
    /// Custom filter function
    Custom(fn(&HostEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &HostEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Methods(methods) => methods.iter().any(|m| m == event.method()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: mpsc::UnboundedReceiver<HostEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: mpsc::UnboundedReceiver<HostEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event, or `None` once all senders are gone
    pub async fn recv(&mut self) -> Option<HostEvent> {
        while let Some(event) = self.receiver.recv().await {
            if self.filter.matches(&event) {
                debug!(
                    "Receiver '{}' received event: {}",
                    self.name,
                    event.description()
                );
                return Some(event);
            }
        }

        debug!("Event channel closed for receiver '{}'", self.name);
        None
    }
}

/// Event metrics collector for monitoring and debugging
#[derive(Debug, Default)]
pub struct EventMetrics {
    pub total_events: u64,
    pub events_by_method: HashMap<&'static str, u64>,
    pub errors: u64,
}

impl EventMetrics {
    /// Record an event
    pub fn record_event(&mut self, event: &HostEvent) {
        self.total_events += 1;
        *self.events_by_method.entry(event.method()).or_insert(0) += 1;
    }

    /// Record an error
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn count(&self, method: &str) -> u64 {
        self.events_by_method.get(method).copied().unwrap_or(0)
    }

    /// Log a summary of the collected metrics
    pub fn log_summary(&self) {
        info!("Event summary:");
        info!("  Total events: {}", self.total_events);
        info!("  Errors: {}", self.errors);

        let mut methods: Vec<_> = self.events_by_method.iter().collect();
        methods.sort();
        for (method, count) in methods {
            info!("  {}: {}", method, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::{AnchorId, AnchorKind};
    use crate::tracking::LimitedReason;
    use nalgebra::{Matrix4, Vector3};
    use tokio::time::{timeout, Duration};

    fn object_anchor() -> Anchor {
        Anchor {
            identifier: AnchorId::new("anchor-1"),
            kind: AnchorKind::RecognizedObject {
                extent: Vector3::new(0.1, 0.2, 0.3),
                reference_object_name: Some("mug".to_string()),
            },
            transform: Matrix4::identity(),
            name: None,
        }
    }

    #[test]
    fn test_tracking_state_arguments() {
        let limited = HostEvent::TrackingStateChanged {
            state: TrackingState::Limited(LimitedReason::ExcessiveMotion),
        };
        assert_eq!(limited.method(), "onCameraDidChangeTrackingState");
        assert_eq!(limited.arguments(), json!({ "trackingState": 1, "reason": 3 }));

        let normal = HostEvent::TrackingStateChanged {
            state: TrackingState::Normal,
        };
        assert_eq!(normal.arguments(), json!({ "trackingState": 2 }));
    }

    #[test]
    fn test_anchor_event_arguments_carry_node_name() {
        let event = HostEvent::NodeAdded {
            anchor: object_anchor(),
            node_name: "node-7".to_string(),
        };

        let args = event.arguments();
        assert_eq!(event.method(), "didAddNodeForAnchor");
        assert_eq!(args["nodeName"], "node-7");
        assert_eq!(args["identifier"], "anchor-1");
        assert_eq!(args["anchorType"], "ARObjectAnchor");
        assert_eq!(args["referenceObjectName"], "mug");
    }

    #[test]
    fn test_message_wire_form() {
        let message = HostEvent::UpdateAtTime { time: 1.25 }.to_message();
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, json!({ "method": "updateAtTime", "arguments": { "time": 1.25 } }));

        let too_fast = serde_json::to_value(HostEvent::MoveTooFast.to_message()).unwrap();
        assert_eq!(too_fast["arguments"], Value::Null);
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::Methods(vec!["onMoveTooFast".to_string()]);

        assert!(filter.matches(&HostEvent::MoveTooFast));
        assert!(!filter.matches(&HostEvent::UpdateAtTime { time: 0.0 }));
        assert!(EventFilter::All.matches(&HostEvent::SessionInterrupted));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let (sink, receiver) = ChannelSink::new();
        let filter = EventFilter::Methods(vec!["onError".to_string()]);
        let mut filtered = EventReceiver::new(receiver, filter, "test".to_string());

        sink.emit(HostEvent::UpdateAtTime { time: 0.5 }).unwrap();
        sink.emit(HostEvent::Error {
            message: "camera unavailable".to_string(),
        })
        .unwrap();
        drop(sink);

        let received = timeout(Duration::from_millis(100), filtered.recv())
            .await
            .unwrap();
        assert_eq!(
            received,
            Some(HostEvent::Error {
                message: "camera unavailable".to_string()
            })
        );
        assert_eq!(filtered.recv().await, None);
    }

    #[test]
    fn test_recording_sink_preserves_order() {
        let sink = RecordingSink::new();
        sink.emit(HostEvent::SessionInterrupted).unwrap();
        sink.emit(HostEvent::SessionInterruptionEnded).unwrap();

        assert_eq!(
            sink.methods(),
            vec!["onSessionWasInterrupted", "onSessionInterruptionEnded"]
        );
        assert_eq!(sink.count("onSessionWasInterrupted"), 1);
    }

    #[test]
    fn test_event_metrics() {
        let mut metrics = EventMetrics::default();
        metrics.record_event(&HostEvent::MoveTooFast);
        metrics.record_event(&HostEvent::MoveTooFast);
        metrics.record_event(&HostEvent::UpdateAtTime { time: 1.0 });
        metrics.record_error();

        assert_eq!(metrics.total_events, 3);
        assert_eq!(metrics.count("onMoveTooFast"), 2);
        assert_eq!(metrics.errors, 1);
    }
}
