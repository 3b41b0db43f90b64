use super::state::TrackingState;
use crate::anchors::Anchor;
use crate::frame::TrackedFrame;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single notification or request arriving from the tracking host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostInput {
    Command {
        method: String,
        #[serde(default)]
        arguments: Value,
    },
    Frame(TrackedFrame),
    AnchorAdded(Anchor),
    AnchorUpdated(Anchor),
    AnchorRemoved(Anchor),
    TrackingState {
        state: TrackingState,
    },
    SessionFailed {
        message: String,
    },
    SessionInterrupted,
    SessionInterruptionEnded,
    RenderTick {
        time: f64,
    },
}

impl HostInput {
    /// Short label for log messages
    pub fn kind(&self) -> &'static str {
        match self {
            HostInput::Command { .. } => "command",
            HostInput::Frame(_) => "frame",
            HostInput::AnchorAdded(_) => "anchor_added",
            HostInput::AnchorUpdated(_) => "anchor_updated",
            HostInput::AnchorRemoved(_) => "anchor_removed",
            HostInput::TrackingState { .. } => "tracking_state",
            HostInput::SessionFailed { .. } => "session_failed",
            HostInput::SessionInterrupted => "session_interrupted",
            HostInput::SessionInterruptionEnded => "session_interruption_ended",
            HostInput::RenderTick { .. } => "render_tick",
        }
    }
}
