use serde::{Deserialize, Serialize};
use std::fmt;

/// Why tracking quality is limited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitedReason {
    Other,
    Initializing,
    Relocalizing,
    ExcessiveMotion,
    InsufficientFeatures,
}

impl LimitedReason {
    /// Integer code reported to the host
    pub fn code(&self) -> u8 {
        match self {
            LimitedReason::Other => 0,
            LimitedReason::Initializing => 1,
            LimitedReason::Relocalizing => 2,
            LimitedReason::ExcessiveMotion => 3,
            LimitedReason::InsufficientFeatures => 4,
        }
    }
}

/// Tracking quality reported by the tracking host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    NotAvailable,
    Limited(LimitedReason),
    Normal,
}

impl TrackingState {
    pub fn code(&self) -> u8 {
        match self {
            TrackingState::NotAvailable => 0,
            TrackingState::Limited(_) => 1,
            TrackingState::Normal => 2,
        }
    }

    /// Reason code, present only for limited tracking
    pub fn reason_code(&self) -> Option<u8> {
        match self {
            TrackingState::Limited(reason) => Some(reason.code()),
            _ => None,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, TrackingState::Normal)
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingState::NotAvailable => write!(f, "not available"),
            TrackingState::Limited(reason) => write!(f, "limited ({:?})", reason),
            TrackingState::Normal => write!(f, "normal"),
        }
    }
}
