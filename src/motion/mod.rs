mod gate;

pub use gate::{MotionEvents, MotionGate, MotionState};
