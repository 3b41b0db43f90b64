mod input;
mod runtime;
mod session;
mod state;


pub use input::HostInput;
pub use runtime::SessionRuntime;
pub use session::{SessionStats, TrackingSession, TrackingSessionBuilder};
pub use state::{LimitedReason, TrackingState};
