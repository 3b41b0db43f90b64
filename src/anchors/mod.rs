mod synchronizer;
mod types;

#[cfg(test)]
mod tests;

pub use synchronizer::{AnchorBinding, AnchorNodeSynchronizer};
pub use types::{Anchor, AnchorId, AnchorKind};
