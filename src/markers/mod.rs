mod dedup;
mod placement;

pub use dedup::MarkerDeduplicator;
pub use placement::{marker_transform, MarkerPlacer};
