mod centroid_tracker;
pub mod matching;
mod rect;

pub use centroid_tracker::{CentroidTracker, Identity, TrackedObject, TrackerConfig};
pub use matching::MatchPolicy;
pub use rect::BoundingBox;
