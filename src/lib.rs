//! Vehicle speed estimation from per-frame detections.
//!
//! Detections are matched to persistent identities by [`CentroidTracker`],
//! and [`SpeedEstimator`] times each identity between two horizontal
//! reference lines. [`SpeedPipeline`] bundles both behind a
//! [`DetectionSource`] with frame sampling and class filtering.

pub mod config;
pub mod error;
pub mod integration;
pub mod speed;
pub mod tracker;

pub use config::Config;
pub use error::{Error, Result};
pub use integration::{
    Detection, DetectionBuilder, DetectionSource, Frame, FrameSampler, FrameSize, IntoDetections,
    PipelineConfig, ProcessedFrame, SpeedPipeline,
};
pub use speed::{
    CrossingState, Direction, EntryPolicy, EstimatorConfig, FrameReport, ReferenceLine,
    SpeedEstimator, SpeedEvent, Warning, compute_speed_kph,
};
pub use tracker::{BoundingBox, CentroidTracker, Identity, MatchPolicy, TrackedObject, TrackerConfig};
