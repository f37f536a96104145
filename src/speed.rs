//! Line-crossing detection and speed estimation over tracked objects.

mod band;
mod crossing_state;
mod estimator;
mod event;

pub use band::ReferenceLine;
pub use crossing_state::{CrossingState, Direction};
pub use estimator::{EntryPolicy, EstimatorConfig, SpeedEstimator, compute_speed_kph};
pub use event::{FrameReport, SpeedEvent, Warning};
