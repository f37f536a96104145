//! Integration module for connecting object detection backends with the
//! tracker and speed estimator.
//!
//! Detection models stay outside this crate: implement [`DetectionSource`]
//! for any inference backend and hand it to a [`SpeedPipeline`].

mod builder;
mod detector;
mod pipeline;
mod sampler;

pub use builder::DetectionBuilder;
pub use detector::{Detection, DetectionSource, Frame, IntoDetections};
pub use pipeline::{FrameSize, PipelineConfig, ProcessedFrame, SpeedPipeline};
pub use sampler::FrameSampler;
