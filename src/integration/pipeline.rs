//! SpeedPipeline for combining detection with tracking and speed estimation.

use std::time::Instant;

use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::integration::{Detection, DetectionSource, Frame, FrameSampler};
use crate::speed::{FrameReport, SpeedEstimator, Warning};
use crate::tracker::{BoundingBox, CentroidTracker, TrackedObject};

/// Output frame dimensions frames are resized to before detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Sampling and filtering applied ahead of the tracker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Process every Nth decoded frame
    pub stride: u64,
    /// Detections whose label equals one of these are tracked
    pub target_classes: Vec<String>,
    pub resize: FrameSize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stride: 3,
            target_classes: vec!["car".to_string()],
            resize: FrameSize {
                width: 1057,
                height: 523,
            },
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::InvalidConfig("stride must be at least 1".to_string()));
        }
        if self.target_classes.is_empty() {
            return Err(Error::InvalidConfig(
                "target_classes must not be empty".to_string(),
            ));
        }
        if self.resize.width == 0 || self.resize.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "resize must be non-zero, got {}x{}",
                self.resize.width, self.resize.height
            )));
        }
        Ok(())
    }

    pub fn is_target(&self, label: &str) -> bool {
        self.target_classes.iter().any(|c| c == label)
    }
}

/// Tracker and estimator output for one processed frame.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// 1-based index of the frame among all decoded frames
    pub frame_index: u64,
    pub objects: Vec<TrackedObject>,
    pub report: FrameReport,
}

/// Bundles a `DetectionSource` with the centroid tracker and speed estimator.
///
/// Frames must be fed in decode order; `&mut self` keeps updates sequential.
pub struct SpeedPipeline<D: DetectionSource> {
    detector: D,
    sampler: FrameSampler,
    config: PipelineConfig,
    tracker: CentroidTracker,
    estimator: SpeedEstimator,
}

impl<D: DetectionSource> SpeedPipeline<D> {
    /// Build a pipeline from a validated copy of `config`.
    pub fn new(detector: D, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(detector, config))
    }

    pub fn with_default_config(detector: D) -> Self {
        Self::build(detector, &Config::default())
    }

    fn build(detector: D, config: &Config) -> Self {
        Self {
            detector,
            sampler: FrameSampler::new(config.pipeline.stride),
            config: config.pipeline.clone(),
            tracker: CentroidTracker::new(config.tracker.clone()),
            estimator: SpeedEstimator::new(config.estimator.clone()),
        }
    }

    /// Count a decoded frame and, if it is sampled, run the full pipeline on it.
    ///
    /// Returns `Ok(None)` for frames skipped by the sampler; those never reach
    /// the detector.
    pub fn process_frame(&mut self, frame: &Frame<'_>, now: Instant) -> Result<Option<ProcessedFrame>> {
        if !self.sampler.advance() {
            return Ok(None);
        }
        let detections = self
            .detector
            .detect(frame)
            .map_err(|e| Error::Detector(Box::new(e)))?;
        Ok(Some(self.process_detections(detections, now)))
    }

    /// Like [`Self::process_frame`] with the current wall-clock time.
    pub fn process_frame_now(&mut self, frame: &Frame<'_>) -> Result<Option<ProcessedFrame>> {
        self.process_frame(frame, Instant::now())
    }

    /// Filter, track and evaluate detections, bypassing the sampler and detector.
    pub fn process_detections(&mut self, detections: Vec<Detection>, now: Instant) -> ProcessedFrame {
        let mut rejected = Vec::new();
        let boxes: Vec<BoundingBox> = detections
            .into_iter()
            .filter(|d| self.config.is_target(&d.class_label))
            .filter_map(|d| match d.to_bbox() {
                Ok(bbox) => Some(bbox),
                Err(err) => {
                    tracing::warn!(label = %d.class_label, tlbr = ?d.tlbr(), %err, "detection rejected");
                    rejected.push(Warning::RejectedBox {
                        tlbr: d.tlbr(),
                        class_label: d.class_label,
                    });
                    None
                }
            })
            .collect();

        let objects = self.tracker.update(&boxes);
        let mut report = self.estimator.evaluate(&objects, now);
        rejected.append(&mut report.warnings);
        report.warnings = rejected;

        ProcessedFrame {
            frame_index: self.sampler.frames_seen(),
            objects,
            report,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn tracker(&self) -> &CentroidTracker {
        &self.tracker
    }

    pub fn estimator(&self) -> &SpeedEstimator {
        &self.estimator
    }
}
