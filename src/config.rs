//! Crate-wide configuration, loadable from YAML.
//!
//! ```yaml
//! tracker:
//!   match_radius: 35.0
//!   policy: optimal        # optimal | greedy_nearest | first_match
//! estimator:
//!   line_a_y: 322
//!   line_b_y: 368
//!   offset: 6
//!   distance_m: 10.0
//!   flag_threshold_kph: 12.0
//!   entry_policy: first    # first | last
//!   entry_timeout_secs: 30.0
//! pipeline:
//!   stride: 3
//!   target_classes: [car]
//!   resize: { width: 1057, height: 523 }
//! ```
//!
//! Every section and field is optional and falls back to its default.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::integration::PipelineConfig;
use crate::speed::EstimatorConfig;
use crate::tracker::TrackerConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub estimator: EstimatorConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Read, parse and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()?;
        self.estimator.validate()?;
        self.pipeline.validate()
    }
}
