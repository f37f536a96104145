//! Two-line crossing detector and speed estimator.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::speed::band::ReferenceLine;
use crate::speed::crossing_state::{CrossingState, Direction};
use crate::speed::event::{FrameReport, SpeedEvent, Warning};
use crate::tracker::{Identity, TrackedObject};

/// metres per second to kilometres per hour
const MPS_TO_KPH: f64 = 3.6;

/// Which timestamp is kept while an identity stays inside the entry band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPolicy {
    /// First frame seen in the band.
    #[default]
    First,
    /// Latest frame seen in the band; overwritten every frame.
    Last,
}

/// Configuration for the [`SpeedEstimator`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Upper reference line (pixels)
    pub line_a_y: i32,
    /// Lower reference line (pixels)
    pub line_b_y: i32,
    /// Band half-width around each line (pixels)
    pub offset: i32,
    /// Real-world distance between the lines along the road, in metres
    pub distance_m: f64,
    pub flag_threshold_kph: f64,
    pub entry_policy: EntryPolicy,
    /// Entry records older than this are dropped
    pub entry_timeout_secs: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            line_a_y: 322,
            line_b_y: 368,
            offset: 6,
            distance_m: 10.0,
            flag_threshold_kph: 12.0,
            entry_policy: EntryPolicy::First,
            entry_timeout_secs: 30.0,
        }
    }
}

impl EstimatorConfig {
    pub fn line_a(&self) -> ReferenceLine {
        ReferenceLine::new(self.line_a_y, self.offset)
    }

    pub fn line_b(&self) -> ReferenceLine {
        ReferenceLine::new(self.line_b_y, self.offset)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));
        if self.offset <= 0 {
            return invalid(format!("offset must be positive, got {}", self.offset));
        }
        if self.line_a_y >= self.line_b_y {
            return invalid(format!(
                "line_a_y ({}) must be above line_b_y ({})",
                self.line_a_y, self.line_b_y
            ));
        }
        let gap = i64::from(self.line_b_y) - i64::from(self.line_a_y);
        if gap < 2 * i64::from(self.offset) {
            return invalid(format!(
                "bands around y={} and y={} overlap with offset {}",
                self.line_a_y, self.line_b_y, self.offset
            ));
        }
        if !(self.distance_m.is_finite() && self.distance_m > 0.0) {
            return invalid(format!("distance_m must be positive, got {}", self.distance_m));
        }
        if !self.flag_threshold_kph.is_finite() {
            return invalid("flag_threshold_kph must be finite".to_string());
        }
        if !(self.entry_timeout_secs.is_finite() && self.entry_timeout_secs > 0.0) {
            return invalid(format!(
                "entry_timeout_secs must be positive, got {}",
                self.entry_timeout_secs
            ));
        }
        Ok(())
    }
}

/// Speed in km/h for `distance_m` covered in `elapsed_secs`.
pub fn compute_speed_kph(distance_m: f64, elapsed_secs: f64) -> Result<f64> {
    if !(elapsed_secs.is_finite() && elapsed_secs > 0.0) {
        return Err(Error::NonPositiveElapsed { elapsed_secs });
    }
    let speed = distance_m / elapsed_secs * MPS_TO_KPH;
    if speed.is_finite() {
        Ok(speed)
    } else {
        Err(Error::NonPositiveElapsed { elapsed_secs })
    }
}

/// Entry timestamps and completed identities for one direction.
#[derive(Debug)]
struct DirectionState {
    direction: Direction,
    entry: ReferenceLine,
    exit: ReferenceLine,
    entries: HashMap<Identity, Instant>,
    counted: HashSet<Identity>,
}

impl DirectionState {
    fn new(direction: Direction, entry: ReferenceLine, exit: ReferenceLine) -> Self {
        Self {
            direction,
            entry,
            exit,
            entries: HashMap::new(),
            counted: HashSet::new(),
        }
    }

    fn state(&self, identity: Identity) -> CrossingState {
        if self.counted.contains(&identity) {
            CrossingState::Completed
        } else if self.entries.contains_key(&identity) {
            CrossingState::Entered
        } else {
            CrossingState::Unseen
        }
    }

    fn evict(&mut self, now: Instant, timeout_secs: f64, warnings: &mut Vec<Warning>) {
        let direction = self.direction;
        self.entries.retain(|&identity, entered_at| {
            let age_secs = now.saturating_duration_since(*entered_at).as_secs_f64();
            if age_secs <= timeout_secs {
                return true;
            }
            tracing::debug!(identity, %direction, age_secs, "entry record evicted");
            warnings.push(Warning::EntryEvicted {
                identity,
                direction,
                age_secs,
            });
            false
        });
    }

    fn observe(
        &mut self,
        object: &TrackedObject,
        now: Instant,
        config: &EstimatorConfig,
        report: &mut FrameReport,
    ) {
        let identity = object.identity;
        if self.counted.contains(&identity) {
            return;
        }
        let cy = object.centroid().y;

        if self.entry.contains(cy) {
            match config.entry_policy {
                EntryPolicy::First => {
                    self.entries.entry(identity).or_insert(now);
                }
                EntryPolicy::Last => {
                    self.entries.insert(identity, now);
                }
            }
        }

        if !self.exit.contains(cy) {
            return;
        }
        let Some(&entered_at) = self.entries.get(&identity) else {
            return;
        };

        let elapsed_secs = now.saturating_duration_since(entered_at).as_secs_f64();
        match compute_speed_kph(config.distance_m, elapsed_secs) {
            Ok(speed_kph) => {
                self.entries.remove(&identity);
                self.counted.insert(identity);

                let flagged = speed_kph > config.flag_threshold_kph;
                let direction = self.direction;
                if flagged {
                    tracing::warn!(identity, %direction, speed_kph, "speed above threshold");
                } else {
                    tracing::info!(identity, %direction, speed_kph, "speed measured");
                }
                report.events.push(SpeedEvent {
                    identity,
                    direction,
                    bbox: object.bbox,
                    elapsed_secs,
                    speed_kph,
                    flagged,
                });
            }
            Err(err) => {
                tracing::warn!(identity, direction = %self.direction, %err, "crossing not measurable");
                report.warnings.push(Warning::ZeroElapsed {
                    identity,
                    direction: self.direction,
                });
            }
        }
    }
}

/// Times identities between line A and line B in both directions.
#[derive(Debug)]
pub struct SpeedEstimator {
    config: EstimatorConfig,
    down: DirectionState,
    up: DirectionState,
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl SpeedEstimator {
    /// `config` is used as given; see [`EstimatorConfig::validate`].
    pub fn new(config: EstimatorConfig) -> Self {
        let (line_a, line_b) = (config.line_a(), config.line_b());
        Self {
            down: DirectionState::new(Direction::Down, line_a, line_b),
            up: DirectionState::new(Direction::Up, line_b, line_a),
            config,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Evaluate one frame's tracked objects observed at `now`.
    ///
    /// Objects are handled in order, downward direction before upward for
    /// each object. Stale entry records are evicted first.
    pub fn evaluate(&mut self, objects: &[TrackedObject], now: Instant) -> FrameReport {
        let mut report = FrameReport::default();

        let timeout = self.config.entry_timeout_secs;
        self.down.evict(now, timeout, &mut report.warnings);
        self.up.evict(now, timeout, &mut report.warnings);

        for object in objects {
            self.down.observe(object, now, &self.config, &mut report);
            self.up.observe(object, now, &self.config, &mut report);
        }

        report.down_count = self.down_count();
        report.up_count = self.up_count();
        report
    }

    pub fn state(&self, identity: Identity, direction: Direction) -> CrossingState {
        self.direction(direction).state(identity)
    }

    /// Identities waiting in the entry table for `direction`.
    pub fn pending(&self, direction: Direction) -> usize {
        self.direction(direction).entries.len()
    }

    pub fn down_count(&self) -> usize {
        self.down.counted.len()
    }

    pub fn up_count(&self) -> usize {
        self.up.counted.len()
    }

    fn direction(&self, direction: Direction) -> &DirectionState {
        match direction {
            Direction::Down => &self.down,
            Direction::Up => &self.up,
        }
    }
}
