use serde::Serialize;

use crate::speed::crossing_state::Direction;
use crate::tracker::{BoundingBox, Identity};

/// A completed crossing with its measured speed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedEvent {
    pub identity: Identity,
    pub direction: Direction,
    pub bbox: BoundingBox,
    pub elapsed_secs: f64,
    pub speed_kph: f64,
    /// Speed strictly above the configured threshold
    pub flagged: bool,
}

impl SpeedEvent {
    /// Speed truncated to whole km/h for display.
    pub fn display_kph(&self) -> i64 {
        self.speed_kph.trunc() as i64
    }
}

/// Conditions that were handled without producing an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Detection dropped before tracking because of degenerate geometry.
    RejectedBox {
        class_label: String,
        tlbr: [f32; 4],
    },
    /// Exit band reached with no measurable time since entry.
    ZeroElapsed {
        identity: Identity,
        direction: Direction,
    },
    /// Entry record dropped after waiting too long for the exit band.
    EntryEvicted {
        identity: Identity,
        direction: Direction,
        age_secs: f64,
    },
}

/// Everything the estimator produced for one processed frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub events: Vec<SpeedEvent>,
    pub warnings: Vec<Warning>,
    /// Identities counted so far towards the camera
    pub down_count: usize,
    /// Identities counted so far away from the camera
    pub up_count: usize,
}

impl FrameReport {
    pub fn flagged(&self) -> impl Iterator<Item = &SpeedEvent> {
        self.events.iter().filter(|e| e.flagged)
    }
}
