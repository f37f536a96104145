use std::fmt;

use serde::{Deserialize, Serialize};

/// Crossing lifecycle of one identity in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossingState {
    /// Never observed inside the entry band
    #[default]
    Unseen,
    /// Entry time recorded, exit band not reached yet
    Entered,
    /// Speed reported; terminal
    Completed,
}

/// Travel direction between the two reference lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Line A to line B, towards the camera.
    Down,
    /// Line B to line A, away from the camera.
    Up,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => f.write_str("down"),
            Self::Up => f.write_str("up"),
        }
    }
}
