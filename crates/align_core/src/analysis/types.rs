//! Core types for onset analysis.

use serde::{Deserialize, Serialize};

use super::onset::{FRAME_SIZE, HOP_SIZE};

/// Tunables for onset detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetConfig {
    /// Standard deviations above the mean onset strength a peak must reach.
    pub threshold_factor: f64,
    /// Minimum spacing between accepted onsets of one segment (seconds).
    pub min_onset_gap: f64,
    /// Energy frame length in samples.
    pub frame_size: usize,
    /// Hop between energy frames in samples.
    pub hop: usize,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            threshold_factor: 3.0,
            min_onset_gap: 0.05,
            frame_size: FRAME_SIZE,
            hop: HOP_SIZE,
        }
    }
}

impl OnsetConfig {
    /// Create a config with the standard frame geometry.
    pub fn new(threshold_factor: f64, min_onset_gap: f64) -> Self {
        Self {
            threshold_factor,
            min_onset_gap,
            ..Self::default()
        }
    }
}

/// A target onset paired with its nearest reference onset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetMatch {
    /// Onset time on the target timeline (seconds).
    pub target_time: f64,
    /// Nearest reference onset (seconds).
    pub ref_time: f64,
    /// `target_time - ref_time`. Positive means the target is late.
    pub diff_secs: f64,
}

impl OnsetMatch {
    /// Pair a target onset with a reference onset.
    pub fn new(target_time: f64, ref_time: f64) -> Self {
        Self {
            target_time,
            ref_time,
            diff_secs: target_time - ref_time,
        }
    }

    /// Timing difference in milliseconds.
    pub fn diff_ms(&self) -> f64 {
        self.diff_secs * 1000.0
    }

    /// Shift that moves the target onset onto the reference onset.
    pub fn corrective_shift(&self) -> f64 {
        -self.diff_secs
    }
}

/// A match that passed the significance threshold and survived grouping.
pub type Adjustment = OnsetMatch;
