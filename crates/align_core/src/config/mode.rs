//! The smart/precise mode knob and the constants derived from it.
//!
//! Mode 0 ("Smart") detects only strong onsets, tolerates small timing
//! differences and groups nearby corrections into one musically coherent
//! move. Mode 100 ("Precise") detects finer onsets, widens the match window
//! and corrects every onset on its own. Values in between interpolate
//! linearly.

use serde::{Deserialize, Serialize};

use crate::analysis::OnsetConfig;

/// Lowest mode value.
pub const MODE_MIN: f64 = 0.0;

/// Highest mode value.
pub const MODE_MAX: f64 = 100.0;

/// Overlap reserved at every gap-filled edge for crossfading (seconds).
pub const CROSSFADE_SECS: f64 = 0.005;

/// Fraction of the way from smart to precise, in [0, 1].
fn blend(mode: f64) -> f64 {
    if mode.is_nan() {
        return 0.0;
    }
    mode.clamp(MODE_MIN, MODE_MAX) / MODE_MAX
}

/// Onset threshold factor (standard deviations above mean strength).
pub fn onset_sensitivity(mode: f64) -> f64 {
    4.0 - 2.0 * blend(mode)
}

/// Minimum gap between onsets of one segment (seconds).
pub fn onset_min_gap(mode: f64) -> f64 {
    0.05 - 0.025 * blend(mode)
}

/// Largest target-to-reference distance accepted as a match (seconds).
pub fn match_window(mode: f64) -> f64 {
    0.045 + 0.025 * blend(mode)
}

/// Window within which matches are grouped into one adjustment (seconds).
pub fn grouping_window(mode: f64) -> f64 {
    0.30 * (1.0 - blend(mode))
}

/// Derived constants for one mode value, computed once per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeParams {
    /// Mode clamped to [0, 100].
    pub mode: f64,
    pub onset_threshold_factor: f64,
    pub onset_min_gap: f64,
    pub match_window: f64,
    pub group_window: f64,
    pub crossfade: f64,
}

impl ModeParams {
    /// Compute every derived constant for `mode`.
    pub fn from_mode(mode: f64) -> Self {
        let mode = blend(mode) * MODE_MAX;
        Self {
            mode,
            onset_threshold_factor: onset_sensitivity(mode),
            onset_min_gap: onset_min_gap(mode),
            match_window: match_window(mode),
            group_window: grouping_window(mode),
            crossfade: CROSSFADE_SECS,
        }
    }

    /// Onset detection tunables for this mode.
    pub fn onset_config(&self) -> OnsetConfig {
        OnsetConfig::new(self.onset_threshold_factor, self.onset_min_gap)
    }

    /// Human readable mode name.
    pub fn label(&self) -> String {
        if self.mode <= MODE_MIN {
            "Smart (Musical)".to_string()
        } else if self.mode >= MODE_MAX {
            "Precise (Tight)".to_string()
        } else {
            format!("Blend ({})", self.mode.round() as i64)
        }
    }
}

impl Default for ModeParams {
    fn default() -> Self {
        Self::from_mode(MODE_MIN)
    }
}
