//! Onset analysis: detection, matching and grouping.
//!
//! # Architecture
//!
//! The analysis stages are pure functions (apart from the audio read in
//! detection) that the orchestrator steps compose:
//!
//! 1. **Onset Detection** (`onset`): short-time energy, positive energy flux,
//!    statistical threshold and greedy peak picking per segment.
//!
//! 2. **Onset Matching** (`matching`): nearest reference onset for every target
//!    onset, kept only inside the match window.
//!
//! 3. **Grouping** (`grouping`): significance filtering and mode-driven
//!    clustering down to one adjustment per cluster.
//!
//! # Usage
//!
//! ```ignore
//! use align_core::analysis::{group_adjustments, filter_significant, match_onsets, OnsetDetector};
//!
//! let detector = OnsetDetector::new(&reader, params.onset_config());
//! let ref_onsets = detector.detect(&ref_segments);
//! let target_onsets = detector.detect(&target_segments);
//!
//! let matches = match_onsets(&ref_onsets, &target_onsets, params.match_window);
//! let significant = filter_significant(&matches, 15.0);
//! let adjustments = group_adjustments(&significant, params.mode);
//! ```

mod grouping;
mod matching;
mod onset;
pub mod types;

pub use types::{Adjustment, OnsetConfig, OnsetMatch};

pub use onset::{
    detect_peaks_in_samples, frame_energies, min_peak_distance, onset_strength, pick_peaks,
    strength_threshold, OnsetDetector, FRAME_SIZE, HOP_SIZE,
};

pub use matching::{match_onsets, match_onsets_sorted, nearest_reference, SORTED_MATCH_CUTOFF};

pub use grouping::{filter_significant, group_adjustments, group_with_window, MIN_GROUPING_WINDOW};
