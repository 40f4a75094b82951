//! Configuration for track alignment.
//!
//! This module provides:
//! - TOML settings file with `[paths]`, `[logging]` and `[alignment]` tables
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates that leave the rest of the file untouched
//! - `ModeParams`, the detection/matching/grouping constants derived from the
//!   0-100 mode knob
//!
//! # Example
//!
//! ```no_run
//! use align_core::config::{ConfigManager, ConfigSection, ModeParams};
//!
//! let mut config = ConfigManager::new("align.toml");
//! config.load_or_create().unwrap();
//!
//! let params = ModeParams::from_mode(config.settings().alignment.mode);
//! println!("{} (match window {:.0}ms)", params.label(), params.match_window * 1000.0);
//!
//! config.settings_mut().alignment.threshold_ms = 20.0;
//! config.update_section(ConfigSection::Alignment).unwrap();
//! ```

mod manager;
mod mode;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use mode::{
    grouping_window, match_window, onset_min_gap, onset_sensitivity, ModeParams, CROSSFADE_SECS,
    MODE_MAX, MODE_MIN,
};
pub use settings::{AlignmentSettings, ConfigSection, LoggingSettings, PathSettings, Settings};
