//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::audio::DEFAULT_TARGET_RATE;
use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Alignment defaults.
    #[serde(default)]
    pub alignment: AlignmentSettings,
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder for per-run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for the run log.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format (no per-segment detail).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Prefix run log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Write a log file per run into `paths.logs_folder`.
    #[serde(default)]
    pub write_log_file: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            show_timestamps: true,
            write_log_file: false,
        }
    }
}

/// Defaults for alignment runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentSettings {
    /// Minimum timing error worth correcting (milliseconds).
    #[serde(default = "default_threshold_ms")]
    pub threshold_ms: f64,

    /// Smart (0) to precise (100) mode.
    #[serde(default)]
    pub mode: f64,

    /// Rate audio is decimated towards before onset analysis (Hz).
    #[serde(default = "default_analysis_sample_rate")]
    pub analysis_sample_rate: u32,
}

fn default_threshold_ms() -> f64 {
    15.0
}

fn default_analysis_sample_rate() -> u32 {
    DEFAULT_TARGET_RATE
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            threshold_ms: default_threshold_ms(),
            mode: 0.0,
            analysis_sample_rate: default_analysis_sample_rate(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Alignment,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 3] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Alignment,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Alignment => "alignment",
        }
    }

    /// Comment written above the table in a generated file.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Working directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Alignment => "Alignment defaults (mode: 0 = smart, 100 = precise)",
        }
    }
}
