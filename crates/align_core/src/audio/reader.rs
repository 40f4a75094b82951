//! The audio source seam used by onset detection.

use std::path::Path;

use super::types::{AudioWindow, DEFAULT_TARGET_RATE};
use super::wav::read_wav_segment;

/// Source of decoded audio windows.
///
/// Implementations return an empty window on any failure; the onset detector
/// treats that as "this segment contributes no onsets".
pub trait AudioReader: Send + Sync {
    /// Decode `duration_secs` of `path` starting at `offset_secs`.
    fn read_window(&self, path: &Path, offset_secs: f64, duration_secs: f64) -> AudioWindow;
}

/// File-backed reader for WAV sources.
#[derive(Debug, Clone, Copy)]
pub struct WavReader {
    /// Rate to decimate towards (Hz).
    pub target_rate: u32,
}

impl WavReader {
    /// Create a reader decimating towards `target_rate`.
    pub fn new(target_rate: u32) -> Self {
        Self { target_rate }
    }
}

impl Default for WavReader {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_RATE)
    }
}

impl AudioReader for WavReader {
    fn read_window(&self, path: &Path, offset_secs: f64, duration_secs: f64) -> AudioWindow {
        read_wav_segment(path, offset_secs, duration_secs, self.target_rate)
    }
}
