//! Energy-based onset detection.
//!
//! Detects transients (drum hits, picked notes, consonants) by looking for
//! sudden increases in short-time energy rather than spectral change. This
//! is cheap and works on decimated audio, which is all the reader provides.
//!
//! Algorithm per segment:
//! 1. Sum of squares over 512-sample frames, 256-sample hop
//! 2. Half-wave rectified frame-to-frame energy difference (onset strength)
//! 3. Threshold at `mean + threshold_factor * std` of the strength
//! 4. Greedy left-to-right local-maximum picking with a minimum frame distance
//! 5. Frame index to absolute timeline time

use crate::audio::AudioReader;
use crate::models::Segment;

use super::types::OnsetConfig;

/// Energy frame length in samples.
pub const FRAME_SIZE: usize = 512;

/// Hop between energy frames in samples.
pub const HOP_SIZE: usize = 256;

/// Detects onsets across a list of timeline segments.
pub struct OnsetDetector<'a> {
    reader: &'a dyn AudioReader,
    config: OnsetConfig,
}

impl<'a> OnsetDetector<'a> {
    /// Create a detector reading audio through `reader`.
    pub fn new(reader: &'a dyn AudioReader, config: OnsetConfig) -> Self {
        Self { reader, config }
    }

    /// Get the detection config.
    pub fn config(&self) -> &OnsetConfig {
        &self.config
    }

    /// Detect onsets in every segment and return them sorted ascending.
    ///
    /// Segments that cannot be decoded contribute nothing. No deduplication
    /// happens across segments.
    pub fn detect(&self, segments: &[Segment]) -> Vec<f64> {
        let mut onsets: Vec<f64> = segments
            .iter()
            .flat_map(|segment| self.detect_segment(segment))
            .collect();
        onsets.sort_by(f64::total_cmp);
        onsets
    }

    /// Detect onsets in a single segment as absolute timeline times.
    pub fn detect_segment(&self, segment: &Segment) -> Vec<f64> {
        if !segment.has_source() || segment.length <= 0.0 {
            return Vec::new();
        }

        let window =
            self.reader
                .read_window(&segment.file, segment.source_offset, segment.length);

        if window.len() < self.config.frame_size || window.sample_rate <= 0.0 {
            tracing::debug!(
                "Segment {} yielded {} samples, skipping onset detection",
                segment.id,
                window.len()
            );
            return Vec::new();
        }

        let peaks = detect_peaks_in_samples(&window.samples, window.sample_rate, &self.config);
        let end = segment.end();

        let onsets: Vec<f64> = peaks
            .into_iter()
            .map(|peak| segment.position + (peak * self.config.hop) as f64 / window.sample_rate)
            .filter(|&time| time <= end)
            .collect();

        tracing::debug!("Segment {}: {} onsets", segment.id, onsets.len());
        onsets
    }
}

/// Find onset peaks in a mono sample buffer.
///
/// Returns indices into the onset-strength sequence. Multiply by the hop and
/// divide by the sample rate for a time offset.
pub fn detect_peaks_in_samples(samples: &[f64], sample_rate: f64, config: &OnsetConfig) -> Vec<usize> {
    let energy = frame_energies(samples, config.frame_size, config.hop);
    if energy.len() < 3 {
        return Vec::new();
    }

    let strength = onset_strength(&energy);
    if strength.len() < 3 {
        return Vec::new();
    }

    let Some(threshold) = strength_threshold(&strength, config.threshold_factor) else {
        return Vec::new();
    };

    let min_distance = min_peak_distance(config.min_onset_gap, sample_rate, config.hop);
    pick_peaks(&strength, threshold, min_distance)
}

/// Sum of squared samples per frame.
///
/// The frame count is `(len - frame_size) / hop`; a trailing partial hop is
/// not analysed.
pub fn frame_energies(samples: &[f64], frame_size: usize, hop: usize) -> Vec<f64> {
    if hop == 0 || samples.len() < frame_size {
        return Vec::new();
    }

    let n_frames = (samples.len() - frame_size) / hop;
    (0..n_frames)
        .map(|i| {
            let start = i * hop;
            samples[start..start + frame_size]
                .iter()
                .map(|s| s * s)
                .sum()
        })
        .collect()
}

/// Positive frame-to-frame energy increase.
pub fn onset_strength(energy: &[f64]) -> Vec<f64> {
    energy
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect()
}

/// `mean + factor * std` of the strength, or None for a flat signal.
pub fn strength_threshold(strength: &[f64], factor: f64) -> Option<f64> {
    if strength.is_empty() {
        return None;
    }

    let n = strength.len() as f64;
    let mean = strength.iter().sum::<f64>() / n;
    let variance = strength.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return None;
    }

    Some(mean + factor * std_dev)
}

/// Frames two accepted peaks must be apart so their times differ by at least `min_gap`.
pub fn min_peak_distance(min_gap: f64, sample_rate: f64, hop: usize) -> usize {
    if hop == 0 || min_gap <= 0.0 {
        return 0;
    }
    (min_gap * sample_rate / hop as f64).ceil() as usize
}

/// Greedy local-maximum picking.
///
/// A frame is a peak when it exceeds `threshold`, is strictly greater than
/// its left neighbour and not less than its right neighbour. Scanning left to
/// right, a peak closer than `min_distance` frames to the last accepted one is
/// dropped.
pub fn pick_peaks(strength: &[f64], threshold: f64, min_distance: usize) -> Vec<usize> {
    let mut peaks: Vec<usize> = Vec::new();
    if strength.len() < 3 {
        return peaks;
    }

    for idx in 1..strength.len() - 1 {
        let value = strength[idx];
        if value <= threshold {
            continue;
        }
        if value > strength[idx - 1] && value >= strength[idx + 1] {
            match peaks.last() {
                Some(&last) if idx - last < min_distance => {}
                _ => peaks.push(idx),
            }
        }
    }

    peaks
}
