//! Core types for WAV decoding.

use serde::{Deserialize, Serialize};

/// Analysis rate the reader decimates towards (Hz).
pub const DEFAULT_TARGET_RATE: u32 = 22050;

/// Frames decoded per read call. Bounds memory independently of the window length.
pub const READ_CHUNK_FRAMES: usize = 4096;

/// A decoded, mono, decimated window of audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioWindow {
    /// Mono samples, nominally in [-1, 1].
    pub samples: Vec<f64>,
    /// Effective sample rate after decimation (Hz).
    pub sample_rate: f64,
}

impl AudioWindow {
    /// Create a window from decoded samples.
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A window with no samples and no usable rate.
    pub fn empty() -> Self {
        Self {
            samples: Vec::new(),
            sample_rate: 0.0,
        }
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration covered by the samples in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.samples.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

/// On-disk sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleEncoding {
    /// Signed 16-bit integer PCM.
    Int16,
    /// Signed 24-bit integer PCM, packed in 3 bytes.
    Int24,
    /// Signed 32-bit integer PCM.
    Int32,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
}

impl SampleEncoding {
    /// Resolve the encoding from the format tag family and bit depth.
    pub fn from_parts(is_float: bool, bits_per_sample: u16) -> Option<Self> {
        match (is_float, bits_per_sample) {
            (false, 16) => Some(SampleEncoding::Int16),
            (false, 24) => Some(SampleEncoding::Int24),
            (false, 32) => Some(SampleEncoding::Int32),
            (true, 32) => Some(SampleEncoding::Float32),
            (true, 64) => Some(SampleEncoding::Float64),
            _ => None,
        }
    }

    /// Bytes used by one sample of one channel.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleEncoding::Int16 => 2,
            SampleEncoding::Int24 => 3,
            SampleEncoding::Int32 | SampleEncoding::Float32 => 4,
            SampleEncoding::Float64 => 8,
        }
    }

    /// Decode one little-endian sample, normalising integers to [-1, 1].
    ///
    /// `bytes` must hold at least `bytes_per_sample()` bytes.
    pub fn decode(&self, bytes: &[u8]) -> f64 {
        match self {
            SampleEncoding::Int16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64 / 32768.0,
            SampleEncoding::Int24 => {
                let raw = (bytes[0] as i32) | ((bytes[1] as i32) << 8) | ((bytes[2] as i32) << 16);
                // Sign-extend from bit 23
                let value = (raw << 8) >> 8;
                value as f64 / 8_388_608.0
            }
            SampleEncoding::Int32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64 / 2_147_483_648.0
            }
            SampleEncoding::Float32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            SampleEncoding::Float64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }
}

/// Format information from the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavFormat {
    /// Interleaved channel count.
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    /// Sample encoding.
    pub encoding: SampleEncoding,
}

impl WavFormat {
    /// Bytes per interleaved frame.
    pub fn frame_size(&self) -> usize {
        self.encoding.bytes_per_sample() * self.channels as usize
    }

    /// Integer keep-one-in-N factor that brings the rate close to `target_rate`.
    pub fn decimation_factor(&self, target_rate: u32) -> u32 {
        (self.sample_rate / target_rate.max(1)).max(1)
    }

    /// Sample rate after decimation towards `target_rate`.
    pub fn decimated_rate(&self, target_rate: u32) -> f64 {
        self.sample_rate as f64 / self.decimation_factor(target_rate) as f64
    }
}

/// Summary of a WAV file, as reported by `probe_wav`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavInfo {
    /// Parsed format.
    pub format: WavFormat,
    /// Whole frames present in the data chunk.
    pub total_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

/// Error types for WAV decoding.
#[derive(Debug, thiserror::Error)]
pub enum WavError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with a RIFF/RF64 WAVE header.
    #[error("Not a WAVE file")]
    NotWave,

    /// A required chunk is absent.
    #[error("Missing '{0}' chunk")]
    MissingChunk(&'static str),

    /// Header bytes are inconsistent or cut short.
    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    /// Encoding the reader does not decode.
    #[error("Unsupported format: tag {format_tag:#06x}, {bits_per_sample} bits")]
    UnsupportedFormat { format_tag: u16, bits_per_sample: u16 },

    /// Caller asked for a meaningless window.
    #[error("Invalid range: offset {offset_secs}s, duration {duration_secs}s")]
    InvalidRange { offset_secs: f64, duration_secs: f64 },
}

/// Type alias for WAV results.
pub type WavResult<T> = Result<T, WavError>;
