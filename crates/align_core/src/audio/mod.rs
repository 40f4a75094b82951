//! Audio decoding for onset analysis.
//!
//! A deliberately small WAV reader: it decodes a bounded time window of a
//! file into mono samples at a reduced rate. The output is only meant for
//! energy-based onset detection, never for playback.
//!
//! 1. **Header parsing** (`wav`): RIFF/RF64 container, `fmt ` and `data`
//!    chunks, unknown chunks skipped.
//! 2. **Windowed decode** (`wav`): chunked reads, channel averaging and
//!    keep-one-in-N decimation.
//! 3. **Reader seam** (`reader`): the `AudioReader` trait the onset detector
//!    reads through, with the file-backed `WavReader`.

mod reader;
pub mod types;
mod wav;

pub use reader::{AudioReader, WavReader};
pub use types::{
    AudioWindow, SampleEncoding, WavError, WavFormat, WavInfo, WavResult, DEFAULT_TARGET_RATE,
    READ_CHUNK_FRAMES,
};
pub use wav::{probe_wav, read_wav_segment, try_read_wav_segment};
