//! Minimal WAV reader with chunked, decimated decoding.
//!
//! Supports integer PCM at 16/24/32 bits and IEEE float at 32/64 bits,
//! including the WAVE_FORMAT_EXTENSIBLE wrapper. Decimation keeps one frame
//! in every N instead of low-pass filtering first; aliasing is acceptable
//! because the samples only feed short-time energy.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::types::{
    AudioWindow, SampleEncoding, WavError, WavFormat, WavInfo, WavResult, READ_CHUNK_FRAMES,
};

const FORMAT_PCM: u16 = 0x0001;
const FORMAT_IEEE_FLOAT: u16 = 0x0003;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Largest `fmt ` or `ds64` body read into memory.
const MAX_HEADER_CHUNK: u32 = 64 * 1024;

/// RF64 marks 32-bit size fields it has moved into `ds64` with this value.
const RF64_SIZE_PLACEHOLDER: u32 = u32::MAX;

/// Location of the sample data inside the file.
#[derive(Debug, Clone, Copy)]
struct WavLayout {
    format: WavFormat,
    data_offset: u64,
    data_size: u64,
}

impl WavLayout {
    fn total_frames(&self) -> u64 {
        self.data_size / self.format.frame_size() as u64
    }
}

/// Read a window of a WAV file as mono samples decimated towards `target_rate`.
///
/// Never fails: unreadable files, unsupported encodings and windows outside
/// the file all yield an empty window.
pub fn read_wav_segment(
    path: &Path,
    offset_secs: f64,
    duration_secs: f64,
    target_rate: u32,
) -> AudioWindow {
    match try_read_wav_segment(path, offset_secs, duration_secs, target_rate) {
        Ok(window) => window,
        Err(e) => {
            tracing::debug!("Could not decode {}: {}", path.display(), e);
            AudioWindow::empty()
        }
    }
}

/// Read a window of a WAV file, reporting why decoding failed.
///
/// A window that starts at or past the end of the data is not an error; it
/// returns an empty window. A window running past the end is truncated.
pub fn try_read_wav_segment(
    path: &Path,
    offset_secs: f64,
    duration_secs: f64,
    target_rate: u32,
) -> WavResult<AudioWindow> {
    if !offset_secs.is_finite()
        || !duration_secs.is_finite()
        || offset_secs < 0.0
        || duration_secs <= 0.0
    {
        return Err(WavError::InvalidRange {
            offset_secs,
            duration_secs,
        });
    }

    let mut reader = BufReader::new(File::open(path)?);
    let layout = parse_header(&mut reader)?;
    let format = layout.format;
    let sample_rate = format.sample_rate as f64;

    let total_frames = layout.total_frames();
    let start_frame = (offset_secs * sample_rate) as u64;
    let mut length_frames = (duration_secs * sample_rate) as u64;

    let decimate = format.decimation_factor(target_rate) as u64;
    let out_rate = format.decimated_rate(target_rate);

    if start_frame >= total_frames {
        return Ok(AudioWindow::new(Vec::new(), out_rate));
    }
    length_frames = length_frames.min(total_frames - start_frame);

    let frame_size = format.frame_size();
    reader.seek(SeekFrom::Start(
        layout.data_offset + start_frame * frame_size as u64,
    ))?;

    let channels = format.channels as usize;
    let bytes_per_sample = format.encoding.bytes_per_sample();
    let mut buffer = vec![0u8; READ_CHUNK_FRAMES * frame_size];
    let mut samples = Vec::with_capacity((length_frames / decimate + 1) as usize);
    let mut frames_read: u64 = 0;
    let mut frame_counter: u64 = 0;

    while frames_read < length_frames {
        let want = (READ_CHUNK_FRAMES as u64).min(length_frames - frames_read) as usize;
        let got = read_up_to(&mut reader, &mut buffer[..want * frame_size])?;
        let actual_frames = got / frame_size;
        if actual_frames == 0 {
            break;
        }

        for frame in buffer[..actual_frames * frame_size].chunks_exact(frame_size) {
            if frame_counter % decimate == 0 {
                let sum: f64 = frame
                    .chunks_exact(bytes_per_sample)
                    .map(|bytes| format.encoding.decode(bytes))
                    .sum();
                samples.push(sum / channels as f64);
            }
            frame_counter += 1;
        }

        frames_read += actual_frames as u64;
        if actual_frames < want {
            // Data chunk claims more than the file holds
            break;
        }
    }

    Ok(AudioWindow::new(samples, out_rate))
}

/// Parse the header of a WAV file and report its format and length.
pub fn probe_wav(path: &Path) -> WavResult<WavInfo> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut layout = parse_header(&mut reader)?;

    // Clamp the declared size to what the file actually holds
    let file_len = reader.get_ref().metadata()?.len();
    layout.data_size = layout
        .data_size
        .min(file_len.saturating_sub(layout.data_offset));

    let total_frames = layout.total_frames();
    Ok(WavInfo {
        format: layout.format,
        total_frames,
        duration_secs: total_frames as f64 / layout.format.sample_rate as f64,
    })
}

/// Walk the RIFF chunk list up to the start of the `data` chunk.
fn parse_header<R: Read + Seek>(reader: &mut R) -> WavResult<WavLayout> {
    let mut riff = [0u8; 12];
    reader
        .read_exact(&mut riff)
        .map_err(|_| WavError::NotWave)?;
    if !(&riff[0..4] == b"RIFF" || &riff[0..4] == b"RF64") || &riff[8..12] != b"WAVE" {
        return Err(WavError::NotWave);
    }

    let mut format: Option<WavFormat> = None;
    let mut ds64_data_size: Option<u64> = None;

    loop {
        let mut header = [0u8; 8];
        if read_up_to(reader, &mut header)? < header.len() {
            break;
        }
        let chunk_id = &header[0..4];
        let chunk_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let padded = chunk_size as i64 + (chunk_size & 1) as i64;

        match chunk_id {
            b"fmt " => {
                let body = read_chunk_body(reader, chunk_size)?;
                format = Some(parse_fmt(&body)?);
                skip_pad(reader, chunk_size)?;
            }
            b"ds64" => {
                let body = read_chunk_body(reader, chunk_size)?;
                if body.len() < 16 {
                    return Err(WavError::CorruptHeader("ds64 chunk too short".to_string()));
                }
                ds64_data_size = Some(u64::from_le_bytes([
                    body[8], body[9], body[10], body[11], body[12], body[13], body[14], body[15],
                ]));
                skip_pad(reader, chunk_size)?;
            }
            b"data" => {
                let format = format.ok_or(WavError::MissingChunk("fmt "))?;
                let data_offset = reader.stream_position()?;
                let data_size = match (chunk_size, ds64_data_size) {
                    (RF64_SIZE_PLACEHOLDER, Some(size)) => size,
                    _ => chunk_size as u64,
                };
                return Ok(WavLayout {
                    format,
                    data_offset,
                    data_size,
                });
            }
            _ => {
                reader.seek(SeekFrom::Current(padded))?;
            }
        }
    }

    match format {
        Some(_) => Err(WavError::MissingChunk("data")),
        None => Err(WavError::MissingChunk("fmt ")),
    }
}

/// Decode the body of a `fmt ` chunk.
fn parse_fmt(body: &[u8]) -> WavResult<WavFormat> {
    if body.len() < 16 {
        return Err(WavError::CorruptHeader(format!(
            "fmt chunk is {} bytes, expected at least 16",
            body.len()
        )));
    }

    let format_tag = u16::from_le_bytes([body[0], body[1]]);
    let channels = u16::from_le_bytes([body[2], body[3]]);
    let sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
    let bits_per_sample = u16::from_le_bytes([body[14], body[15]]);

    if channels == 0 || sample_rate == 0 {
        return Err(WavError::CorruptHeader(format!(
            "{} channels at {} Hz",
            channels, sample_rate
        )));
    }

    let unsupported = WavError::UnsupportedFormat {
        format_tag,
        bits_per_sample,
    };

    let is_float = match format_tag {
        FORMAT_PCM => false,
        FORMAT_IEEE_FLOAT => true,
        // Sub-format GUID starts at byte 24; its first two bytes carry the real tag
        FORMAT_EXTENSIBLE if body.len() >= 26 => match u16::from_le_bytes([body[24], body[25]]) {
            FORMAT_PCM => false,
            FORMAT_IEEE_FLOAT => true,
            _ => return Err(unsupported),
        },
        _ => return Err(unsupported),
    };

    let encoding = SampleEncoding::from_parts(is_float, bits_per_sample).ok_or(unsupported)?;

    Ok(WavFormat {
        channels,
        sample_rate,
        encoding,
    })
}

fn read_chunk_body<R: Read>(reader: &mut R, size: u32) -> WavResult<Vec<u8>> {
    if size > MAX_HEADER_CHUNK {
        return Err(WavError::CorruptHeader(format!(
            "header chunk claims {} bytes",
            size
        )));
    }

    let mut body = Vec::with_capacity(size as usize);
    reader.by_ref().take(u64::from(size)).read_to_end(&mut body)?;
    if body.len() < size as usize {
        return Err(WavError::CorruptHeader("chunk truncated".to_string()));
    }
    Ok(body)
}

fn skip_pad<R: Seek>(reader: &mut R, size: u32) -> WavResult<()> {
    if size & 1 == 1 {
        reader.seek(SeekFrom::Current(1))?;
    }
    Ok(())
}

/// Fill `buf` as far as the reader allows, returning the byte count.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    fn write_int16(dir: &TempDir, name: &str, rate: u32, channels: u16, frames: &[Vec<i16>]) -> PathBuf {
        let path = dir.path().join(name);
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for frame in frames {
            for &s in frame {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
        path
    }

    /// Assemble a WAV by hand for layouts hound does not write.
    fn build_wav(fmt_body: &[u8], extra_chunks: &[(&[u8; 4], Vec<u8>)], data: &[u8]) -> Vec<u8> {
        let mut chunks = Vec::new();
        chunks.extend_from_slice(b"fmt ");
        chunks.extend_from_slice(&(fmt_body.len() as u32).to_le_bytes());
        chunks.extend_from_slice(fmt_body);
        for (id, body) in extra_chunks {
            chunks.extend_from_slice(*id);
            chunks.extend_from_slice(&(body.len() as u32).to_le_bytes());
            chunks.extend_from_slice(body);
            if body.len() % 2 == 1 {
                chunks.push(0);
            }
        }
        chunks.extend_from_slice(b"data");
        chunks.extend_from_slice(&(data.len() as u32).to_le_bytes());
        chunks.extend_from_slice(data);

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(4 + chunks.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&chunks);
        out
    }

    fn fmt_body(tag: u16, channels: u16, rate: u32, bits: u16, sub_format: Option<u16>) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let mut body = Vec::new();
        body.extend_from_slice(&tag.to_le_bytes());
        body.extend_from_slice(&channels.to_le_bytes());
        body.extend_from_slice(&rate.to_le_bytes());
        body.extend_from_slice(&(rate * block_align as u32).to_le_bytes());
        body.extend_from_slice(&block_align.to_le_bytes());
        body.extend_from_slice(&bits.to_le_bytes());
        if let Some(sub) = sub_format {
            body.extend_from_slice(&22u16.to_le_bytes()); // cbSize
            body.extend_from_slice(&bits.to_le_bytes()); // valid bits
            body.extend_from_slice(&0u32.to_le_bytes()); // channel mask
            body.extend_from_slice(&sub.to_le_bytes());
            body.extend_from_slice(&[
                0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
            ]);
        }
        body
    }

    #[test]
    fn decimates_to_integer_factor() {
        let dir = tempdir().unwrap();
        let frames: Vec<Vec<i16>> = (0..48000).map(|i| vec![(i % 100) as i16]).collect();
        let path = write_int16(&dir, "tone.wav", 48000, 1, &frames);

        let window = try_read_wav_segment(&path, 0.25, 0.5, 22050).unwrap();

        assert_eq!(window.sample_rate, 24000.0);
        let expected = 0.5 * window.sample_rate;
        assert!((window.len() as f64 - expected).abs() <= 1.0);
        // Keeps every second frame starting at the window start (frame 12000)
        assert_eq!(window.samples[0], 0.0);
        assert_eq!(window.samples[1], 2.0 / 32768.0);
    }

    #[test]
    fn averages_channels_to_mono() {
        let dir = tempdir().unwrap();
        let frames: Vec<Vec<i16>> = (0..1000).map(|_| vec![16384, -16384]).collect();
        let stereo = write_int16(&dir, "cancel.wav", 22050, 2, &frames);
        let window = read_wav_segment(&stereo, 0.0, 0.02, 22050);
        assert!(!window.is_empty());
        assert!(window.samples.iter().all(|&s| s == 0.0));

        let frames: Vec<Vec<i16>> = (0..1000).map(|_| vec![16384, 0]).collect();
        let half = write_int16(&dir, "half.wav", 22050, 2, &frames);
        let window = read_wav_segment(&half, 0.0, 0.02, 22050);
        assert!(window.samples.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn reads_24_bit_with_sign() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deep.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..2205 {
            let value: i32 = if i % 2 == 0 { -4_194_304 } else { 4_194_304 };
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let window = try_read_wav_segment(&path, 0.0, 0.1, 22050).unwrap();
        assert_eq!(window.len(), 2205);
        assert_eq!(window.samples[0], -0.5);
        assert_eq!(window.samples[1], 0.5);
    }

    #[test]
    fn reads_32_bit_float() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..4410 {
            writer.write_sample(0.25f32).unwrap();
        }
        writer.finalize().unwrap();

        let window = try_read_wav_segment(&path, 0.0, 0.1, 22050).unwrap();
        assert_eq!(window.sample_rate, 22050.0);
        assert_eq!(window.len(), 2205);
        assert!(window.samples.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn reads_extensible_float64_after_odd_chunk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ext.wav");
        let data: Vec<u8> = (0..100)
            .flat_map(|i| (if i < 50 { -0.75f64 } else { 0.125f64 }).to_le_bytes())
            .collect();
        let bytes = build_wav(
            &fmt_body(FORMAT_EXTENSIBLE, 1, 1000, 64, Some(FORMAT_IEEE_FLOAT)),
            &[(b"LIST", vec![1, 2, 3])],
            &data,
        );
        fs::write(&path, bytes).unwrap();

        let window = try_read_wav_segment(&path, 0.0, 1.0, 22050).unwrap();
        assert_eq!(window.sample_rate, 1000.0);
        assert_eq!(window.len(), 100);
        assert_eq!(window.samples[0], -0.75);
        assert_eq!(window.samples[99], 0.125);

        let info = probe_wav(&path).unwrap();
        assert_eq!(info.total_frames, 100);
        assert!((info.duration_secs - 0.1).abs() < 1e-12);
        assert_eq!(info.format.encoding, SampleEncoding::Float64);
    }

    #[test]
    fn truncated_data_chunk_is_not_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.wav");
        let data: Vec<u8> = (0..200i16).flat_map(|v| v.to_le_bytes()).collect();
        let mut bytes = build_wav(&fmt_body(FORMAT_PCM, 1, 1000, 16, None), &[], &data);
        // Drop the last 100 frames but keep the declared size
        bytes.truncate(bytes.len() - 200);
        fs::write(&path, bytes).unwrap();

        let window = try_read_wav_segment(&path, 0.0, 1.0, 22050).unwrap();
        assert_eq!(window.len(), 100);
        assert_eq!(probe_wav(&path).unwrap().total_frames, 100);
    }

    #[test]
    fn offset_past_end_yields_empty_window() {
        let dir = tempdir().unwrap();
        let frames: Vec<Vec<i16>> = (0..22050).map(|_| vec![1000]).collect();
        let path = write_int16(&dir, "one_second.wav", 22050, 1, &frames);

        let window = try_read_wav_segment(&path, 5.0, 1.0, 22050).unwrap();
        assert!(window.is_empty());

        // Window running past the end is truncated
        let window = try_read_wav_segment(&path, 0.5, 2.0, 22050).unwrap();
        assert_eq!(window.len(), 11025);
    }

    #[test]
    fn unsupported_inputs_degrade_to_empty() {
        let dir = tempdir().unwrap();

        let eight_bit = dir.path().join("u8.wav");
        fs::write(
            &eight_bit,
            build_wav(&fmt_body(FORMAT_PCM, 1, 8000, 8, None), &[], &[128u8; 64]),
        )
        .unwrap();
        assert!(matches!(
            try_read_wav_segment(&eight_bit, 0.0, 1.0, 22050),
            Err(WavError::UnsupportedFormat { bits_per_sample: 8, .. })
        ));
        assert!(read_wav_segment(&eight_bit, 0.0, 1.0, 22050).is_empty());

        let adpcm = dir.path().join("adpcm.wav");
        fs::write(
            &adpcm,
            build_wav(&fmt_body(0x0002, 1, 8000, 16, None), &[], &[0u8; 64]),
        )
        .unwrap();
        assert!(read_wav_segment(&adpcm, 0.0, 1.0, 22050).is_empty());

        let text = dir.path().join("notes.wav");
        fs::write(&text, b"definitely not audio").unwrap();
        assert!(matches!(
            try_read_wav_segment(&text, 0.0, 1.0, 22050),
            Err(WavError::NotWave)
        ));

        let missing = dir.path().join("missing.wav");
        assert!(read_wav_segment(&missing, 0.0, 1.0, 22050).is_empty());
    }

    #[test]
    fn missing_data_chunk_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nodata.wav");
        let mut bytes = Vec::new();
        let fmt = fmt_body(FORMAT_PCM, 1, 8000, 16, None);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(12 + fmt.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&fmt);
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            try_read_wav_segment(&path, 0.0, 1.0, 22050),
            Err(WavError::MissingChunk("data"))
        ));
    }

    #[test]
    fn oversized_header_chunk_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge_fmt.wav");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&36u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        bytes.extend_from_slice(&fmt_body(FORMAT_PCM, 1, 8000, 16, None));
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            try_read_wav_segment(&path, 0.0, 1.0, 22050),
            Err(WavError::CorruptHeader(_))
        ));
        assert!(read_wav_segment(&path, 0.0, 1.0, 22050).is_empty());
    }

    #[test]
    fn short_header_chunk_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short_fmt.wav");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&20u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 0, 1, 0]);
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            try_read_wav_segment(&path, 0.0, 1.0, 22050),
            Err(WavError::CorruptHeader(_))
        ));
    }

    #[test]
    fn rejects_invalid_ranges() {
        let dir = tempdir().unwrap();
        let frames: Vec<Vec<i16>> = (0..100).map(|_| vec![0]).collect();
        let path = write_int16(&dir, "tiny.wav", 22050, 1, &frames);

        assert!(matches!(
            try_read_wav_segment(&path, 0.0, 0.0, 22050),
            Err(WavError::InvalidRange { .. })
        ));
        assert!(matches!(
            try_read_wav_segment(&path, -1.0, 1.0, 22050),
            Err(WavError::InvalidRange { .. })
        ));
        assert!(matches!(
            try_read_wav_segment(&path, f64::NAN, 1.0, 22050),
            Err(WavError::InvalidRange { .. })
        ));
    }
}
