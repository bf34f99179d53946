//! WAV input and output.
//!
//! Samples are converted to interleaved `f32` in [-1, 1] on read and back to
//! the recorded encoding on write:
//!
//! | encoding | read                    | write                          |
//! |----------|-------------------------|--------------------------------|
//! | 8-bit    | `(u8 - 128) / 128`      | `round(v * 128)` saturated     |
//! | 16-bit   | `i16 / 32768`           | `round(v * 32768)` saturated   |
//! | 32-bit   | `i32 / 2^31`            | `round(v * 2^31)` saturated    |
//! | float    | as stored               | clamped to [-1, 1]             |

use crate::types::{AudioData, SampleEncoding};
use crate::vad::SpeechSegment;
use std::path::{Path, PathBuf};

const SCALE_8: f32 = 128.0;
const SCALE_16: f32 = 32_768.0;
const SCALE_32: f64 = 2_147_483_648.0;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Failed to read or write WAV file: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported WAV format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid audio layout: {0}")]
    InvalidLayout(String),
    #[error("Segment {start}..{end} lies outside audio of {frames} frames")]
    SegmentOutOfRange { start: u64, end: u64, frames: usize },
}

pub type AudioResult<T> = Result<T, AudioError>;

/// Read a WAV file into interleaved normalized samples.
pub fn read_wav(path: impl AsRef<Path>) -> AudioResult<AudioData> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let encoding = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 8) => SampleEncoding::Pcm8,
        (hound::SampleFormat::Int, 16) => SampleEncoding::Pcm16,
        (hound::SampleFormat::Int, 32) => SampleEncoding::Pcm32,
        (hound::SampleFormat::Float, 32) => SampleEncoding::Float32,
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{bits}-bit {format:?} samples"
            )));
        }
    };
    if spec.channels == 0 {
        return Err(AudioError::InvalidLayout("zero channels".to_string()));
    }

    let samples: Vec<f32> = match encoding {
        SampleEncoding::Pcm8 => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / SCALE_8))
            .collect::<Result<_, _>>()?,
        SampleEncoding::Pcm16 => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / SCALE_16))
            .collect::<Result<_, _>>()?,
        SampleEncoding::Pcm32 => reader
            .samples::<i32>()
            .map(|s| s.map(|v| (v as f64 / SCALE_32) as f32))
            .collect::<Result<_, _>>()?,
        SampleEncoding::Float32 => reader.samples::<f32>().collect::<Result<_, _>>()?,
    };

    log::debug!(
        "read {}: {} Hz, {} channel(s), {:?}, {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        encoding,
        samples.len()
    );

    Ok(AudioData {
        samples,
        channels: spec.channels as usize,
        sample_rate: spec.sample_rate,
        encoding,
    })
}

/// Write interleaved samples using `audio.encoding`.
pub fn write_wav(path: impl AsRef<Path>, audio: &AudioData) -> AudioResult<()> {
    if audio.channels == 0 || audio.channels > u16::MAX as usize {
        return Err(AudioError::InvalidLayout(format!(
            "{} channels",
            audio.channels
        )));
    }
    if audio.samples.len() % audio.channels != 0 {
        return Err(AudioError::InvalidLayout(format!(
            "{} samples do not divide into {} channels",
            audio.samples.len(),
            audio.channels
        )));
    }

    let spec = hound::WavSpec {
        channels: audio.channels as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: audio.encoding.bits_per_sample(),
        sample_format: match audio.encoding {
            SampleEncoding::Float32 => hound::SampleFormat::Float,
            _ => hound::SampleFormat::Int,
        },
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in &audio.samples {
        let sample = sample.clamp(-1.0, 1.0);
        match audio.encoding {
            SampleEncoding::Pcm8 => {
                writer.write_sample((sample * SCALE_8).round().clamp(-128.0, 127.0) as i8)?
            }
            SampleEncoding::Pcm16 => writer
                .write_sample((sample * SCALE_16).round().clamp(-32_768.0, 32_767.0) as i16)?,
            SampleEncoding::Pcm32 => writer.write_sample(
                (sample as f64 * SCALE_32)
                    .round()
                    .clamp(i32::MIN as f64, i32::MAX as f64) as i32,
            )?,
            SampleEncoding::Float32 => writer.write_sample(sample)?,
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Write one detected segment as `directory/segment_<index>.wav`.
///
/// Segment offsets count frames, so multi-channel audio is cut across all
/// channels. An end past the audio is clamped; a start past it is an error.
pub fn write_segment(
    audio: &AudioData,
    segment: &SpeechSegment,
    index: usize,
    directory: impl AsRef<Path>,
) -> AudioResult<PathBuf> {
    let frames = audio.frames();
    if segment.end <= segment.start || segment.start >= frames as u64 {
        return Err(AudioError::SegmentOutOfRange {
            start: segment.start,
            end: segment.end,
            frames,
        });
    }

    let end = segment.end.min(frames as u64) as usize;
    let clip = audio.slice_frames(segment.start as usize, end);
    let path = directory.as_ref().join(format!("segment_{index}.wav"));
    write_wav(&path, &clip)?;
    Ok(path)
}
