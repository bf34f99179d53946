//! # Speech Segments
//!
//! Turns a stream of frame-level speech probabilities into stable speech
//! segments.
//!
//! ## Architecture
//!
//! - [`vad::VadEngine`]: a black-box scorer returning a speech probability for
//!   one frame (with leading context) while keeping its own recurrent state.
//! - [`vad::FrameScorer`]: owns the trailing context carried from frame to
//!   frame and drives the engine.
//! - [`vad::SpeechSegmenter`]: applies onset/offset hysteresis, minimum speech
//!   and silence durations and forced splitting of over-long speech.
//! - [`audio`]: WAV input/output for feeding the segmenter and exporting
//!   segments.
//!
//! Enable engines using feature flags:
//! - `silero`: Silero VAD via ONNX Runtime
//! - `model-hf`: fetch the model from HuggingFace
//!
//! ## Example
//!
//! ```rust
//! use speech_segments::vad::{ScriptedVad, SegmenterConfig, SpeechSegmenter};
//!
//! let probabilities = vec![0.1, 0.1, 0.6, 0.6, 0.6, 0.2, 0.1, 0.1];
//! let engine = ScriptedVad::new(16_000, probabilities);
//! let config = SegmenterConfig::default()
//!     .with_min_silence_ms(32)
//!     .with_min_speech_ms(100);
//!
//! let mut segmenter = SpeechSegmenter::new(engine, config).unwrap();
//! let segments = segmenter.process(&vec![0.0; 8 * 512]).unwrap();
//!
//! assert_eq!(segments.len(), 1);
//! assert_eq!((segments[0].start, segments[0].end), (1_024, 3_072));
//! ```

pub mod audio;
pub mod model_source;
pub mod types;
pub mod vad;

pub use audio::{AudioError, AudioResult, read_wav, write_segment, write_wav};
pub use model_source::{ModelSource, ModelSourceError};
pub use types::{AudioData, SampleEncoding};
pub use vad::{
    SegmentEndReason, SegmenterConfig, SpeechSegment, SpeechSegmenter, VadEngine, VadError,
    VadResult,
};
