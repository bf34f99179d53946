//! Voice Activity Detection (VAD) segmentation.
//!
//! A [`VadEngine`] scores one frame at a time. [`FrameScorer`] owns the
//! trailing context fed to the engine, and [`SpeechSegmenter`] folds the
//! resulting probabilities into speech segments through [`SegmentState`].

mod config;
mod error;
mod result;
mod scorer;
mod segmenter;
#[cfg(feature = "silero")]
mod silero;
mod state;

pub use config::{
    CONTEXT_SAMPLES_8K, CONTEXT_SAMPLES_16K, MIN_SILENCE_AT_MAX_SPEECH_MS, SegmenterConfig,
    SegmenterParams, VadConfig,
};
pub use error::{VadError, VadResult};
pub use result::{HYSTERESIS_GAP, VadOutput, VadStatus, VadThresholds};
pub use scorer::{FrameScorer, ScriptedVad};
pub use segmenter::{SegmentEndReason, SpeechSegment, SpeechSegmenter};
#[cfg(feature = "silero")]
pub use silero::SileroVad;
pub use state::{ActiveSpeech, SegmentState};

/// Trait abstraction for VAD engines.
///
/// `compute` receives the frame with its leading context already attached
/// and returns the speech probability; the engine keeps any recurrent state
/// between calls until `reset`.
pub trait VadEngine: Send {
    fn sample_rate(&self) -> u32;
    fn reset(&mut self);
    fn compute(&mut self, samples: &[f32]) -> VadResult<VadOutput>;
}
