use crate::model_source::ModelSourceError;

#[derive(Debug, thiserror::Error)]
pub enum VadError {
    #[error("Unsupported sample rate: {0} Hz (expected 8000 or 16000)")]
    UnsupportedSampleRate(u32),
    #[error("Invalid segmenter configuration: {0}")]
    InvalidConfig(String),
    #[error("Frame of {actual} samples does not match the configured {expected}")]
    FrameLength { expected: usize, actual: usize },
    #[error("Invalid audio input: {0}")]
    InvalidInput(String),
    #[error("Probability script ran out after {frames} frames")]
    ScriptExhausted { frames: usize },
    #[error(transparent)]
    ModelSource(#[from] ModelSourceError),
    #[error("Failed to load VAD model: {0}")]
    ModelLoad(String),
    #[error("VAD inference failed: {0}")]
    Inference(String),
}

pub type VadResult<T> = Result<T, VadError>;
