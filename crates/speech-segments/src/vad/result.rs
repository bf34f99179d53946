use serde::{Deserialize, Serialize};

/// Width of the hysteresis band below the onset threshold.
pub const HYSTERESIS_GAP: f32 = 0.15;

/// Voice activity status for a VAD frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadStatus {
    /// At or above the onset threshold.
    Speech,
    /// Strictly below the negative threshold.
    Silence,
    /// Inside the dead zone between the two thresholds.
    Unknown,
}

/// Onset and confident-silence thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadThresholds {
    pub speech: f32,
    pub silence: f32,
}

impl VadThresholds {
    pub fn new(speech: f32, silence: f32) -> Self {
        Self { speech, silence }
    }

    /// Derive the silence threshold from the onset threshold.
    pub fn from_speech(speech: f32) -> Self {
        Self {
            speech,
            silence: (speech - HYSTERESIS_GAP).max(0.0),
        }
    }
}

impl Default for VadThresholds {
    fn default() -> Self {
        Self::from_speech(0.5)
    }
}

/// Raw VAD output for one scored frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadOutput {
    pub probability: f32,
}

impl VadOutput {
    pub fn new(probability: f32) -> Self {
        Self { probability }
    }

    pub fn status(&self, thresholds: VadThresholds) -> VadStatus {
        if self.probability >= thresholds.speech {
            VadStatus::Speech
        } else if self.probability < thresholds.silence {
            VadStatus::Silence
        } else {
            VadStatus::Unknown
        }
    }
}
