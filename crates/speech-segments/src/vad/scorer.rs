use super::VadEngine;
use super::error::{VadError, VadResult};
use super::result::VadOutput;

/// Feeds fixed-size frames to a [`VadEngine`], prepending the trailing
/// samples of the previous frame to each one.
///
/// The engine always sees `context_samples + frame_samples` values. The
/// context starts zeroed and is refreshed after every scored frame.
pub struct FrameScorer<E: VadEngine> {
    engine: E,
    frame_samples: usize,
    context: Vec<f32>,
    input: Vec<f32>,
}

impl<E: VadEngine> FrameScorer<E> {
    pub fn new(engine: E, context_samples: usize, frame_samples: usize) -> Self {
        Self {
            engine,
            frame_samples,
            context: vec![0.0; context_samples],
            input: Vec::with_capacity(context_samples + frame_samples),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    pub fn context(&self) -> &[f32] {
        &self.context
    }

    /// Zero the context and the engine's recurrent state.
    pub fn reset(&mut self) {
        self.context.fill(0.0);
        self.engine.reset();
    }

    /// Score one frame and advance the context.
    pub fn advance(&mut self, frame: &[f32]) -> VadResult<VadOutput> {
        if frame.len() != self.frame_samples {
            return Err(VadError::FrameLength {
                expected: self.frame_samples,
                actual: frame.len(),
            });
        }

        self.input.clear();
        self.input.extend_from_slice(&self.context);
        self.input.extend_from_slice(frame);

        let output = self.engine.compute(&self.input)?;

        let tail = self.input.len() - self.context.len();
        self.context.copy_from_slice(&self.input[tail..]);

        Ok(output)
    }
}

/// Engine that replays a fixed probability per frame.
///
/// Useful for tuning thresholds against a recorded trace and for tests.
/// Scoring past the end of the script is an inference error.
#[derive(Debug, Clone)]
pub struct ScriptedVad {
    sample_rate: u32,
    probabilities: Vec<f32>,
    cursor: usize,
}

impl ScriptedVad {
    pub fn new(sample_rate: u32, probabilities: Vec<f32>) -> Self {
        Self {
            sample_rate,
            probabilities,
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Frames scored since the last reset.
    pub fn frames_scored(&self) -> usize {
        self.cursor
    }
}

impl VadEngine for ScriptedVad {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn compute(&mut self, _samples: &[f32]) -> VadResult<VadOutput> {
        let probability = self.probabilities.get(self.cursor).copied().ok_or(
            VadError::ScriptExhausted {
                frames: self.probabilities.len(),
            },
        )?;
        self.cursor += 1;
        Ok(VadOutput::new(probability))
    }
}
