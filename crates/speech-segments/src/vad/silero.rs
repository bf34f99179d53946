use super::VadEngine;
use super::config::VadConfig;
use super::error::{VadError, VadResult};
use super::result::VadOutput;
use crate::model_source::ModelSource;
use ndarray::{Array1, Array2, Array3};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;
use std::path::Path;

/// Shape of the recurrent state tensor: `[2, batch, 128]`.
const STATE_SHAPE: (usize, usize, usize) = (2, 1, 128);

/// Silero VAD engine backed by an ONNX model.
///
/// Expects the single-state model signature: inputs `input`, `state` and
/// `sr`, outputs `output` and `stateN`.
pub struct SileroVad {
    session: Session,
    state: Array3<f32>,
    sample_rate_i64: i64,
    sample_rate: u32,
}

impl SileroVad {
    pub fn new(model_source: ModelSource, config: VadConfig) -> VadResult<Self> {
        config.validate()?;
        let model_path = model_source.resolve()?;
        let session = load_session(&model_path)?;

        Ok(Self {
            session,
            state: Array3::<f32>::zeros(STATE_SHAPE),
            sample_rate_i64: config.sample_rate as i64,
            sample_rate: config.sample_rate,
        })
    }

    pub fn from_file(path: impl Into<std::path::PathBuf>, config: VadConfig) -> VadResult<Self> {
        Self::new(ModelSource::from_file(path), config)
    }

    pub fn from_hf(
        repo_id: impl Into<String>,
        filename: impl Into<String>,
        config: VadConfig,
    ) -> VadResult<Self> {
        Self::new(ModelSource::from_hf(repo_id, filename), config)
    }

    pub fn reset(&mut self) {
        self.state.fill(0.0);
    }
}

impl VadEngine for SileroVad {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn reset(&mut self) {
        self.reset();
    }

    fn compute(&mut self, samples: &[f32]) -> VadResult<VadOutput> {
        if samples.is_empty() {
            return Err(VadError::InvalidInput(
                "VAD input must contain at least one sample".to_string(),
            ));
        }

        let samples_tensor = Array2::from_shape_vec((1, samples.len()), samples.to_vec())
            .map_err(|err| VadError::InvalidInput(err.to_string()))?;
        let samples_value = Value::from_array(samples_tensor).map_err(inference)?;
        let sr_value =
            Value::from_array(Array1::from_elem(1, self.sample_rate_i64)).map_err(inference)?;
        let state_value = Value::from_array(self.state.clone()).map_err(inference)?;

        let result = self
            .session
            .run(ort::inputs![
                "input" => samples_value,
                "state" => state_value,
                "sr" => sr_value
            ])
            .map_err(inference)?;

        let state_output = result
            .get("stateN")
            .ok_or_else(|| VadError::Inference("missing output 'stateN'".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(inference)?;
        self.state =
            Array3::from_shape_vec(STATE_SHAPE, state_output.1.to_vec()).map_err(inference)?;

        let output = result
            .get("output")
            .ok_or_else(|| VadError::Inference("missing output 'output'".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(inference)?;
        let probability = output
            .1
            .first()
            .copied()
            .ok_or_else(|| VadError::Inference("empty output tensor".to_string()))?;

        Ok(VadOutput::new(probability))
    }
}

/// Single-threaded session with full graph optimization.
fn load_session(path: &Path) -> VadResult<Session> {
    log::info!("Loading Silero VAD model from {}", path.display());
    Session::builder()
        .map_err(model_load)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(model_load)?
        .with_intra_threads(1)
        .map_err(model_load)?
        .with_inter_threads(1)
        .map_err(model_load)?
        .commit_from_file(path)
        .map_err(model_load)
}

fn model_load(err: impl std::fmt::Display) -> VadError {
    VadError::ModelLoad(err.to_string())
}

fn inference(err: impl std::fmt::Display) -> VadError {
    VadError::Inference(err.to_string())
}
