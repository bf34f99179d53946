use std::path::{Path, PathBuf};

/// HuggingFace repository hosting the single-state Silero VAD export.
pub const SILERO_HF_REPO: &str = "onnx-community/silero-vad";
/// Model file inside [`SILERO_HF_REPO`].
pub const SILERO_HF_FILE: &str = "onnx/model.onnx";

/// Where a scorer model is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    File {
        path: PathBuf,
    },
    HuggingFace {
        repo_id: String,
        filename: String,
        revision: Option<String>,
    },
}

impl ModelSource {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    pub fn from_hf(repo_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::HuggingFace {
            repo_id: repo_id.into(),
            filename: filename.into(),
            revision: None,
        }
    }

    /// The published Silero VAD model.
    pub fn silero() -> Self {
        Self::from_hf(SILERO_HF_REPO, SILERO_HF_FILE)
    }

    /// Pin a HuggingFace revision (branch, tag, or commit SHA). No effect on
    /// local files.
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        if let Self::HuggingFace { revision: slot, .. } = &mut self {
            *slot = Some(revision.into());
        }
        self
    }

    /// Resolve to a local path, downloading if necessary.
    pub fn resolve(&self) -> Result<PathBuf, ModelSourceError> {
        match self {
            Self::File { path } => {
                if path.is_file() {
                    Ok(path.clone())
                } else {
                    Err(ModelSourceError::MissingLocalFile(path.clone()))
                }
            }
            Self::HuggingFace {
                repo_id,
                filename,
                revision,
            } => resolve_hf(repo_id, filename, revision.as_deref()),
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::File { path } => Some(path.as_path()),
            Self::HuggingFace { .. } => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelSourceError {
    #[error("Model file not found: {0}")]
    MissingLocalFile(PathBuf),
    #[error("HuggingFace support is not enabled; enable the `model-hf` feature")]
    HuggingFaceDisabled,
    #[error("HuggingFace download failed: {0}")]
    HuggingFaceDownload(String),
    #[error("HuggingFace repo id is required")]
    MissingRepoId,
    #[error("HuggingFace filename is required")]
    MissingFilename,
}

#[cfg(feature = "model-hf")]
fn resolve_hf(
    repo_id: &str,
    filename: &str,
    revision: Option<&str>,
) -> Result<PathBuf, ModelSourceError> {
    use hf_hub::api::sync::ApiBuilder;
    use hf_hub::{Cache, Repo, RepoType};

    if repo_id.is_empty() {
        return Err(ModelSourceError::MissingRepoId);
    }
    if filename.is_empty() {
        return Err(ModelSourceError::MissingFilename);
    }

    let mut api_builder = ApiBuilder::from_cache(Cache::from_env());
    if let Ok(endpoint) = std::env::var("HF_ENDPOINT") {
        api_builder = api_builder.with_endpoint(endpoint);
    }
    if let Some(token) = hf_token() {
        api_builder = api_builder.with_token(Some(token));
    }
    let api = api_builder
        .build()
        .map_err(|err| ModelSourceError::HuggingFaceDownload(err.to_string()))?;
    let revision = revision.unwrap_or("main");
    let repo = Repo::with_revision(repo_id.to_string(), RepoType::Model, revision.to_string());
    log::info!("Fetching {filename} from {repo_id}@{revision}");
    api.repo(repo)
        .get(filename)
        .map_err(|err| ModelSourceError::HuggingFaceDownload(err.to_string()))
}

#[cfg(not(feature = "model-hf"))]
fn resolve_hf(
    _repo_id: &str,
    _filename: &str,
    _revision: Option<&str>,
) -> Result<PathBuf, ModelSourceError> {
    Err(ModelSourceError::HuggingFaceDisabled)
}

#[cfg(feature = "model-hf")]
fn hf_token() -> Option<String> {
    std::env::var("HUGGINGFACE_HUB_TOKEN")
        .ok()
        .or_else(|| std::env::var("HF_TOKEN").ok())
        .or_else(|| std::env::var("HUGGINGFACE_TOKEN").ok())
}
