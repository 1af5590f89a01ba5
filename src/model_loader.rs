use moka::future::Cache;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::artifact_validator::{self, IntegrityError};
use crate::hub_client::{ArtifactRef, HubClient};
use crate::pipeline::Pipeline;

/// Where a pipeline artifact comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelSource {
    /// A file in a hub model repository.
    Hub(ArtifactRef),
    /// A file already on local disk.
    File(PathBuf),
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Hub(artifact) => write!(f, "hub:{}", artifact),
            ModelSource::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Failure to obtain a usable pipeline. All variants are fatal to serving.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Network, HTTP status, or disk failure while fetching.
    Fetch(String),
    /// Bytes did not match the pinned digest.
    Integrity(IntegrityError),
    /// Bytes are not a valid artifact document.
    Deserialize(String),
    /// Artifact parsed but cannot score a `CustomerRecord`.
    IncompatibleSchema(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Fetch(msg) => write!(f, "Model fetch failed: {}", msg),
            ModelError::Integrity(e) => write!(f, "Model integrity check failed: {}", e),
            ModelError::Deserialize(msg) => write!(f, "Model artifact is corrupt: {}", msg),
            ModelError::IncompatibleSchema(msg) => {
                write!(f, "Model artifact is incompatible: {}", msg)
            }
        }
    }
}

impl std::error::Error for ModelError {}

/// Parses and checks artifact bytes, enforcing `expected_sha256` when set.
pub fn pipeline_from_bytes(
    bytes: &[u8],
    expected_sha256: Option<&str>,
) -> Result<Pipeline, ModelError> {
    let digest =
        artifact_validator::verify(bytes, expected_sha256).map_err(ModelError::Integrity)?;
    let pipeline = Pipeline::parse(bytes).map_err(|e| ModelError::Deserialize(e.to_string()))?;
    pipeline
        .check_schema()
        .map_err(|e| ModelError::IncompatibleSchema(e.to_string()))?;

    tracing::debug!("Artifact sha256: {}", digest);
    Ok(pipeline)
}

/// Fetches pipelines once and hands out the same shared instance afterwards.
///
/// Concurrent first loads of the same source coalesce into a single fetch.
/// The cache is unbounded and entries never expire, so a loaded pipeline
/// lives as long as the process.
#[derive(Clone)]
pub struct ModelLoader {
    hub: HubClient,
    cache_dir: PathBuf,
    expected_sha256: Option<String>,
    models: Cache<ModelSource, Arc<Pipeline>>,
}

impl ModelLoader {
    pub fn new(hub: HubClient, cache_dir: PathBuf, expected_sha256: Option<String>) -> Self {
        Self {
            hub,
            cache_dir,
            expected_sha256,
            models: Cache::builder().build(),
        }
    }

    /// Returns the cached pipeline for `source`, fetching it on first use.
    pub async fn load(&self, source: &ModelSource) -> Result<Arc<Pipeline>, ModelError> {
        self.models
            .try_get_with(source.clone(), self.fetch(source))
            .await
            .map_err(|e: Arc<ModelError>| (*e).clone())
    }

    /// Number of pipelines currently held.
    pub async fn cached_models(&self) -> u64 {
        self.models.run_pending_tasks().await;
        self.models.entry_count()
    }

    async fn fetch(&self, source: &ModelSource) -> Result<Arc<Pipeline>, ModelError> {
        tracing::info!("Loading model from {}", source);

        let path = match source {
            ModelSource::Hub(artifact) => self
                .hub
                .download(artifact, &self.cache_dir)
                .await
                .map_err(|e| ModelError::Fetch(e.to_string()))?,
            ModelSource::File(path) => path.clone(),
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ModelError::Fetch(format!("{}: {}", path.display(), e)))?;
        let pipeline = pipeline_from_bytes(&bytes, self.expected_sha256.as_deref())?;

        tracing::info!(
            "✓ Model loaded from {}: {} columns, {} features",
            source,
            pipeline.columns.len(),
            pipeline.preprocessor.feature_count()
        );
        Ok(Arc::new(pipeline))
    }
}
