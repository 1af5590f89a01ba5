use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::hub_client::{ArtifactRef, RepoRef, RepoType};
use crate::model_loader::ModelSource;

pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_MODEL_REPO_ID: &str = "RandhirSingh23/tourism-xgboost-classifier";
pub const DEFAULT_SPACE_ID: &str = "RandhirSingh23/tourism-package-prediction-app";

fn repo_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*/[A-Za-z0-9][A-Za-z0-9._-]*$")
            .expect("repo id pattern is valid")
    })
}

/// Checks that `repo_id` has the `owner/name` shape the hub accepts.
pub fn validate_repo_id(name: &str, repo_id: &str) -> anyhow::Result<String> {
    let repo_id = repo_id.trim();
    if !repo_id_pattern().is_match(repo_id) || repo_id.contains("..") {
        anyhow::bail!("{} must look like owner/name, got '{}'", name, repo_id);
    }
    Ok(repo_id.to_string())
}

fn validate_endpoint(url: String) -> anyhow::Result<String> {
    if url.trim().is_empty() {
        anyhow::bail!("HUB_ENDPOINT cannot be empty");
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("HUB_ENDPOINT must start with http:// or https://");
    }
    url::Url::parse(&url).map_err(|e| anyhow::anyhow!("HUB_ENDPOINT is not a valid URL: {}", e))?;
    Ok(url)
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    non_empty_var(name).unwrap_or_else(|| default.to_string())
}

/// Settings for the prediction server.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub hub_endpoint: String,
    pub hub_token: Option<String>,
    pub model_repo_id: String,
    pub model_filename: String,
    pub model_revision: String,
    /// Local artifact; skips the hub when set.
    pub model_path: Option<PathBuf>,
    pub model_cache_dir: PathBuf,
    /// Pinned lowercase hex SHA-256 of the artifact.
    pub model_sha256: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 7860,
            hub_endpoint: DEFAULT_HUB_ENDPOINT.to_string(),
            hub_token: None,
            model_repo_id: DEFAULT_MODEL_REPO_ID.to_string(),
            model_filename: "model.json".to_string(),
            model_revision: "main".to_string(),
            model_path: None,
            model_cache_dir: PathBuf::from(".cache/models"),
            model_sha256: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            hub_endpoint: validate_endpoint(var_or("HUB_ENDPOINT", &defaults.hub_endpoint))?,
            hub_token: non_empty_var("HF_TOKEN"),
            model_repo_id: validate_repo_id(
                "MODEL_REPO_ID",
                &var_or("MODEL_REPO_ID", &defaults.model_repo_id),
            )?,
            model_filename: var_or("MODEL_FILENAME", &defaults.model_filename),
            model_revision: var_or("MODEL_REVISION", &defaults.model_revision),
            model_path: non_empty_var("MODEL_PATH").map(PathBuf::from),
            model_cache_dir: non_empty_var("MODEL_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_cache_dir),
            model_sha256: non_empty_var("MODEL_SHA256")
                .map(|digest| {
                    let digest = digest.trim().to_ascii_lowercase();
                    if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                        anyhow::bail!("MODEL_SHA256 must be 64 hex characters");
                    }
                    Ok(digest)
                })
                .transpose()?,
        };

        if config.model_filename.contains("..") || config.model_filename.starts_with('/') {
            anyhow::bail!("MODEL_FILENAME must be a path inside the repository");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Hub endpoint: {}", config.hub_endpoint);
        tracing::debug!("Model source: {}", config.model_source());
        if config.model_sha256.is_some() {
            tracing::info!("Model digest pinned");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// The artifact the server loads at startup.
    pub fn model_source(&self) -> ModelSource {
        match &self.model_path {
            Some(path) => ModelSource::File(path.clone()),
            None => ModelSource::Hub(ArtifactRef {
                repo_id: self.model_repo_id.clone(),
                filename: self.model_filename.clone(),
                revision: self.model_revision.clone(),
            }),
        }
    }
}

/// Settings for the one-shot publisher.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub hub_endpoint: String,
    pub hub_token: String,
    pub repo: RepoRef,
    pub revision: String,
    pub deploy_dir: PathBuf,
    pub path_in_repo: String,
}

impl PublishConfig {
    /// Reads publisher settings; `deploy_dir` overrides `DEPLOY_DIR` when given.
    pub fn from_env(deploy_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let repo_type: RepoType = var_or("PUBLISH_REPO_TYPE", "space")
            .parse()
            .map_err(|e: String| anyhow::anyhow!("PUBLISH_REPO_TYPE: {}", e))?;

        let config = Self {
            hub_endpoint: validate_endpoint(var_or("HUB_ENDPOINT", DEFAULT_HUB_ENDPOINT))?,
            hub_token: non_empty_var("HF_TOKEN")
                .ok_or_else(|| anyhow::anyhow!("HF_TOKEN environment variable required"))?,
            repo: RepoRef {
                repo_id: validate_repo_id("SPACE_ID", &var_or("SPACE_ID", DEFAULT_SPACE_ID))?,
                repo_type,
            },
            revision: var_or("PUBLISH_REVISION", "main"),
            deploy_dir: deploy_dir
                .or_else(|| non_empty_var("DEPLOY_DIR").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("deployment")),
            path_in_repo: var_or("PUBLISH_PATH_IN_REPO", "."),
        };

        tracing::info!("Publish configuration loaded");
        tracing::debug!(
            "Target: {} ({}), folder: {}",
            config.repo.repo_id,
            config.repo.repo_type.api_segment(),
            config.deploy_dir.display()
        );

        Ok(config)
    }
}
