use crate::errors::AppError;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Kind of hub repository; decides URL layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoType {
    Model,
    Dataset,
    Space,
}

impl RepoType {
    /// Path segment used by the hub REST API (`/api/{segment}/...`).
    pub fn api_segment(self) -> &'static str {
        match self {
            RepoType::Model => "models",
            RepoType::Dataset => "datasets",
            RepoType::Space => "spaces",
        }
    }

    /// Prefix of the public web address; models live at the root.
    fn url_prefix(self) -> &'static str {
        match self {
            RepoType::Model => "",
            RepoType::Dataset => "datasets/",
            RepoType::Space => "spaces/",
        }
    }
}

impl FromStr for RepoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "model" => Ok(RepoType::Model),
            "dataset" => Ok(RepoType::Dataset),
            "space" => Ok(RepoType::Space),
            other => Err(format!(
                "unknown repo type '{}' (expected model, dataset or space)",
                other
            )),
        }
    }
}

/// A repository on the hub.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub repo_id: String,
    pub repo_type: RepoType,
}

/// One file inside a model repository at a given revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub repo_id: String,
    pub filename: String,
    pub revision: String,
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.repo_id, self.revision, self.filename)
    }
}

/// A file to include in a commit, addressed by its path in the repository.
#[derive(Debug, Clone)]
pub struct CommitFile {
    pub path_in_repo: String,
    pub content: Vec<u8>,
}

/// What the hub reports after a commit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub commit_url: Option<String>,
    pub commit_oid: Option<String>,
}

/// Client for the model hub's download and commit endpoints.
#[derive(Clone)]
pub struct HubClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HubClient {
    /// Creates a new `HubClient`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base URL of the hub, e.g. `https://huggingface.co`.
    /// * `token` - Optional access token, sent as a bearer token.
    pub fn new(endpoint: String, token: Option<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create hub client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Public web address of a repository.
    pub fn repo_url(&self, repo: &RepoRef) -> String {
        format!(
            "{}/{}{}",
            self.endpoint,
            repo.repo_type.url_prefix(),
            repo.repo_id
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Downloads one file from a model repository into `cache_dir`.
    ///
    /// The file is written under `{cache_dir}/{owner}--{name}/{revision}/{filename}`
    /// through a temporary file, so a failed download never leaves a partial artifact.
    ///
    /// # Returns
    ///
    /// * `Result<PathBuf, AppError>` - Local path of the downloaded file.
    pub async fn download(
        &self,
        artifact: &ArtifactRef,
        cache_dir: &Path,
    ) -> Result<PathBuf, AppError> {
        let url = format!(
            "{}/{}/resolve/{}/{}",
            self.endpoint, artifact.repo_id, artifact.revision, artifact.filename
        );
        tracing::info!("Downloading {} from {}", artifact, url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Hub download failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Hub returned {} for {}: {}",
                status, artifact, error_text
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to read hub response: {}", e))
        })?;

        let dir = cache_dir
            .join(artifact.repo_id.replace('/', "--"))
            .join(&artifact.revision);
        let path = dir.join(&artifact.filename);
        let partial = dir.join(format!("{}.part", artifact.filename));

        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&partial, &bytes).await?;
            tokio::fs::rename(&partial, &path).await
        };
        write.await.map_err(|e| {
            AppError::InternalError(format!("Failed to store {} in cache: {}", artifact, e))
        })?;

        tracing::info!("✓ Downloaded {} ({} bytes) to {}", artifact, bytes.len(), path.display());
        Ok(path)
    }

    /// Creates a single commit adding or replacing `files` in `repo`.
    ///
    /// Uses the hub's NDJSON commit endpoint: a header line followed by one
    /// line per file with base64 content. Either the whole commit lands or none of it.
    pub async fn create_commit(
        &self,
        repo: &RepoRef,
        revision: &str,
        summary: &str,
        files: &[CommitFile],
    ) -> Result<CommitInfo, AppError> {
        let url = format!(
            "{}/api/{}/{}/commit/{}",
            self.endpoint,
            repo.repo_type.api_segment(),
            repo.repo_id,
            revision
        );
        tracing::info!(
            "Committing {} file(s) to {} ({})",
            files.len(),
            repo.repo_id,
            revision
        );

        let mut body = json!({
            "key": "header",
            "value": { "summary": summary, "description": "" }
        })
        .to_string();
        for file in files {
            body.push('\n');
            body.push_str(
                &json!({
                    "key": "file",
                    "value": {
                        "content": general_purpose::STANDARD.encode(&file.content),
                        "path": file.path_in_repo,
                        "encoding": "base64"
                    }
                })
                .to_string(),
            );
        }

        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Hub commit failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Hub commit to {} failed {}: {}",
                repo.repo_id, status, error_text
            )));
        }

        let info: CommitInfo = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse commit response: {}", e))
        })?;

        tracing::info!(
            "✓ Commit created: {}",
            info.commit_oid.as_deref().unwrap_or("unknown oid")
        );
        Ok(info)
    }
}
