//! Artifact publisher: mirrors a local folder into a hub repository in one commit.
//!
//! Files present locally replace files at the same remote path. Remote files
//! with no local counterpart are left alone; there is no diffing and no rollback.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::hub_client::{CommitFile, HubClient, RepoRef};

/// Largest file sent inline; bigger files need LFS, which is not supported.
pub const MAX_INLINE_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Directory names never uploaded.
const IGNORED_DIRS: [&str; 1] = [".git"];

#[derive(Debug, Clone, PartialEq)]
pub enum PublishError {
    /// The folder does not exist or is not a directory.
    NotADirectory(PathBuf),
    /// The folder holds no files, so a commit would publish nothing.
    EmptyFolder(PathBuf),
    FileTooLarge { path: PathBuf, bytes: u64 },
    Io(String),
    /// The hub rejected or failed the commit.
    Upload(String),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::NotADirectory(p) => write!(f, "{} is not a directory", p.display()),
            PublishError::EmptyFolder(p) => {
                write!(f, "{} contains no files; nothing to publish", p.display())
            }
            PublishError::FileTooLarge { path, bytes } => write!(
                f,
                "{} is {} bytes; files over {} bytes are not supported",
                path.display(),
                bytes,
                MAX_INLINE_FILE_BYTES
            ),
            PublishError::Io(msg) => write!(f, "I/O error: {}", msg),
            PublishError::Upload(msg) => write!(f, "Upload failed: {}", msg),
        }
    }
}

impl std::error::Error for PublishError {}

/// Outcome of a successful publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    /// Public address of the repository.
    pub url: String,
    pub commit_url: Option<String>,
    pub files: usize,
    pub bytes: u64,
    pub completed_at: DateTime<Utc>,
}

/// Joins `relative` under `path_in_repo`; `.` and empty mean the repository root.
pub fn repo_path(path_in_repo: &str, relative: &Path) -> String {
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let prefix = path_in_repo.trim().trim_matches('/');
    if prefix.is_empty() || prefix == "." {
        relative
    } else {
        format!("{}/{}", prefix, relative)
    }
}

/// Reads every regular file under `folder`, sorted by repository path.
///
/// Symlinks are skipped, so nothing outside `folder` is uploaded.
pub async fn collect_files(
    folder: &Path,
    path_in_repo: &str,
) -> Result<Vec<CommitFile>, PublishError> {
    let io = |e: std::io::Error| PublishError::Io(e.to_string());

    match tokio::fs::metadata(folder).await {
        Ok(meta) if meta.is_dir() => {}
        _ => return Err(PublishError::NotADirectory(folder.to_path_buf())),
    }

    let mut files = Vec::new();
    let mut pending = vec![folder.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io)?;
        while let Some(entry) = entries.next_entry().await.map_err(io)? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(io)?;

            if file_type.is_symlink() {
                tracing::debug!("Skipping symlink {}", path.display());
                continue;
            }
            if file_type.is_dir() {
                let ignored = IGNORED_DIRS
                    .iter()
                    .any(|name| entry.file_name() == *name);
                if !ignored {
                    pending.push(path);
                }
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let bytes = entry.metadata().await.map_err(io)?.len();
            if bytes > MAX_INLINE_FILE_BYTES {
                return Err(PublishError::FileTooLarge { path, bytes });
            }

            let relative = path
                .strip_prefix(folder)
                .map_err(|e| PublishError::Io(e.to_string()))?;
            let content = tokio::fs::read(&path).await.map_err(io)?;
            files.push(CommitFile {
                path_in_repo: repo_path(path_in_repo, relative),
                content,
            });
        }
    }

    files.sort_by(|a, b| a.path_in_repo.cmp(&b.path_in_repo));
    Ok(files)
}

/// Uploads folders through a `HubClient`.
pub struct Publisher {
    hub: HubClient,
}

impl Publisher {
    pub fn new(hub: HubClient) -> Self {
        Self { hub }
    }

    /// Uploads all files of `folder` to `repo` at `revision` in a single commit.
    pub async fn publish(
        &self,
        folder: &Path,
        repo: &RepoRef,
        revision: &str,
        path_in_repo: &str,
    ) -> Result<PublishReport, PublishError> {
        let files = collect_files(folder, path_in_repo).await?;
        if files.is_empty() {
            return Err(PublishError::EmptyFolder(folder.to_path_buf()));
        }

        let bytes: u64 = files.iter().map(|f| f.content.len() as u64).sum();
        tracing::info!(
            "Publishing {} file(s), {} bytes from {} to {}",
            files.len(),
            bytes,
            folder.display(),
            repo.repo_id
        );

        let summary = format!("Upload folder using {}", env!("CARGO_PKG_NAME"));
        let commit = self
            .hub
            .create_commit(repo, revision, &summary, &files)
            .await
            .map_err(|e| PublishError::Upload(e.to_string()))?;

        Ok(PublishReport {
            url: self.hub.repo_url(repo),
            commit_url: commit.commit_url,
            files: files.len(),
            bytes,
            completed_at: Utc::now(),
        })
    }
}
