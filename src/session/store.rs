use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::filename::{sanitize_filename, with_hash_suffix};
use crate::error::AppError;

/// Server-assigned identifier grouping one batch of uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

impl StoredFile {
    /// `/<prefix>/<session>/<filename>`, with the filename percent-encoded.
    pub fn url(&self, prefix: &str, session_id: &SessionId) -> String {
        format!(
            "/{}/{}/{}",
            prefix.trim_matches('/'),
            session_id,
            urlencoding::encode(&self.filename)
        )
    }
}

/// Directory-per-session file layout under a single root.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    hash_suffix: bool,
}

impl SessionStore {
    pub async fn open(root: impl Into<PathBuf>, hash_suffix: bool) -> Result<Self, AppError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::storage(format!("Failed to create upload root {}", root.display()), e)
        })?;
        Ok(Self { root, hash_suffix })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, id: &SessionId) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub async fn create_session(&self) -> Result<SessionId, AppError> {
        let id = SessionId::generate();
        let dir = self.session_dir(&id);
        // Non-recursive so that an existing directory surfaces as a collision.
        fs::create_dir(&dir).await.map_err(|e| {
            AppError::storage(format!("Failed to create session directory for {}", id), e)
        })?;
        info!(session_id = %id, "Created session");
        Ok(id)
    }

    pub async fn list_files(&self, id: &SessionId) -> Result<Vec<StoredFile>, AppError> {
        let dir = self.session_dir(id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!("Session {} not found", id)));
            }
            Err(e) => {
                return Err(AppError::storage(
                    format!("Failed to read session directory for {}", id),
                    e,
                ))
            }
        };

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(AppError::storage(
                        format!("Failed to read session directory for {}", id),
                        e,
                    ))
                }
            };
            let filename = entry.file_name().to_string_lossy().into_owned();
            if filename.starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().await.map_err(|e| {
                AppError::storage(format!("Failed to stat {}", filename), e)
            })?;
            if !metadata.is_file() {
                continue;
            }
            files.push(StoredFile {
                filename,
                path: entry.path(),
                size: metadata.len(),
            });
        }

        if files.is_empty() {
            return Err(AppError::Empty(format!(
                "No files found for session {}",
                id
            )));
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    /// Write one file into a session, replacing any file with the same name.
    pub async fn write_file(
        &self,
        id: &SessionId,
        filename: &str,
        content: &[u8],
    ) -> Result<StoredFile, AppError> {
        let mut filename = sanitize_filename(filename)?;
        if self.hash_suffix {
            filename = sanitize_filename(&with_hash_suffix(&filename, content))?;
        }

        let dir = self.session_dir(id);
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(AppError::NotFound(format!("Session {} not found", id)));
        }

        let path = dir.join(&filename);
        let staging = dir.join(format!(".{}.partial", Uuid::new_v4().simple()));
        if let Err(e) = fs::write(&staging, content).await {
            let _ = fs::remove_file(&staging).await;
            return Err(AppError::storage(format!("Failed to write {}", filename), e));
        }
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(AppError::storage(format!("Failed to store {}", filename), e));
        }

        debug!(session_id = %id, filename = %filename, size = content.len(), "Stored file");

        Ok(StoredFile {
            filename,
            path,
            size: content.len() as u64,
        })
    }

    /// Remove a session and everything in it. Used to roll back failed uploads.
    pub async fn discard_session(&self, id: &SessionId) -> Result<(), AppError> {
        match fs::remove_dir_all(self.session_dir(id)).await {
            Ok(()) => {
                warn!(session_id = %id, "Discarded session");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::storage(
                format!("Failed to discard session {}", id),
                e,
            )),
        }
    }
}
