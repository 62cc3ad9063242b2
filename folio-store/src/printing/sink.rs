//! Where exported documents go

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::common::{AppError, AppResult};

/// Destination for finished documents (file system, share sheet, ...)
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Store `bytes` under `file_name`, returning where they went
    async fn save(&self, file_name: &str, bytes: &[u8]) -> AppResult<PathBuf>;
}

/// Writes documents into one directory, creating it on first use
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl DocumentSink for FileSink {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        if file_name.contains(['/', '\\']) || file_name.trim().is_empty() {
            return Err(AppError::validation("file_name", format!("not a plain file name: {file_name}")));
        }
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::internal(format!("cannot create {}: {e}", self.dir.display())))?;

        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::internal(format!("cannot write {}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Document saved");
        Ok(path)
    }
}
