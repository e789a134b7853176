//! Document storage
//!
//! Uploaded PDFs live by name in a single flat directory. Names are reduced
//! to their final path component so a request can never reach outside it.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Extension accepted on upload
pub const PDF_EXTENSION: &str = ".pdf";

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Flat directory of documents, resolvable by filename
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage directory if it does not exist yet
    pub async fn ensure_dir(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Names of all stored documents, sorted
    pub async fn list(&self) -> StorageResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Store an uploaded PDF, replacing any file with the same name
    pub async fn save(&self, filename: &str, data: &[u8]) -> StorageResult<(String, PathBuf)> {
        let name = sanitize(filename)
            .filter(|name| is_pdf(name))
            .ok_or_else(|| StorageError::InvalidFileType(filename.to_string()))?;

        self.ensure_dir().await?;
        let path = self.root.join(&name);
        tokio::fs::write(&path, data).await?;

        tracing::info!(file_name = %name, size = data.len(), "Stored document");
        Ok((name, path))
    }

    /// Path of a stored document
    pub async fn resolve(&self, filename: &str) -> StorageResult<PathBuf> {
        let name = sanitize(filename).ok_or_else(|| StorageError::NotFound(filename.to_string()))?;
        let path = self.root.join(name);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(StorageError::NotFound(filename.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored document
    pub async fn remove(&self, filename: &str) -> StorageResult<()> {
        let path = self.resolve(filename).await?;
        tokio::fs::remove_file(&path).await?;
        tracing::info!(file_name = %filename, "Removed document");
        Ok(())
    }

    /// Raw bytes of a stored document
    pub async fn read(&self, filename: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(filename).await?;
        Ok(tokio::fs::read(path).await?)
    }
}

fn sanitize(filename: &str) -> Option<String> {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn is_pdf(name: &str) -> bool {
    name.len() > PDF_EXTENSION.len() && name.to_ascii_lowercase().ends_with(PDF_EXTENSION)
}
