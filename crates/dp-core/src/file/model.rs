use crate::error::{DpError, Result};
use crate::serde_compat::timestamp_opt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File extensions the backend accepts for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv", "tsv", "xlsx", "xls", "parquet"];

/// A file stored in a project's repository. Unique by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileItem {
    #[serde(alias = "file_id")]
    pub id: String,
    #[serde(alias = "filename")]
    pub name: String,
    /// Server-side path; the key of the profile cache.
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, with = "timestamp_opt")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_type: Option<String>,
}

/// A file about to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Reads a local file into memory.
    ///
    /// # Errors
    ///
    /// Returns `DpError::Validation` if the path has no file name and
    /// `DpError::Io` if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| DpError::validation(format!("not a file path: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { file_name, bytes })
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Local checks performed before any request is issued.
    pub fn validate(&self) -> Result<()> {
        if self.file_name.trim().is_empty() {
            return Err(DpError::validation("file name must not be empty"));
        }
        match self.extension() {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(DpError::validation(format!(
                "unsupported file type: {} (allowed: {})",
                self.file_name,
                ALLOWED_EXTENSIONS.join(", ")
            ))),
        }
    }
}
