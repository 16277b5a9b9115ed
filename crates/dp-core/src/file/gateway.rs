use super::model::{FileItem, FileUpload};
use crate::error::Result;
use async_trait::async_trait;

/// Remote API boundary for a project's file repository.
#[async_trait]
pub trait FileGateway: Send + Sync {
    async fn list_files(&self, project_id: &str) -> Result<Vec<FileItem>>;

    /// Uploads a file (multipart) and returns the stored item.
    async fn upload_file(&self, project_id: &str, upload: &FileUpload) -> Result<FileItem>;
}
