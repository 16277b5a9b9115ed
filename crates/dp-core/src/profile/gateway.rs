use super::model::{DataProfile, PreviewRow};
use crate::error::Result;
use async_trait::async_trait;

/// Remote API boundary for the profiling endpoints.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Computes the profile of the file at `file_path`.
    async fn profile(&self, file_path: &str) -> Result<DataProfile>;

    /// Returns the first `limit` rows of the file at `file_path`.
    async fn preview(&self, file_path: &str, limit: usize) -> Result<Vec<PreviewRow>>;
}
