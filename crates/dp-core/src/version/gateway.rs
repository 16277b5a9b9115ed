use super::model::{NewVersion, Version};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Remote API boundary for a project's version history.
#[async_trait]
pub trait VersionGateway: Send + Sync {
    /// Lists versions, most recent first.
    async fn list_versions(&self, project_id: &str) -> Result<Vec<Version>>;

    async fn create_version(&self, project_id: &str, request: &NewVersion) -> Result<Version>;

    /// Asks the backend to append a version mirroring `version_id`.
    ///
    /// The new head is server-assigned; callers reload the list afterwards.
    async fn rollback_version(&self, project_id: &str, version_id: &str) -> Result<()>;

    async fn get_version(&self, project_id: &str, version_id: &str) -> Result<Version>;

    /// Returns the backend's diff document for two versions.
    async fn compare_versions(&self, project_id: &str, left: &str, right: &str) -> Result<Value>;

    /// Downloads the data snapshot of a version.
    async fn download_version(&self, project_id: &str, version_id: &str) -> Result<Vec<u8>>;
}
