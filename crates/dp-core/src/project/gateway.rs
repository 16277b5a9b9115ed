//! Project gateway trait.

use super::model::{NewProject, Project};
use crate::error::Result;
use async_trait::async_trait;

/// Remote API boundary for projects.
///
/// Implementations are pure transport: no caching and no retries.
#[async_trait]
pub trait ProjectGateway: Send + Sync {
    /// Lists every project.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Creates a project.
    ///
    /// # Errors
    ///
    /// Returns `DpError::Client` if the backend rejects the request.
    async fn create_project(&self, project: &NewProject) -> Result<Project>;

    /// Fetches a single project.
    ///
    /// # Errors
    ///
    /// Returns a client error with status 404 when the project does not exist
    /// (see `DpError::is_not_found`).
    async fn get_project(&self, project_id: &str) -> Result<Project>;
}
