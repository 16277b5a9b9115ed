//! Project listing and creation, used before a workspace is opened.

use dp_core::error::{DpError, Result};
use dp_core::project::{NewProject, Project, ProjectGateway};
use std::sync::Arc;

pub struct ProjectDirectory {
    gateway: Arc<dyn ProjectGateway>,
}

impl ProjectDirectory {
    pub fn new(gateway: Arc<dyn ProjectGateway>) -> Self {
        Self { gateway }
    }

    /// All projects, most recently created first.
    pub async fn list(&self) -> Result<Vec<Project>> {
        let mut projects = self.gateway.list_projects().await?;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    /// Creates a project.
    ///
    /// # Errors
    ///
    /// Returns `DpError::Validation` for a blank name without issuing a request.
    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DpError::validation("project name must not be empty"));
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let project = self
            .gateway
            .create_project(&NewProject::new(name, description))
            .await?;
        tracing::info!("[ProjectDirectory] Created project {} ({})", project.name, project.id);
        Ok(project)
    }

    pub async fn get(&self, project_id: &str) -> Result<Project> {
        self.gateway.get_project(project_id).await
    }
}
