//! Project domain model.

use crate::serde_compat::{timestamp, timestamp_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level container for sessions, files and versions.
///
/// Loaded once per opened workspace and treated as immutable for the
/// lifetime of that workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier. The create endpoint reports it as `project_id`.
    #[serde(alias = "project_id")]
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time. Absent from create responses, where it defaults to now.
    #[serde(with = "timestamp", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Description with empty strings treated as absent.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// Request body for creating a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_response_uses_project_id_alias() {
        let project: Project = serde_json::from_str(
            r#"{"project_id": "p-1", "name": "Sales", "description": ""}"#,
        )
        .unwrap();
        assert_eq!(project.id, "p-1");
        assert_eq!(project.description(), None);
        assert!(project.updated_at.is_none());
    }

    #[test]
    fn test_list_entry_parses_naive_timestamp() {
        let project: Project = serde_json::from_str(
            r#"{"id": "p-2", "name": "Ops", "description": "weekly", "created_at": "2024-05-01T08:00:00", "version_count": 3}"#,
        )
        .unwrap();
        assert_eq!(project.description(), Some("weekly"));
        assert_eq!(project.created_at.to_rfc3339(), "2024-05-01T08:00:00+00:00");
    }
}
