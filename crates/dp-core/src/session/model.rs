//! Session domain model.

use crate::serde_compat::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title used when a session is created without one.
pub const DEFAULT_SESSION_TITLE: &str = "New conversation";

/// One chat conversation thread within a project.
///
/// Only `title` and `updated_at` ever change after creation. Sessions are
/// never deleted client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Owning project
    pub project_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Title for display, falling back to [`DEFAULT_SESSION_TITLE`].
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_SESSION_TITLE)
    }
}

/// Form fields for `POST /sessions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSession {
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,
}

impl NewSession {
    /// Builds a creation request, substituting the default title when `title`
    /// is missing or blank.
    pub fn new(
        project_id: impl Into<String>,
        title: Option<String>,
        initial_message: Option<String>,
    ) -> Self {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());
        let initial_message = initial_message.filter(|m| !m.trim().is_empty());
        Self {
            project_id: project_id.into(),
            title,
            initial_message,
        }
    }
}
