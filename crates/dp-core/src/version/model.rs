//! Version domain model.

use crate::serde_compat::{string_or_number, timestamp, timestamp_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An immutable snapshot record in a project's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Commit-like identifier assigned by the server.
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    /// Monotonic label (string or ordinal); may be absent on list payloads.
    #[serde(default, with = "string_or_number")]
    pub version: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Raw operation type; see [`Version::kind`].
    #[serde(default, rename = "type")]
    pub operation: Option<String>,
    /// Generated code, truncated by the list endpoint.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub data_snapshot_path: Option<String>,
    #[serde(default)]
    pub metadata: Option<VersionMetadata>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Version {
    pub fn kind(&self) -> VersionKind {
        VersionKind::parse(self.operation.as_deref())
    }

    /// `v<version>`, or a short id when the label is missing.
    pub fn label(&self) -> String {
        if self.version.is_empty() {
            self.id.chars().take(8).collect()
        } else {
            format!("v{}", self.version)
        }
    }

    pub fn display_message(&self) -> &str {
        self.message
            .as_deref()
            .or(self.description.as_deref())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("Data processing")
    }

    pub fn display_author(&self) -> &str {
        self.author
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or("System")
    }
}

/// Dataset facts recorded with a version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    #[serde(default)]
    pub rows: Option<u64>,
    #[serde(default)]
    pub columns: Option<u64>,
    #[serde(default)]
    pub column_names: Option<Vec<String>>,
    #[serde(default)]
    pub dtypes: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub null_counts: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Any other keys the backend attaches.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Kind of operation that produced a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionKind {
    Create,
    Update,
    Delete,
    Transform,
    Rollback,
    Other,
}

impl VersionKind {
    /// Missing types are treated as updates.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            None | Some("update") => Self::Update,
            Some("create") => Self::Create,
            Some("delete") => Self::Delete,
            Some("transform") => Self::Transform,
            Some("rollback") => Self::Rollback,
            Some(_) => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Transform => "transform",
            Self::Rollback => "rollback",
            Self::Other => "other",
        }
    }
}

/// Body of `POST /projects/{id}/versions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewVersion {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_snapshot: Option<Value>,
}

impl NewVersion {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            data_snapshot: None,
        }
    }
}

/// Formats a byte count with base-1024 units and up to two decimals.
pub fn human_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
