//! Wire shapes that differ from the domain models.

use chrono::Utc;
use dp_core::file::FileItem;
use dp_core::serde_compat::timestamp_opt;
use dp_core::session::ChatReply;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /chat` request body.
#[derive(Debug, Serialize)]
pub struct ChatRequestDto<'a> {
    pub session_id: &'a str,
    pub message: &'a str,
}

/// `POST /chat` response.
///
/// `status` is `"error"` when the agent could not complete the task; the
/// message then explains why and is still shown as the assistant reply.
#[derive(Debug, Deserialize)]
pub struct ChatResponseDto {
    #[serde(default)]
    pub status: Option<String>,
    pub message: String,
    #[serde(default)]
    pub message_id: Option<Value>,
    #[serde(default)]
    pub user_message_id: Option<Value>,
    #[serde(default, with = "timestamp_opt")]
    pub created_at: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    pub version_id: Option<String>,
}

fn id_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl From<ChatResponseDto> for ChatReply {
    fn from(dto: ChatResponseDto) -> Self {
        if dto.status.as_deref() == Some("error") {
            tracing::warn!("[HttpGateway] Agent reported an error: {}", dto.message);
        }
        ChatReply {
            content: dto.message,
            message_id: dto.message_id.and_then(id_to_string),
            user_message_id: dto.user_message_id.and_then(id_to_string),
            created_at: dto.created_at,
            version_id: dto.version_id,
        }
    }
}

/// `POST /projects/{id}/upload` response.
#[derive(Debug, Deserialize)]
pub struct UploadResponseDto {
    #[serde(alias = "id")]
    pub file_id: String,
    #[serde(alias = "name")]
    pub filename: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, with = "timestamp_opt")]
    pub uploaded_at: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    pub version_id: Option<String>,
}

impl UploadResponseDto {
    /// Builds the stored item. The backend saves uploads as
    /// `uploads/{file_id}_{filename}` when it does not report a path.
    pub fn into_file_item(self, uploaded_size: u64) -> FileItem {
        let path = self
            .path
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| format!("uploads/{}_{}", self.file_id, self.filename));
        let file_type = std::path::Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        FileItem {
            id: self.file_id,
            name: self.filename,
            path,
            size: self.size.or(Some(uploaded_size)),
            uploaded_at: self.uploaded_at.or_else(|| Some(Utc::now())),
            file_type,
        }
    }
}

/// `POST /data/profile` request body.
#[derive(Debug, Serialize)]
pub struct ProfileRequestDto<'a> {
    pub file_path: &'a str,
}

/// `POST /data/preview` request body.
#[derive(Debug, Serialize)]
pub struct PreviewRequestDto<'a> {
    pub file_path: &'a str,
    pub limit: usize,
}

/// Error body produced by the backend framework: `{"detail": ...}`.
#[derive(Debug, Deserialize)]
pub struct ErrorBodyDto {
    pub detail: Value,
}

impl ErrorBodyDto {
    /// Flattens `detail` into one line. Validation failures carry a list of
    /// `{loc, msg}` objects.
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| item.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
