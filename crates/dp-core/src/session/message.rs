//! Conversation message types.

use crate::serde_compat::{string_or_number, timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    /// Backend-generated notices stored in the history (rare).
    System,
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Client-generated until the server assigns an authoritative id.
    /// The history endpoint reports integer ids.
    #[serde(with = "string_or_number")]
    pub id: String,
    /// Missing from history payloads; filled in by the gateway.
    #[serde(default)]
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

/// The assistant reply returned by `POST /chat`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub content: String,
    /// Server id of the assistant message, when reported.
    pub message_id: Option<String>,
    /// Server id assigned to the user message, when reported.
    pub user_message_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Version created by the agent while handling the message.
    pub version_id: Option<String>,
}

impl ChatReply {
    /// A reply carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            message_id: None,
            user_message_id: None,
            created_at: None,
            version_id: None,
        }
    }
}

/// Delivery state of a log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Appended locally, awaiting the server.
    Pending,
    /// Acknowledged by the server, or loaded from history.
    Confirmed,
    /// The request carrying this entry failed.
    Failed(String),
}

/// A message in the active session's log, tagged with its delivery state.
///
/// Reconciliation matches on `correlation_id`, never on position.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub correlation_id: String,
    pub message: Message,
    pub delivery: Delivery,
}

impl LogEntry {
    /// An optimistic entry with a fresh client-side id.
    pub fn pending(
        session_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        Self {
            message: Message {
                id: format!("local-{}", correlation_id),
                session_id: session_id.into(),
                role,
                content: content.into(),
                created_at,
            },
            correlation_id,
            delivery: Delivery::Pending,
        }
    }

    /// A message that the server already knows about.
    pub fn confirmed(message: Message) -> Self {
        Self {
            correlation_id: message.id.clone(),
            message,
            delivery: Delivery::Confirmed,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.delivery == Delivery::Pending
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.delivery, Delivery::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entry_with_integer_id() {
        let message: Message = serde_json::from_str(
            r#"{"id": 42, "role": "assistant", "content": "done", "metadata": null, "created_at": "2024-02-02T12:00:00"}"#,
        )
        .unwrap();
        assert_eq!(message.id, "42");
        assert!(message.is_assistant());
        assert!(message.session_id.is_empty());
    }

    #[test]
    fn test_pending_entries_get_distinct_ids() {
        let now = Utc::now();
        let a = LogEntry::pending("s1", MessageRole::User, "hi", now);
        let b = LogEntry::pending("s1", MessageRole::User, "hi", now);
        assert_ne!(a.correlation_id, b.correlation_id);
        assert_ne!(a.message.id, b.message.id);
        assert!(a.is_pending());
        assert!(!a.is_failed());
    }
}
