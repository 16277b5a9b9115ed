//! Session and chat gateway trait.

use super::message::{ChatReply, Message};
use super::model::{NewSession, Session};
use crate::error::Result;
use async_trait::async_trait;

/// Remote API boundary for sessions, chat and message history.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Lists the sessions of a project.
    async fn list_sessions(&self, project_id: &str) -> Result<Vec<Session>>;

    /// Creates a session (form-encoded request).
    async fn create_session(&self, request: &NewSession) -> Result<Session>;

    /// Fetches a single session.
    async fn get_session(&self, session_id: &str) -> Result<Session>;

    /// Sends a user message and waits for the assistant reply.
    ///
    /// This call is not idempotent and must not be retried automatically.
    async fn send_message(&self, session_id: &str, content: &str) -> Result<ChatReply>;

    /// Loads the full message history of a session, oldest first.
    async fn get_history(&self, session_id: &str) -> Result<Vec<Message>>;
}
