//! Session lifecycle management.
//!
//! Tracks the sessions of one project, which of them is active, and the
//! message log of the active session. Sending is optimistic: the user entry
//! is appended before the request is issued and reconciled afterwards by
//! correlation id.

use chrono::{DateTime, Utc};
use dp_core::epoch::{ProjectScope, RequestSequence};
use dp_core::error::{DpError, Result};
use dp_core::session::{
    Delivery, LogEntry, Message, MessageRole, NewSession, Session, SessionGateway,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Assistant text shown when a reply could not be obtained.
pub const REPLY_FALLBACK: &str =
    "Sorry, something went wrong while processing your request. Please try again later.";

/// Result of [`SessionLifecycleManager::send_message`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The assistant reply was appended to the log.
    Replied {
        message: Message,
        /// Version created by the agent while handling the message.
        version_id: Option<String>,
    },
    /// The request failed; the fallback reply was appended.
    Degraded(DpError),
    /// The reply arrived after the session or project stopped being active
    /// and was dropped.
    Discarded,
}

#[derive(Debug, Default)]
struct SessionState {
    /// Most recent first.
    sessions: Vec<Session>,
    active: Option<Session>,
    /// Log of the active session only.
    log: Vec<LogEntry>,
    history_loading: bool,
}

impl SessionState {
    /// Timestamp for a new entry, never earlier than the log's tail.
    fn next_timestamp(&self, candidate: DateTime<Utc>) -> DateTime<Utc> {
        match self.log.last() {
            Some(last) if last.message.created_at > candidate => last.message.created_at,
            _ => candidate,
        }
    }

    fn is_active(&self, session_id: &str) -> bool {
        self.active.as_ref().is_some_and(|s| s.id == session_id)
    }

    /// Replaces a known session and keeps the list ordered by recency.
    fn upsert_session(&mut self, session: Session) {
        self.sessions.retain(|s| s.id != session.id);
        let position = self
            .sessions
            .iter()
            .position(|s| s.updated_at <= session.updated_at)
            .unwrap_or(self.sessions.len());
        if self.is_active(&session.id) {
            self.active = Some(session.clone());
        }
        self.sessions.insert(position, session);
    }
}

/// Manages the sessions of one project and the active session's messages.
///
/// Instances are created per opened project by the workspace coordinator and
/// dropped on project switch.
pub struct SessionLifecycleManager {
    scope: ProjectScope,
    gateway: Arc<dyn SessionGateway>,
    default_title: String,
    state: RwLock<SessionState>,
    /// Orders `list_sessions` calls.
    list_sequence: RequestSequence,
    /// Orders session selections; a history load is applied only if its
    /// ticket is still the latest.
    selection_sequence: RequestSequence,
}

impl SessionLifecycleManager {
    /// Creates an empty manager for the project of `scope`.
    ///
    /// # Arguments
    ///
    /// * `scope` - Project and epoch this manager belongs to
    /// * `gateway` - Session and chat endpoints
    /// * `default_title` - Title used when a session is created without one
    pub fn new(
        scope: ProjectScope,
        gateway: Arc<dyn SessionGateway>,
        default_title: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            gateway,
            default_title: default_title.into(),
            state: RwLock::new(SessionState::default()),
            list_sequence: RequestSequence::new(),
            selection_sequence: RequestSequence::new(),
        }
    }

    pub fn project_id(&self) -> &str {
        self.scope.project_id()
    }

    /// Reloads the session list.
    ///
    /// On failure the previous list is kept and the error is returned.
    /// Responses superseded by a newer call, or arriving after a project
    /// switch, are ignored.
    pub async fn list_sessions(&self) -> Result<()> {
        let ticket = self.list_sequence.issue();
        let result = self.gateway.list_sessions(self.project_id()).await;

        if !self.scope.is_current() || !self.list_sequence.is_latest(ticket) {
            tracing::debug!("[SessionManager] Dropping stale session list for {}", self.project_id());
            return Ok(());
        }

        let mut sessions = match result {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!("[SessionManager] Failed to list sessions: {}", e);
                return Err(e);
            }
        };
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let mut state = self.state.write().await;
        state.sessions = sessions;
        if let Some(active) = state.active.clone() {
            match state.sessions.iter().find(|s| s.id == active.id).cloned() {
                Some(fresh) => state.active = Some(fresh),
                // Created after the list was computed server-side.
                None => state.sessions.insert(0, active),
            }
        }
        tracing::debug!("[SessionManager] Loaded {} sessions", state.sessions.len());
        Ok(())
    }

    /// Creates a session, puts it at the head of the list and activates it.
    ///
    /// The message log is cleared. Exactly one session is active afterwards.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; state is unchanged in that case.
    pub async fn create_session(
        &self,
        title: Option<String>,
        initial_message: Option<String>,
    ) -> Result<Session> {
        let title = title.or_else(|| Some(self.default_title.clone()));
        let request = NewSession::new(self.project_id(), title, initial_message);
        let session = self.gateway.create_session(&request).await?;

        if !self.scope.is_current() {
            tracing::debug!("[SessionManager] Project closed before session {} was created", session.id);
            return Ok(session);
        }

        let mut state = self.state.write().await;
        // Any history load in flight belongs to the previous session.
        self.selection_sequence.invalidate();
        state.sessions.retain(|s| s.id != session.id);
        state.sessions.insert(0, session.clone());
        state.active = Some(session.clone());
        state.log.clear();
        state.history_loading = false;
        tracing::info!("[SessionManager] Created session {}", session.id);
        Ok(session)
    }

    /// Activates a known session and loads its history.
    ///
    /// Last selection wins: if another session is selected while this load
    /// is in flight, the response is dropped. Selecting the active session
    /// again reloads its history, unless replies are still pending, in which
    /// case the log is kept as is.
    ///
    /// # Errors
    ///
    /// Returns `DpError::Validation` for an unknown session id, or the
    /// gateway error if the history could not be loaded (the session stays
    /// active with an empty log).
    pub async fn select_session(&self, session_id: &str) -> Result<()> {
        let ticket = {
            let mut state = self.state.write().await;
            let session = state
                .sessions
                .iter()
                .find(|s| s.id == session_id)
                .cloned()
                .ok_or_else(|| DpError::validation(format!("unknown session: {}", session_id)))?;
            // Reloading now would drop the entries the pending replies reconcile against.
            if state.is_active(session_id) && state.log.iter().any(LogEntry::is_pending) {
                tracing::debug!("[SessionManager] Keeping log of {} while replies are pending", session_id);
                return Ok(());
            }
            let ticket = self.selection_sequence.issue();
            state.active = Some(session);
            state.log.clear();
            state.history_loading = true;
            ticket
        };

        let result = self.gateway.get_history(session_id).await;

        let mut state = self.state.write().await;
        if !self.scope.is_current()
            || !self.selection_sequence.is_latest(ticket)
            || !state.is_active(session_id)
        {
            tracing::debug!("[SessionManager] Dropping stale history for session {}", session_id);
            return Ok(());
        }
        state.history_loading = false;

        let mut history = match result {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("[SessionManager] Failed to load history of {}: {}", session_id, e);
                return Err(e);
            }
        };
        history.retain(|m| m.session_id.is_empty() || m.session_id == session_id);
        history.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        // Sends are rejected while loading, so the log is still empty here.
        state.log = history.into_iter().map(LogEntry::confirmed).collect();
        tracing::debug!("[SessionManager] Loaded {} messages for {}", state.log.len(), session_id);
        Ok(())
    }

    /// Sends a message in the active session.
    ///
    /// The user entry is appended immediately as `Pending`. On success it is
    /// confirmed and the assistant reply is appended; on failure it is marked
    /// `Failed` and [`REPLY_FALLBACK`] is appended instead. The user's text
    /// is never removed.
    ///
    /// # Errors
    ///
    /// Returns `DpError::Validation` before any request if the trimmed
    /// content is empty, no session is active, or the active session's
    /// history is still loading. Transport failures are
    /// reported through [`SendOutcome::Degraded`].
    pub async fn send_message(&self, content: &str) -> Result<SendOutcome> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DpError::validation("message must not be empty"));
        }

        let (session_id, correlation_id) = {
            let mut state = self.state.write().await;
            let session_id = state
                .active
                .as_ref()
                .map(|s| s.id.clone())
                .ok_or_else(|| DpError::validation("no active session"))?;
            if state.history_loading {
                return Err(DpError::validation("history is still loading"));
            }
            let created_at = state.next_timestamp(Utc::now());
            let entry = LogEntry::pending(&session_id, MessageRole::User, content, created_at);
            let correlation_id = entry.correlation_id.clone();
            state.log.push(entry);
            (session_id, correlation_id)
        };

        let result = self.gateway.send_message(&session_id, content).await;

        let mut state = self.state.write().await;
        if !self.scope.is_current() || !state.is_active(&session_id) {
            tracing::debug!("[SessionManager] Dropping reply for inactive session {}", session_id);
            return Ok(SendOutcome::Discarded);
        }
        let Some(index) = state
            .log
            .iter()
            .position(|entry| entry.correlation_id == correlation_id)
        else {
            tracing::debug!("[SessionManager] Entry {} no longer in log", correlation_id);
            return Ok(SendOutcome::Discarded);
        };

        match result {
            Ok(reply) => {
                let entry = &mut state.log[index];
                entry.delivery = Delivery::Confirmed;
                if let Some(id) = reply.user_message_id {
                    entry.message.id = id;
                }

                let created_at = state.next_timestamp(reply.created_at.unwrap_or_else(Utc::now));
                let mut assistant =
                    LogEntry::pending(&session_id, MessageRole::Assistant, reply.content, created_at);
                if let Some(id) = reply.message_id {
                    assistant.message.id = id;
                }
                assistant.delivery = Delivery::Confirmed;
                let message = assistant.message.clone();
                state.log.push(assistant);

                if let Some(mut session) = state.active.clone() {
                    session.updated_at = created_at;
                    state.upsert_session(session);
                }
                Ok(SendOutcome::Replied {
                    message,
                    version_id: reply.version_id,
                })
            }
            Err(e) => {
                tracing::warn!("[SessionManager] Send failed in {}: {}", session_id, e);
                state.log[index].delivery = Delivery::Failed(e.user_message());

                let created_at = state.next_timestamp(Utc::now());
                let mut fallback =
                    LogEntry::pending(&session_id, MessageRole::Assistant, REPLY_FALLBACK, created_at);
                fallback.delivery = Delivery::Confirmed;
                state.log.push(fallback);
                Ok(SendOutcome::Degraded(e))
            }
        }
    }

    /// Fetches a session and refreshes its title and `updated_at` locally.
    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        let session = self.gateway.get_session(session_id).await?;
        if self.scope.is_current() && session.project_id == self.project_id() {
            let mut state = self.state.write().await;
            if state.sessions.iter().any(|s| s.id == session.id) {
                state.upsert_session(session.clone());
            }
        }
        Ok(session)
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.state.read().await.sessions.clone()
    }

    pub async fn active_session(&self) -> Option<Session> {
        self.state.read().await.active.clone()
    }

    /// The active session's log with delivery states.
    pub async fn log(&self) -> Vec<LogEntry> {
        self.state.read().await.log.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state
            .read()
            .await
            .log
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }

    /// Number of user messages still waiting for a reply.
    pub async fn replies_pending(&self) -> usize {
        self.state
            .read()
            .await
            .log
            .iter()
            .filter(|entry| entry.is_pending())
            .count()
    }

    pub async fn is_loading_history(&self) -> bool {
        self.state.read().await.history_loading
    }
}
