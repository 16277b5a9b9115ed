//! Session domain module.
//!
//! This module contains the chat session entity, the conversation message
//! types (including the optimistic log entry used while a reply is pending),
//! and the gateway trait for the session and chat endpoints.
//!
//! # Module Structure
//!
//! - `model`: `Session` and its creation request
//! - `message`: `Message`, `MessageRole`, `ChatReply`, `LogEntry`, `Delivery`
//! - `gateway`: `SessionGateway`

mod gateway;
mod message;
mod model;

pub use gateway::SessionGateway;
pub use message::{ChatReply, Delivery, LogEntry, Message, MessageRole};
pub use model::{DEFAULT_SESSION_TITLE, NewSession, Session};
