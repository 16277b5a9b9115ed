//! Error types for the DP Agent workspace client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every layer of the workspace client.
///
/// The first three variants classify failures of the remote API
/// (no response, 4xx, 5xx). `Validation` is produced locally before any
/// request is issued. The remaining variants cover ambient concerns such as
/// configuration loading and local file access.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DpError {
    /// The backend could not be reached or did not answer in time.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The backend rejected the request (4xx).
    #[error("Client error ({status}): {message}")]
    Client { status: u16, message: String },

    /// The backend failed while handling the request (5xx).
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Input rejected locally; no request was issued.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (local file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DpError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a Client error
    pub fn client(status: u16, message: impl Into<String>) -> Self {
        Self::Client {
            status,
            message: message.into(),
        }
    }

    /// Creates a Server error
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classifies a non-success HTTP status.
    ///
    /// 4xx maps to `Client`, 5xx to `Server`. Anything else that reaches this
    /// function is unexpected for the API and is reported as `Internal`.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            400..=499 => Self::client(status, message),
            500..=599 => Self::server(status, message),
            _ => Self::internal(format!("unexpected HTTP status {}: {}", status, message.into())),
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Network error
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Check if this is a Client error
    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client { .. })
    }

    /// Check if this is a Server error
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the backend reported the entity as missing (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Client { status: 404, .. })
    }

    /// Short, user-facing description without the variant prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { message }
            | Self::Client { message, .. }
            | Self::Server { message, .. }
            | Self::Io { message }
            | Self::Serialization { message, .. } => message.clone(),
            Self::Validation(message) | Self::Config(message) | Self::Internal(message) => {
                message.clone()
            }
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for DpError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for DpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DpError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, DpError>`.
pub type Result<T> = std::result::Result<T, DpError>;
