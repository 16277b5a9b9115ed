//! Client configuration.
//!
//! Values are resolved in three layers: built-in defaults, then
//! `~/.config/dp-agent/config.toml` when present, then environment
//! variables (`DP_AGENT_API_URL`, `DP_AGENT_TIMEOUT_SECS`,
//! `DP_AGENT_PREVIEW_LIMIT`).

use crate::paths::DpPaths;
use dp_core::error::{DpError, Result};
use dp_core::session::DEFAULT_SESSION_TITLE;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_API_URL: &str = "DP_AGENT_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "DP_AGENT_TIMEOUT_SECS";
pub const ENV_PREVIEW_LIMIT: &str = "DP_AGENT_PREVIEW_LIMIT";

/// Settings for the HTTP gateway and the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL including the API prefix.
    pub api_base_url: String,
    /// Per-request timeout. Expiry surfaces as a network error.
    pub request_timeout_secs: u64,
    /// Rows requested for a file preview.
    pub preview_limit: usize,
    /// Title sent when a session is created without one.
    pub default_session_title: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            request_timeout_secs: 120,
            preview_limit: 10,
            default_session_title: DEFAULT_SESSION_TITLE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads the configuration from the default location and the process
    /// environment.
    ///
    /// A missing config file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if an override holds an invalid value.
    pub fn load() -> Result<Self> {
        let file = DpPaths::config_file().ok();
        Self::load_with(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Loads from an explicit file and environment lookup.
    pub fn load_with<F>(file: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                let parsed: ClientConfig = toml::from_str(&content)?;
                tracing::debug!("[Config] Loaded {}", path.display());
                parsed
            }
            _ => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = env(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = raw.trim().parse().map_err(|_| {
                DpError::config(format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT_SECS, raw))
            })?;
        }
        if let Some(raw) = env(ENV_PREVIEW_LIMIT) {
            self.preview_limit = raw.trim().parse().map_err(|_| {
                DpError::config(format!("{} must be a row count, got '{}'", ENV_PREVIEW_LIMIT, raw))
            })?;
        }
        Ok(())
    }

    /// Rejects values the gateway cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(DpError::config(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(DpError::config("request_timeout_secs must be positive"));
        }
        if self.preview_limit == 0 {
            return Err(DpError::config("preview_limit must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = ClientConfig::load_with(None, env_of(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.preview_limit, 10);
    }

    #[test]
    fn test_file_then_env_layering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_base_url = \"http://data.internal:9000/api/v1\"\npreview_limit = 25\n",
        )
        .unwrap();

        let config = ClientConfig::load_with(Some(&path), env_of(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://data.internal:9000/api/v1");
        assert_eq!(config.preview_limit, 25);
        assert_eq!(config.request_timeout_secs, 120);

        let config = ClientConfig::load_with(
            Some(&path),
            env_of(&[(ENV_PREVIEW_LIMIT, "5"), (ENV_TIMEOUT_SECS, "30")]),
        )
        .unwrap();
        assert_eq!(config.preview_limit, 5);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ClientConfig::load_with(None, env_of(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(matches!(err, DpError::Config(_)));

        let err = ClientConfig::load_with(None, env_of(&[(ENV_API_URL, "localhost:8000")])).unwrap_err();
        assert!(matches!(err, DpError::Config(_)));
    }

    #[test]
    fn test_malformed_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "preview_limit = \"many\"").unwrap();

        let err = ClientConfig::load_with(Some(&path), env_of(&[])).unwrap_err();
        assert!(matches!(err, DpError::Serialization { .. }));
    }
}
