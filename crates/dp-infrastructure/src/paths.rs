//! Unified path management for dp-agent files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/dp-agent/          # Config directory
//! └── config.toml              # Client configuration
//!
//! ~/.local/share/dp-agent/     # Data directory
//! ├── history.txt              # REPL line history
//! └── logs/                    # Application logs
//!     └── dp-agent.log.YYYY-MM-DD
//! ```

use dp_core::error::{DpError, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "dp-agent";

/// Resolves platform directories via `dirs` (XDG on Linux).
pub struct DpPaths;

impl DpPaths {
    /// Returns the configuration directory (e.g. `~/.config/dp-agent/`).
    ///
    /// # Errors
    ///
    /// Returns `DpError::Config` if the platform has no config directory.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| DpError::config("cannot determine config directory"))
    }

    /// Returns the data directory (e.g. `~/.local/share/dp-agent/`).
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| DpError::config("cannot determine data directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }

    pub fn history_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("history.txt"))
    }

    /// Creates `dir` and its parents if missing.
    pub fn ensure_dir(dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        Ok(())
    }
}
