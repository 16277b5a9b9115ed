//! Application layer for DP Agent.
//!
//! This crate holds the workspace orchestration core: one manager per
//! concern (sessions, files, profiles, versions) and the coordinator that
//! builds them per opened project and keeps their state consistent while
//! requests race each other.

pub mod file_repository;
pub mod profile_cache;
pub mod project_directory;
pub mod session_manager;
pub mod version_history;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use file_repository::FileRepositoryManager;
pub use profile_cache::{DataProfileCache, ProfileSnapshot, ProfileStatus};
pub use project_directory::ProjectDirectory;
pub use session_manager::{REPLY_FALLBACK, SendOutcome, SessionLifecycleManager};
pub use version_history::{RollbackPhase, VersionHistoryController};
pub use workspace::{ProjectLoad, WorkspaceCoordinator, WorkspaceSettings, WorkspaceView};
