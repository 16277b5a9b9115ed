//! Version history and rollback.
//!
//! The log is append-only and ordered most recent first; `versions[0]` is the
//! effective version. Rollback asks the backend to append a new head and then
//! reloads the log. Nothing is synthesised or edited locally.

use dp_core::epoch::{ProjectScope, RequestSequence};
use dp_core::error::{DpError, Result};
use dp_core::version::{NewVersion, Version, VersionGateway};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Rollback progress as seen by the UI.
///
/// `Idle -> Confirming -> Submitting -> Idle | Failed`. Only an explicit
/// request enters `Confirming`, and `Submitting` is only reachable from it.
#[derive(Debug, Clone, PartialEq)]
pub enum RollbackPhase {
    Idle,
    Confirming { target: Version },
    Submitting { target: Version },
    Failed { target: Version, error: DpError },
}

impl RollbackPhase {
    pub fn target(&self) -> Option<&Version> {
        match self {
            Self::Idle => None,
            Self::Confirming { target }
            | Self::Submitting { target }
            | Self::Failed { target, .. } => Some(target),
        }
    }
}

#[derive(Debug)]
struct VersionState {
    versions: Vec<Version>,
    phase: RollbackPhase,
}

impl VersionState {
    /// Head equality is decided by id.
    fn ensure_not_head(&self, target: &Version) -> Result<()> {
        match self.versions.first() {
            Some(head) if head.id == target.id => Err(DpError::validation(format!(
                "{} is already the current version",
                target.label()
            ))),
            _ => Ok(()),
        }
    }
}

pub struct VersionHistoryController {
    scope: ProjectScope,
    gateway: Arc<dyn VersionGateway>,
    state: RwLock<VersionState>,
    list_sequence: RequestSequence,
}

impl VersionHistoryController {
    pub fn new(scope: ProjectScope, gateway: Arc<dyn VersionGateway>) -> Self {
        Self {
            scope,
            gateway,
            state: RwLock::new(VersionState {
                versions: Vec::new(),
                phase: RollbackPhase::Idle,
            }),
            list_sequence: RequestSequence::new(),
        }
    }

    fn project_id(&self) -> &str {
        self.scope.project_id()
    }

    /// Replaces the log with the server's, most recent first.
    pub async fn list_versions(&self) -> Result<()> {
        let ticket = self.list_sequence.issue();
        let result = self.gateway.list_versions(self.project_id()).await;

        if !self.scope.is_current() || !self.list_sequence.is_latest(ticket) {
            tracing::debug!("[VersionHistory] Dropping stale version list");
            return Ok(());
        }
        let mut versions = result.inspect_err(|e| {
            tracing::warn!("[VersionHistory] Failed to list versions: {}", e);
        })?;
        // Stable: ties keep the server's order.
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.state.write().await.versions = versions;
        Ok(())
    }

    /// Enters `Confirming` for `version_id`.
    ///
    /// # Errors
    ///
    /// `DpError::Validation` if the version is unknown, is the current head,
    /// or another rollback is awaiting confirmation or being submitted.
    pub async fn request_rollback(&self, version_id: &str) -> Result<Version> {
        let mut state = self.state.write().await;
        if matches!(
            state.phase,
            RollbackPhase::Confirming { .. } | RollbackPhase::Submitting { .. }
        ) {
            return Err(DpError::validation("another rollback is already in progress"));
        }
        let target = state
            .versions
            .iter()
            .find(|v| v.id == version_id)
            .cloned()
            .ok_or_else(|| DpError::validation(format!("unknown version: {}", version_id)))?;
        state.ensure_not_head(&target)?;

        state.phase = RollbackPhase::Confirming {
            target: target.clone(),
        };
        Ok(target)
    }

    /// Leaves `Confirming` or `Failed`. A submission cannot be cancelled.
    pub async fn cancel_rollback(&self) -> bool {
        let mut state = self.state.write().await;
        match state.phase {
            RollbackPhase::Confirming { .. } | RollbackPhase::Failed { .. } => {
                state.phase = RollbackPhase::Idle;
                true
            }
            _ => false,
        }
    }

    /// Submits the rollback awaiting confirmation.
    ///
    /// On success the log is reloaded so the server-created head appears and
    /// the phase returns to `Idle`. On failure the log is untouched and the
    /// phase becomes `Failed`.
    pub async fn confirm_rollback(&self) -> Result<()> {
        let target = {
            let mut state = self.state.write().await;
            let RollbackPhase::Confirming { target } = &state.phase else {
                return Err(DpError::validation("no rollback is awaiting confirmation"));
            };
            let target = target.clone();
            // The head may have moved since the request.
            if let Err(e) = state.ensure_not_head(&target) {
                state.phase = RollbackPhase::Idle;
                return Err(e);
            }
            state.phase = RollbackPhase::Submitting {
                target: target.clone(),
            };
            target
        };

        tracing::info!("[VersionHistory] Rolling back {} to {}", self.project_id(), target.label());
        let result = self.gateway.rollback_version(self.project_id(), &target.id).await;

        if !self.scope.is_current() {
            return result;
        }
        match result {
            Ok(()) => {
                if let Err(e) = self.list_versions().await {
                    tracing::warn!("[VersionHistory] Rollback applied but reload failed: {}", e);
                }
                self.state.write().await.phase = RollbackPhase::Idle;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[VersionHistory] Rollback to {} failed: {}", target.label(), e);
                self.state.write().await.phase = RollbackPhase::Failed {
                    target,
                    error: e.clone(),
                };
                Err(e)
            }
        }
    }

    /// Request and confirm in one step.
    pub async fn rollback(&self, version_id: &str) -> Result<()> {
        self.request_rollback(version_id).await?;
        self.confirm_rollback().await
    }

    /// Records a new version and reloads the log.
    pub async fn create_version(&self, request: &NewVersion) -> Result<Version> {
        if request.message.trim().is_empty() {
            return Err(DpError::validation("version message must not be empty"));
        }
        let created = self.gateway.create_version(self.project_id(), request).await?;
        if let Err(e) = self.list_versions().await {
            tracing::warn!("[VersionHistory] Version created but reload failed: {}", e);
        }
        Ok(created)
    }

    pub async fn get_version(&self, version_id: &str) -> Result<Version> {
        self.gateway.get_version(self.project_id(), version_id).await
    }

    pub async fn compare_versions(&self, left: &str, right: &str) -> Result<Value> {
        if left == right {
            return Err(DpError::validation("cannot compare a version with itself"));
        }
        self.gateway
            .compare_versions(self.project_id(), left, right)
            .await
    }

    pub async fn download_version(&self, version_id: &str) -> Result<Vec<u8>> {
        self.gateway.download_version(self.project_id(), version_id).await
    }

    pub async fn versions(&self) -> Vec<Version> {
        self.state.read().await.versions.clone()
    }

    pub async fn head(&self) -> Option<Version> {
        self.state.read().await.versions.first().cloned()
    }

    pub async fn phase(&self) -> RollbackPhase {
        self.state.read().await.phase.clone()
    }
}
