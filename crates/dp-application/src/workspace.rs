//! Workspace coordination.
//!
//! The coordinator owns the open project. Opening a project bumps the epoch
//! and builds a fresh [`WorkspaceContext`] holding one instance of each
//! manager; the previous context is dropped as a whole, and any response
//! still in flight for it fails its scope check and is ignored.
//!
//! The presentation layer reads state through [`WorkspaceCoordinator::snapshot`]
//! and sends intents through the coordinator's methods, which fan out to the
//! managers and sequence the cross-manager effects (profile invalidation
//! after upload, version reload after an agent reply).

use crate::file_repository::FileRepositoryManager;
use crate::profile_cache::{DataProfileCache, ProfileStatus};
use crate::session_manager::{SendOutcome, SessionLifecycleManager};
use crate::version_history::{RollbackPhase, VersionHistoryController};
use dp_core::Gateways;
use dp_core::epoch::{EpochClock, ProjectScope};
use dp_core::error::{DpError, Result};
use dp_core::file::{FileItem, FileUpload};
use dp_core::project::Project;
use dp_core::session::{DEFAULT_SESSION_TITLE, LogEntry, Session};
use dp_core::version::{NewVersion, Version};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Tunables passed to every workspace context.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceSettings {
    /// Rows fetched for a file preview.
    pub preview_limit: usize,
    /// Title used for sessions created without one.
    pub default_session_title: String,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            preview_limit: 10,
            default_session_title: DEFAULT_SESSION_TITLE.to_string(),
        }
    }
}

/// Load state of the open project itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProjectLoad {
    #[default]
    Idle,
    Loading,
    Ready,
    /// The backend reported the project as missing.
    NotFound,
    Failed(String),
}

#[derive(Debug, Default)]
struct ProjectSlot {
    project: Option<Project>,
    load: ProjectLoad,
    /// Latest non-fatal load failure, shown as a banner.
    notice: Option<String>,
}

/// Per-project state: the project record plus one instance of each manager.
///
/// Built by [`WorkspaceCoordinator::open_project`] and torn down on the next
/// switch. Every manager shares the same [`ProjectScope`].
pub struct WorkspaceContext {
    scope: ProjectScope,
    slot: RwLock<ProjectSlot>,
    /// Serializes implicit session creation.
    session_bootstrap: Mutex<()>,
    pub(crate) sessions: SessionLifecycleManager,
    pub(crate) files: FileRepositoryManager,
    pub(crate) profiles: DataProfileCache,
    pub(crate) versions: VersionHistoryController,
}

impl WorkspaceContext {
    fn new(scope: ProjectScope, gateways: &Gateways, settings: &WorkspaceSettings) -> Self {
        Self {
            sessions: SessionLifecycleManager::new(
                scope.clone(),
                Arc::clone(&gateways.sessions),
                settings.default_session_title.clone(),
            ),
            files: FileRepositoryManager::new(scope.clone(), Arc::clone(&gateways.files)),
            profiles: DataProfileCache::new(
                scope.clone(),
                Arc::clone(&gateways.data),
                settings.preview_limit,
            ),
            versions: VersionHistoryController::new(scope.clone(), Arc::clone(&gateways.versions)),
            slot: RwLock::new(ProjectSlot {
                load: ProjectLoad::Loading,
                ..ProjectSlot::default()
            }),
            session_bootstrap: Mutex::new(()),
            scope,
        }
    }

    pub fn scope(&self) -> &ProjectScope {
        &self.scope
    }

    pub fn project_id(&self) -> &str {
        self.scope.project_id()
    }

    async fn record_failure(&self, area: &str, error: &DpError) {
        if !self.scope.is_current() {
            return;
        }
        tracing::warn!("[Workspace] Failed to load {} for {}: {}", area, self.project_id(), error);
        self.slot.write().await.notice =
            Some(format!("Could not load {}: {}", area, error.user_message()));
    }

    async fn record_results(&self, results: [(&str, Result<()>); 3]) {
        for (area, result) in results {
            if let Err(e) = result {
                self.record_failure(area, &e).await;
            }
        }
    }
}

/// Read-only aggregate of the open workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceView {
    pub epoch: u64,
    pub project_id: Option<String>,
    pub project: Option<Project>,
    pub project_load: ProjectLoad,
    pub notice: Option<String>,
    pub sessions: Vec<Session>,
    pub active_session: Option<Session>,
    pub messages: Vec<LogEntry>,
    pub replies_pending: usize,
    pub history_loading: bool,
    pub files: Vec<FileItem>,
    pub selected_file: Option<FileItem>,
    pub upload_in_progress: bool,
    pub upload_error: Option<String>,
    /// Profile of the selected file.
    pub profile: ProfileStatus,
    pub versions: Vec<Version>,
    pub rollback: RollbackPhase,
}

impl WorkspaceView {
    fn closed(epoch: u64) -> Self {
        Self {
            epoch,
            project_id: None,
            project: None,
            project_load: ProjectLoad::Idle,
            notice: None,
            sessions: Vec::new(),
            active_session: None,
            messages: Vec::new(),
            replies_pending: 0,
            history_loading: false,
            files: Vec::new(),
            selected_file: None,
            upload_in_progress: false,
            upload_error: None,
            profile: ProfileStatus::Idle,
            versions: Vec::new(),
            rollback: RollbackPhase::Idle,
        }
    }

    pub fn is_open(&self) -> bool {
        self.project_id.is_some()
    }
}

/// Owns the open project and routes intents to its managers.
pub struct WorkspaceCoordinator {
    gateways: Gateways,
    settings: WorkspaceSettings,
    clock: EpochClock,
    context: RwLock<Option<Arc<WorkspaceContext>>>,
}

impl WorkspaceCoordinator {
    pub fn new(gateways: Gateways, settings: WorkspaceSettings) -> Self {
        Self {
            gateways,
            settings,
            clock: EpochClock::new(),
            context: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    pub fn epoch(&self) -> u64 {
        self.clock.current()
    }

    /// The context of the open project.
    ///
    /// # Errors
    ///
    /// Returns `DpError::Validation` when no project is open.
    pub(crate) async fn current(&self) -> Result<Arc<WorkspaceContext>> {
        self.context
            .read()
            .await
            .clone()
            .ok_or_else(|| DpError::validation("no project is open"))
    }

    /// Switches to `project_id` and loads its project record, sessions,
    /// files and versions concurrently.
    ///
    /// The previous context is replaced before any request is issued, so its
    /// late responses can no longer reach the visible state. Failing loads
    /// leave their area empty and set a notice; a missing project yields
    /// [`ProjectLoad::NotFound`].
    pub async fn open_project(&self, project_id: &str) -> Result<ProjectLoad> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(DpError::validation("project id must not be empty"));
        }

        let context = {
            let mut current = self.context.write().await;
            let scope = self.clock.advance(project_id);
            let context = Arc::new(WorkspaceContext::new(scope, &self.gateways, &self.settings));
            *current = Some(Arc::clone(&context));
            context
        };
        tracing::info!(
            "[Workspace] Opening project {} (epoch {})",
            project_id,
            context.scope.epoch()
        );

        let (project, sessions, files, versions) = tokio::join!(
            self.gateways.projects.get_project(project_id),
            context.sessions.list_sessions(),
            context.files.list_files(),
            context.versions.list_versions(),
        );

        if !context.scope.is_current() {
            tracing::debug!("[Workspace] Project {} was replaced while loading", project_id);
            return Ok(context.slot.read().await.load.clone());
        }

        let load = match project {
            Ok(project) => {
                context.slot.write().await.project = Some(project);
                ProjectLoad::Ready
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("[Workspace] Project {} not found", project_id);
                ProjectLoad::NotFound
            }
            Err(e) => {
                tracing::warn!("[Workspace] Failed to load project {}: {}", project_id, e);
                ProjectLoad::Failed(e.user_message())
            }
        };
        context.slot.write().await.load = load.clone();
        context
            .record_results([("sessions", sessions), ("files", files), ("versions", versions)])
            .await;
        Ok(load)
    }

    /// Drops the open project. In-flight responses for it are ignored.
    pub async fn close_project(&self) {
        let mut current = self.context.write().await;
        if let Some(context) = current.take() {
            tracing::info!("[Workspace] Closed project {}", context.project_id());
        }
        self.clock.invalidate();
    }

    /// Reloads sessions, files and versions of the open project.
    pub async fn refresh(&self) -> Result<()> {
        let context = self.current().await?;
        context.slot.write().await.notice = None;
        let (sessions, files, versions) = tokio::join!(
            context.sessions.list_sessions(),
            context.files.list_files(),
            context.versions.list_versions(),
        );
        context
            .record_results([("sessions", sessions), ("files", files), ("versions", versions)])
            .await;
        Ok(())
    }

    // ============================================================================
    // Session intents
    // ============================================================================

    pub async fn create_session(
        &self,
        title: Option<String>,
        initial_message: Option<String>,
    ) -> Result<Session> {
        let context = self.current().await?;
        context.sessions.create_session(title, initial_message).await
    }

    pub async fn select_session(&self, session_id: &str) -> Result<()> {
        let context = self.current().await?;
        context.sessions.select_session(session_id).await
    }

    /// Refreshes the title and timestamps of one session.
    pub async fn refresh_session(&self, session_id: &str) -> Result<Session> {
        let context = self.current().await?;
        context.sessions.get_session(session_id).await
    }

    /// Sends a chat message, creating a session first if none is active.
    ///
    /// When the agent reports that it created a version, the version log is
    /// reloaded.
    pub async fn send_message(&self, content: &str) -> Result<SendOutcome> {
        if content.trim().is_empty() {
            return Err(DpError::validation("message must not be empty"));
        }
        let context = self.current().await?;

        {
            let _bootstrap = context.session_bootstrap.lock().await;
            if context.sessions.active_session().await.is_none() {
                let session = context.sessions.create_session(None, None).await?;
                tracing::info!("[Workspace] Started session {} for first message", session.id);
            }
        }

        let outcome = context.sessions.send_message(content).await?;
        if let SendOutcome::Replied {
            version_id: Some(version_id),
            ..
        } = &outcome
        {
            tracing::debug!("[Workspace] Reply created version {}", version_id);
            if let Err(e) = context.versions.list_versions().await {
                context.record_failure("versions", &e).await;
            }
        }
        Ok(outcome)
    }

    // ============================================================================
    // File and profile intents
    // ============================================================================

    /// Uploads a file, selects it and loads its profile.
    ///
    /// The cached profile of the uploaded path is invalidated before the new
    /// fetch is issued. The version log is reloaded since the backend records
    /// each upload as a version.
    pub async fn upload_file(&self, upload: FileUpload) -> Result<FileItem> {
        let context = self.current().await?;
        let item = context.files.upload_file(&upload).await?;

        context.profiles.invalidate(&item.path).await;
        let (_, versions) = tokio::join!(
            context.profiles.ensure_profile(&item.path),
            context.versions.list_versions(),
        );
        if let Err(e) = versions {
            context.record_failure("versions", &e).await;
        }
        Ok(item)
    }

    /// Reads a local file and uploads it.
    pub async fn upload_path(&self, path: impl AsRef<Path>) -> Result<FileItem> {
        let upload = FileUpload::from_path(path).await?;
        self.upload_file(upload).await
    }

    /// Selects a file and ensures its profile is loaded.
    pub async fn select_file(&self, path: &str) -> Result<ProfileStatus> {
        let context = self.current().await?;
        context.files.select_file(path).await?;
        Ok(context.profiles.ensure_profile(path).await)
    }

    /// Discards and refetches the selected file's profile.
    pub async fn refresh_profile(&self) -> Result<ProfileStatus> {
        let context = self.current().await?;
        let path = context
            .files
            .selected_path()
            .await
            .ok_or_else(|| DpError::validation("no file selected"))?;
        Ok(context.profiles.refresh(&path).await)
    }

    // ============================================================================
    // Version intents
    // ============================================================================

    pub async fn request_rollback(&self, version_id: &str) -> Result<Version> {
        let context = self.current().await?;
        context.versions.request_rollback(version_id).await
    }

    pub async fn cancel_rollback(&self) -> Result<bool> {
        let context = self.current().await?;
        Ok(context.versions.cancel_rollback().await)
    }

    pub async fn confirm_rollback(&self) -> Result<()> {
        let context = self.current().await?;
        context.versions.confirm_rollback().await
    }

    /// Requests and confirms a rollback in one step.
    pub async fn rollback_version(&self, version_id: &str) -> Result<()> {
        let context = self.current().await?;
        context.versions.rollback(version_id).await
    }

    pub async fn create_version(&self, request: &NewVersion) -> Result<Version> {
        let context = self.current().await?;
        context.versions.create_version(request).await
    }

    pub async fn get_version(&self, version_id: &str) -> Result<Version> {
        let context = self.current().await?;
        context.versions.get_version(version_id).await
    }

    pub async fn compare_versions(&self, left: &str, right: &str) -> Result<Value> {
        let context = self.current().await?;
        context.versions.compare_versions(left, right).await
    }

    pub async fn download_version(&self, version_id: &str) -> Result<Vec<u8>> {
        let context = self.current().await?;
        context.versions.download_version(version_id).await
    }

    // ============================================================================
    // View
    // ============================================================================

    /// Captures the current state of every manager.
    pub async fn snapshot(&self) -> WorkspaceView {
        let Ok(context) = self.current().await else {
            return WorkspaceView::closed(self.epoch());
        };

        let (project, project_load, notice) = {
            let slot = context.slot.read().await;
            (slot.project.clone(), slot.load.clone(), slot.notice.clone())
        };
        let selected_file = context.files.selected_file().await;
        let profile = match context.files.selected_path().await {
            Some(path) => context.profiles.status(&path).await,
            None => ProfileStatus::Idle,
        };

        WorkspaceView {
            epoch: context.scope.epoch(),
            project_id: Some(context.project_id().to_string()),
            project,
            project_load,
            notice,
            sessions: context.sessions.sessions().await,
            active_session: context.sessions.active_session().await,
            messages: context.sessions.log().await,
            replies_pending: context.sessions.replies_pending().await,
            history_loading: context.sessions.is_loading_history().await,
            files: context.files.files().await,
            selected_file,
            upload_in_progress: context.files.upload_in_progress(),
            upload_error: context.files.last_error().await,
            profile,
            versions: context.versions.versions().await,
            rollback: context.versions.phase().await,
        }
    }
}
