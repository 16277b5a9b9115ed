//! In-memory backend used by the unit tests of this crate.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use dp_core::error::{DpError, Result};
use dp_core::file::{FileGateway, FileItem, FileUpload};
use dp_core::profile::{DataGateway, DataProfile, DataShape, PreviewRow, QualityReport};
use dp_core::project::{NewProject, Project, ProjectGateway};
use dp_core::session::{
    ChatReply, Message, MessageRole, NewSession, Session, SessionGateway,
};
use dp_core::version::{NewVersion, Version, VersionGateway};
use dp_core::Gateways;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub fn ts(minute: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
}

pub fn session(id: &str, project_id: &str, minute: i64) -> Session {
    Session {
        id: id.to_string(),
        project_id: project_id.to_string(),
        title: Some(format!("Session {}", id)),
        created_at: ts(minute),
        updated_at: ts(minute),
    }
}

pub fn version(id: &str, project_id: &str, minute: i64) -> Version {
    Version {
        id: id.to_string(),
        project_id: project_id.to_string(),
        version: id.trim_start_matches('v').to_string(),
        message: Some(format!("snapshot {}", id)),
        description: None,
        author: None,
        operation: None,
        code: None,
        data_snapshot_path: None,
        metadata: None,
        created_at: ts(minute),
        updated_at: None,
    }
}

pub fn file(name: &str) -> FileItem {
    FileItem {
        id: format!("id-{}", name),
        name: name.to_string(),
        path: format!("uploads/{}", name),
        size: Some(10),
        uploaded_at: None,
        file_type: None,
    }
}

/// Gate that holds a request until released.
struct Gate(Semaphore);

#[derive(Default)]
pub struct FakeBackend {
    pub projects: Mutex<Vec<Project>>,
    pub sessions: Mutex<Vec<Session>>,
    pub history: Mutex<HashMap<String, Vec<Message>>>,
    pub files: Mutex<Vec<FileItem>>,
    /// Most recent first.
    pub versions: Mutex<Vec<Version>>,
    calls: Mutex<HashMap<String, usize>>,
    failures: Mutex<HashMap<String, DpError>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gateways(self: &Arc<Self>) -> Gateways {
        Gateways::from_shared(self.clone())
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// Makes the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: &str, error: DpError) {
        self.failures.lock().unwrap().insert(op.to_string(), error);
    }

    /// Holds every request for `key` until [`release`](Self::release).
    pub fn hold(&self, key: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::new(Gate(Semaphore::new(0))));
    }

    pub fn release(&self, key: &str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(key) {
            gate.0.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    /// Yields until `op` has been called at least `count` times.
    pub async fn wait_for_calls(&self, op: &str, count: usize) {
        for _ in 0..1000 {
            if self.calls(op) >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("{} was called {} times, expected {}", op, self.calls(op), count);
    }

    async fn enter(&self, op: &str, key: &str) -> Result<()> {
        *self.calls.lock().unwrap().entry(op.to_string()).or_default() += 1;
        let gate = self.gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            let _permit = gate.0.acquire().await;
        }
        match self.failures.lock().unwrap().remove(op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProjectGateway for FakeBackend {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.enter("list_projects", "projects").await?;
        Ok(self.projects.lock().unwrap().clone())
    }

    async fn create_project(&self, request: &NewProject) -> Result<Project> {
        self.enter("create_project", "projects").await?;
        let mut projects = self.projects.lock().unwrap();
        let project = Project {
            id: format!("p{}", projects.len() + 1),
            name: request.name.clone(),
            description: request.description.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        projects.push(project.clone());
        Ok(project)
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.enter("get_project", &format!("project:{}", project_id))
            .await?;
        self.projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
            .ok_or_else(|| DpError::client(404, "project does not exist"))
    }
}

#[async_trait]
impl SessionGateway for FakeBackend {
    async fn list_sessions(&self, project_id: &str) -> Result<Vec<Session>> {
        self.enter("list_sessions", &format!("sessions:{}", project_id))
            .await?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_session(&self, request: &NewSession) -> Result<Session> {
        self.enter("create_session", "create_session").await?;
        let mut sessions = self.sessions.lock().unwrap();
        let created = Session {
            id: format!("s-new-{}", sessions.len() + 1),
            project_id: request.project_id.clone(),
            title: Some(request.title.clone()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        sessions.push(created.clone());
        Ok(created)
    }

    async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.enter("get_session", "get_session").await?;
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| DpError::client(404, "session does not exist"))
    }

    async fn send_message(&self, session_id: &str, content: &str) -> Result<ChatReply> {
        self.enter("send_message", &format!("chat:{}", session_id))
            .await?;
        Ok(ChatReply::text(format!("echo: {}", content)))
    }

    async fn get_history(&self, session_id: &str) -> Result<Vec<Message>> {
        self.enter("get_history", &format!("history:{}", session_id))
            .await?;
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl FileGateway for FakeBackend {
    async fn list_files(&self, _project_id: &str) -> Result<Vec<FileItem>> {
        self.enter("list_files", "files").await?;
        Ok(self.files.lock().unwrap().clone())
    }

    async fn upload_file(&self, _project_id: &str, upload: &FileUpload) -> Result<FileItem> {
        self.enter("upload_file", "upload").await?;
        let item = file(&upload.file_name);
        let mut files = self.files.lock().unwrap();
        files.retain(|f| f.id != item.id);
        files.push(item.clone());
        Ok(item)
    }
}

#[async_trait]
impl DataGateway for FakeBackend {
    async fn profile(&self, file_path: &str) -> Result<DataProfile> {
        self.enter("profile", &format!("profile:{}", file_path))
            .await?;
        // The row count tells tests which fetch produced the profile.
        Ok(DataProfile {
            shape: DataShape {
                rows: self.calls("profile") as u64,
                columns: 1,
            },
            memory_usage: "1 KB".to_string(),
            columns: BTreeMap::new(),
            quality: QualityReport {
                score: 90.0,
                issues: vec![],
            },
        })
    }

    async fn preview(&self, file_path: &str, limit: usize) -> Result<Vec<PreviewRow>> {
        self.enter("preview", &format!("preview:{}", file_path))
            .await?;
        let mut row = PreviewRow::new();
        row.insert("limit".to_string(), json!(limit));
        Ok(vec![row])
    }
}

#[async_trait]
impl VersionGateway for FakeBackend {
    async fn list_versions(&self, _project_id: &str) -> Result<Vec<Version>> {
        self.enter("list_versions", "versions").await?;
        Ok(self.versions.lock().unwrap().clone())
    }

    async fn create_version(&self, project_id: &str, request: &NewVersion) -> Result<Version> {
        self.enter("create_version", "create_version").await?;
        let mut versions = self.versions.lock().unwrap();
        let next = versions.len() + 1;
        let mut created = version(&format!("v{}", next), project_id, next as i64 * 10);
        created.message = Some(request.message.clone());
        versions.insert(0, created.clone());
        Ok(created)
    }

    async fn rollback_version(&self, project_id: &str, version_id: &str) -> Result<()> {
        self.enter("rollback_version", "rollback").await?;
        let mut versions = self.versions.lock().unwrap();
        let target = versions
            .iter()
            .find(|v| v.id == version_id)
            .cloned()
            .ok_or_else(|| DpError::client(404, "version does not exist"))?;
        let next = versions.len() + 1;
        let mut created = version(&format!("v{}", next), project_id, next as i64 * 10);
        created.message = Some(format!("Rollback to {}", target.label()));
        created.operation = Some("rollback".to_string());
        created.metadata = target.metadata.clone();
        versions.insert(0, created);
        Ok(())
    }

    async fn get_version(&self, _project_id: &str, version_id: &str) -> Result<Version> {
        self.enter("get_version", "get_version").await?;
        self.versions
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == version_id)
            .cloned()
            .ok_or_else(|| DpError::client(404, "version does not exist"))
    }

    async fn compare_versions(&self, _project_id: &str, left: &str, right: &str) -> Result<Value> {
        self.enter("compare_versions", "compare").await?;
        Ok(json!({"left": left, "right": right, "rows_changed": 0}))
    }

    async fn download_version(&self, _project_id: &str, version_id: &str) -> Result<Vec<u8>> {
        self.enter("download_version", "download").await?;
        Ok(version_id.as_bytes().to_vec())
    }
}

/// Builds a history message.
pub fn message(id: &str, session_id: &str, role: MessageRole, content: &str, minute: i64) -> Message {
    Message {
        id: id.to_string(),
        session_id: session_id.to_string(),
        role,
        content: content.to_string(),
        created_at: ts(minute),
    }
}
