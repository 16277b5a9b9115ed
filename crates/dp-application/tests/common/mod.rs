//! Scripted backend shared by the workspace scenario tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use dp_application::{WorkspaceCoordinator, WorkspaceSettings};
use dp_core::Gateways;
use dp_core::error::{DpError, Result};
use dp_core::file::{FileGateway, FileItem, FileUpload};
use dp_core::profile::{DataGateway, DataProfile, DataShape, PreviewRow, QualityReport};
use dp_core::project::{NewProject, Project, ProjectGateway};
use dp_core::session::{ChatReply, Message, NewSession, Session, SessionGateway};
use dp_core::version::{NewVersion, Version, VersionGateway};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub fn at(minute: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
}

pub fn project(id: &str) -> Project {
    Project {
        id: id.to_string(),
        name: format!("{} analysis", id),
        description: None,
        created_at: at(0),
        updated_at: None,
    }
}

pub fn session(id: &str, project_id: &str, minute: i64) -> Session {
    Session {
        id: id.to_string(),
        project_id: project_id.to_string(),
        title: Some(format!("Chat {}", id)),
        created_at: at(minute),
        updated_at: at(minute),
    }
}

pub fn version(number: u32, minute: i64) -> Version {
    Version {
        id: format!("ver-{}", number),
        project_id: String::new(),
        version: number.to_string(),
        message: Some(format!("Step {}", number)),
        description: None,
        author: None,
        operation: None,
        code: None,
        data_snapshot_path: None,
        metadata: None,
        created_at: at(minute),
        updated_at: None,
    }
}

/// Gate that holds a request until released.
struct Gate(Semaphore);

/// In-memory backend whose requests can be held open per key.
///
/// Keys are `"<operation>"` or `"<operation>:<argument>"`; holding either
/// form blocks matching requests until [`release`](Self::release) is called.
#[derive(Default)]
pub struct ScriptedBackend {
    pub projects: Mutex<Vec<Project>>,
    /// Sessions by project id.
    pub sessions: Mutex<HashMap<String, Vec<Session>>>,
    pub history: Mutex<HashMap<String, Vec<Message>>>,
    pub files: Mutex<Vec<FileItem>>,
    /// Most recent first.
    pub versions: Mutex<Vec<Version>>,
    /// Version id attached to the next chat reply.
    pub reply_version: Mutex<Option<String>>,
    calls: Mutex<HashMap<String, usize>>,
    failures: Mutex<HashMap<String, DpError>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_project(self: Arc<Self>, id: &str) -> Arc<Self> {
        self.projects.lock().unwrap().push(project(id));
        self
    }

    pub fn coordinator(self: &Arc<Self>) -> Arc<WorkspaceCoordinator> {
        Arc::new(WorkspaceCoordinator::new(
            Gateways::from_shared(self.clone()),
            WorkspaceSettings::default(),
        ))
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

    async fn enter(&self, op: &str, argument: &str) -> Result<()> {
        *self.calls.lock().unwrap().entry(op.to_string()).or_default() += 1;
        let gate = {
            let gates = self.gates.lock().unwrap();
            gates
                .get(&format!("{}:{}", op, argument))
                .or_else(|| gates.get(op))
                .cloned()
        };
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
impl ProjectGateway for ScriptedBackend {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.enter("list_projects", "").await?;
        Ok(self.projects.lock().unwrap().clone())
    }

    async fn create_project(&self, request: &NewProject) -> Result<Project> {
        self.enter("create_project", &request.name).await?;
        let mut created = project(&format!("proj-{}", self.projects.lock().unwrap().len() + 1));
        created.name = request.name.clone();
        self.projects.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.enter("get_project", project_id).await?;
        self.projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
            .ok_or_else(|| DpError::client(404, "Project not found"))
    }
}

#[async_trait]
impl SessionGateway for ScriptedBackend {
    async fn list_sessions(&self, project_id: &str) -> Result<Vec<Session>> {
        self.enter("list_sessions", project_id).await?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_session(&self, request: &NewSession) -> Result<Session> {
        self.enter("create_session", &request.project_id).await?;
        let mut sessions = self.sessions.lock().unwrap();
        let list = sessions.entry(request.project_id.clone()).or_default();
        let mut created = session(
            &format!("{}-chat-{}", request.project_id, list.len() + 1),
            &request.project_id,
            60,
        );
        created.title = Some(request.title.clone());
        list.push(created.clone());
        Ok(created)
    }

    async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.enter("get_session", session_id).await?;
        self.sessions
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| DpError::client(404, "Session not found"))
    }

    async fn send_message(&self, session_id: &str, content: &str) -> Result<ChatReply> {
        self.enter("send_message", session_id).await?;
        let mut reply = ChatReply::text(format!("You said: {}", content));
        reply.version_id = self.reply_version.lock().unwrap().take();
        Ok(reply)
    }

    async fn get_history(&self, session_id: &str) -> Result<Vec<Message>> {
        self.enter("get_history", session_id).await?;
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
impl FileGateway for ScriptedBackend {
    async fn list_files(&self, project_id: &str) -> Result<Vec<FileItem>> {
        self.enter("list_files", project_id).await?;
        Ok(self.files.lock().unwrap().clone())
    }

    async fn upload_file(&self, project_id: &str, upload: &FileUpload) -> Result<FileItem> {
        self.enter("upload_file", project_id).await?;
        let item = FileItem {
            id: format!("file-{}", upload.file_name),
            name: upload.file_name.clone(),
            path: format!("uploads/{}/{}", project_id, upload.file_name),
            size: Some(upload.bytes.len() as u64),
            uploaded_at: Some(at(30)),
            file_type: upload.extension(),
        };
        let mut files = self.files.lock().unwrap();
        files.retain(|f| f.id != item.id);
        files.push(item.clone());
        Ok(item)
    }
}

#[async_trait]
impl DataGateway for ScriptedBackend {
    async fn profile(&self, file_path: &str) -> Result<DataProfile> {
        self.enter("profile", file_path).await?;
        Ok(DataProfile {
            shape: DataShape {
                rows: 100,
                columns: 3,
            },
            memory_usage: "2.4 KB".to_string(),
            columns: BTreeMap::new(),
            quality: QualityReport {
                score: 72.5,
                issues: vec!["Column 'region' has 4 missing values".to_string()],
            },
        })
    }

    async fn preview(&self, file_path: &str, limit: usize) -> Result<Vec<PreviewRow>> {
        self.enter("preview", file_path).await?;
        Ok((0..limit.min(3))
            .map(|i| {
                let mut row = PreviewRow::new();
                row.insert("row".to_string(), json!(i));
                row
            })
            .collect())
    }
}

#[async_trait]
impl VersionGateway for ScriptedBackend {
    async fn list_versions(&self, project_id: &str) -> Result<Vec<Version>> {
        self.enter("list_versions", project_id).await?;
        Ok(self.versions.lock().unwrap().clone())
    }

    async fn create_version(&self, project_id: &str, request: &NewVersion) -> Result<Version> {
        self.enter("create_version", project_id).await?;
        let mut versions = self.versions.lock().unwrap();
        let number = versions.len() as u32 + 1;
        let mut created = version(number, number as i64 * 10);
        created.message = Some(request.message.clone());
        versions.insert(0, created.clone());
        Ok(created)
    }

    async fn rollback_version(&self, project_id: &str, version_id: &str) -> Result<()> {
        self.enter("rollback_version", project_id).await?;
        let mut versions = self.versions.lock().unwrap();
        if !versions.iter().any(|v| v.id == version_id) {
            return Err(DpError::client(404, "Version not found"));
        }
        let number = versions.len() as u32 + 1;
        let mut created = version(number, number as i64 * 10);
        created.operation = Some("rollback".to_string());
        versions.insert(0, created);
        Ok(())
    }

    async fn get_version(&self, project_id: &str, version_id: &str) -> Result<Version> {
        self.enter("get_version", project_id).await?;
        self.versions
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == version_id)
            .cloned()
            .ok_or_else(|| DpError::client(404, "Version not found"))
    }

    async fn compare_versions(&self, project_id: &str, left: &str, right: &str) -> Result<Value> {
        self.enter("compare_versions", project_id).await?;
        Ok(json!({"version1": left, "version2": right, "changes": []}))
    }

    async fn download_version(&self, project_id: &str, version_id: &str) -> Result<Vec<u8>> {
        self.enter("download_version", project_id).await?;
        Ok(format!("id,value\n{},1\n", version_id).into_bytes())
    }
}
