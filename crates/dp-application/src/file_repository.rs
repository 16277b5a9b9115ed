//! File repository of one project and its current selection.

use dp_core::epoch::{ProjectScope, RequestSequence};
use dp_core::error::{DpError, Result};
use dp_core::file::{FileGateway, FileItem, FileUpload};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct FileState {
    /// Unique by id, in upload order.
    files: Vec<FileItem>,
    /// Path of the selected file.
    selected: Option<String>,
    /// Message of the last failed upload, cleared by the next attempt.
    last_error: Option<String>,
}

/// Releases the upload slot when dropped, including on early return.
struct UploadSlot<'a>(&'a AtomicBool);

impl<'a> UploadSlot<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for UploadSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Tracks uploaded files and the selected file for one project.
///
/// At most one upload runs at a time per instance. Selecting a file is a pure
/// state change; profile loading is triggered by the coordinator.
pub struct FileRepositoryManager {
    scope: ProjectScope,
    gateway: Arc<dyn FileGateway>,
    state: RwLock<FileState>,
    list_sequence: RequestSequence,
    uploading: AtomicBool,
}

impl FileRepositoryManager {
    pub fn new(scope: ProjectScope, gateway: Arc<dyn FileGateway>) -> Self {
        Self {
            scope,
            gateway,
            state: RwLock::new(FileState::default()),
            list_sequence: RequestSequence::new(),
            uploading: AtomicBool::new(false),
        }
    }

    /// Replaces the file list with the server's.
    ///
    /// A selection whose file is no longer listed is cleared.
    pub async fn list_files(&self) -> Result<()> {
        let ticket = self.list_sequence.issue();
        let result = self.gateway.list_files(self.scope.project_id()).await;

        if !self.scope.is_current() || !self.list_sequence.is_latest(ticket) {
            tracing::debug!("[FileRepository] Dropping stale file list");
            return Ok(());
        }
        let listed = result.inspect_err(|e| {
            tracing::warn!("[FileRepository] Failed to list files: {}", e);
        })?;

        let mut files: Vec<FileItem> = Vec::with_capacity(listed.len());
        for item in listed {
            match files.iter_mut().find(|f| f.id == item.id) {
                Some(existing) => *existing = item,
                None => files.push(item),
            }
        }

        let mut state = self.state.write().await;
        if let Some(selected) = &state.selected {
            if !files.iter().any(|f| &f.path == selected) {
                tracing::debug!("[FileRepository] Selected file {} disappeared", selected);
                state.selected = None;
            }
        }
        state.files = files;
        Ok(())
    }

    /// Uploads a file and selects it.
    ///
    /// # Errors
    ///
    /// - `DpError::Validation` if the file is rejected locally or another
    ///   upload is in progress; no request is issued.
    /// - The gateway error otherwise. The file list is left unchanged and the
    ///   message is kept for [`last_error`](Self::last_error).
    pub async fn upload_file(&self, upload: &FileUpload) -> Result<FileItem> {
        upload.validate()?;
        let _slot = UploadSlot::acquire(&self.uploading)
            .ok_or_else(|| DpError::validation("another upload is already in progress"))?;
        self.state.write().await.last_error = None;

        tracing::info!("[FileRepository] Uploading {} ({} bytes)", upload.file_name, upload.bytes.len());
        let result = self.gateway.upload_file(self.scope.project_id(), upload).await;

        if !self.scope.is_current() {
            tracing::debug!("[FileRepository] Project closed during upload of {}", upload.file_name);
            return result;
        }

        let mut state = self.state.write().await;
        match result {
            Ok(item) => {
                // A list issued before the upload would not contain the item.
                self.list_sequence.invalidate();
                match state.files.iter_mut().find(|f| f.id == item.id) {
                    Some(existing) => *existing = item.clone(),
                    None => state.files.push(item.clone()),
                }
                state.selected = Some(item.path.clone());
                Ok(item)
            }
            Err(e) => {
                tracing::warn!("[FileRepository] Upload of {} failed: {}", upload.file_name, e);
                state.last_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Selects a listed file by path.
    pub async fn select_file(&self, path: &str) -> Result<FileItem> {
        let mut state = self.state.write().await;
        let item = state
            .files
            .iter()
            .find(|f| f.path == path)
            .cloned()
            .ok_or_else(|| DpError::validation(format!("unknown file: {}", path)))?;
        state.selected = Some(item.path.clone());
        Ok(item)
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selected = None;
    }

    pub async fn files(&self) -> Vec<FileItem> {
        self.state.read().await.files.clone()
    }

    pub async fn selected_path(&self) -> Option<String> {
        self.state.read().await.selected.clone()
    }

    /// The selected file's item.
    pub async fn selected_file(&self) -> Option<FileItem> {
        let state = self.state.read().await;
        let selected = state.selected.as_ref()?;
        state.files.iter().find(|f| &f.path == selected).cloned()
    }

    pub fn upload_in_progress(&self) -> bool {
        self.uploading.load(Ordering::Acquire)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBackend, file};

    fn manager(backend: &Arc<FakeBackend>) -> Arc<FileRepositoryManager> {
        Arc::new(FileRepositoryManager::new(
            ProjectScope::detached("p1"),
            backend.clone(),
        ))
    }

    fn csv(name: &str) -> FileUpload {
        FileUpload::new(name, b"a,b\n1,2\n".to_vec())
    }

    #[tokio::test]
    async fn test_upload_appends_and_selects() {
        let backend = FakeBackend::new();
        let manager = manager(&backend);

        let item = manager.upload_file(&csv("sales.csv")).await.unwrap();

        assert_eq!(manager.files().await, vec![item.clone()]);
        assert_eq!(manager.selected_path().await, Some(item.path.clone()));
        assert_eq!(manager.selected_file().await.map(|f| f.name), Some("sales.csv".into()));
        assert!(!manager.upload_in_progress());
    }

    #[tokio::test]
    async fn test_reupload_replaces_by_id() {
        let backend = FakeBackend::new();
        let manager = manager(&backend);

        manager.upload_file(&csv("sales.csv")).await.unwrap();
        manager.upload_file(&csv("sales.csv")).await.unwrap();

        assert_eq!(manager.files().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_extension_issues_no_request() {
        let backend = FakeBackend::new();
        let manager = manager(&backend);

        let err = manager.upload_file(&csv("notes.txt")).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(backend.calls("upload_file"), 0);
    }

    #[tokio::test]
    async fn test_failed_upload_releases_slot_and_keeps_files() {
        let backend = FakeBackend::new();
        let manager = manager(&backend);
        manager.upload_file(&csv("a.csv")).await.unwrap();
        backend.fail_next("upload_file", DpError::server(500, "disk full"));

        let err = manager.upload_file(&csv("b.csv")).await.unwrap_err();

        assert!(err.is_server());
        assert!(!manager.upload_in_progress());
        assert_eq!(manager.files().await.len(), 1);
        assert_eq!(manager.selected_path().await, Some("uploads/a.csv".into()));
        assert_eq!(manager.last_error().await.as_deref(), Some("disk full"));

        manager.upload_file(&csv("b.csv")).await.unwrap();
        assert!(manager.last_error().await.is_none());
    }

    #[tokio::test]
    async fn test_second_upload_rejected_while_first_in_flight() {
        let backend = FakeBackend::new();
        let manager = manager(&backend);
        backend.hold("upload");

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.upload_file(&csv("a.csv")).await }
        });
        backend.wait_for_calls("upload_file", 1).await;
        assert!(manager.upload_in_progress());

        let err = manager.upload_file(&csv("b.csv")).await.unwrap_err();
        assert!(err.is_validation());

        backend.release("upload");
        first.await.unwrap().unwrap();
        assert!(!manager.upload_in_progress());
        assert_eq!(backend.calls("upload_file"), 1);
    }

    #[tokio::test]
    async fn test_upload_slot_released_when_task_aborted() {
        let backend = FakeBackend::new();
        let manager = manager(&backend);
        backend.hold("upload");

        let task = tokio::spawn({
            let manager = manager.clone();
            async move { manager.upload_file(&csv("a.csv")).await }
        });
        backend.wait_for_calls("upload_file", 1).await;
        task.abort();
        let _ = task.await;

        assert!(!manager.upload_in_progress());
    }

    #[tokio::test]
    async fn test_stale_list_does_not_hide_upload() {
        let backend = FakeBackend::new();
        let manager = manager(&backend);
        backend.hold("files");

        let listing = tokio::spawn({
            let manager = manager.clone();
            async move { manager.list_files().await }
        });
        backend.wait_for_calls("list_files", 1).await;
        let item = manager.upload_file(&csv("fresh.csv")).await.unwrap();
        backend.files.lock().unwrap().clear();
        backend.release("files");
        listing.await.unwrap().unwrap();

        assert_eq!(manager.files().await, vec![item]);
    }

    #[tokio::test]
    async fn test_select_requires_known_path() {
        let backend = FakeBackend::new();
        backend.files.lock().unwrap().push(file("a.csv"));
        let manager = manager(&backend);
        manager.list_files().await.unwrap();

        assert!(manager.select_file("uploads/zzz.csv").await.unwrap_err().is_validation());
        let item = manager.select_file("uploads/a.csv").await.unwrap();
        assert_eq!(item.name, "a.csv");
    }

    #[tokio::test]
    async fn test_list_clears_missing_selection() {
        let backend = FakeBackend::new();
        backend.files.lock().unwrap().push(file("a.csv"));
        let manager = manager(&backend);
        manager.list_files().await.unwrap();
        manager.select_file("uploads/a.csv").await.unwrap();

        backend.files.lock().unwrap().clear();
        manager.list_files().await.unwrap();

        assert!(manager.selected_path().await.is_none());
    }
}
