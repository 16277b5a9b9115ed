//! HTTP implementation of every gateway trait.
//!
//! Pure transport: one request per call, no retries and no caching. Status
//! codes are classified into the shared error taxonomy here so the layers
//! above never see `reqwest` types.

use crate::config::ClientConfig;
use crate::dto::{
    ChatRequestDto, ChatResponseDto, ErrorBodyDto, PreviewRequestDto, ProfileRequestDto,
    UploadResponseDto,
};
use async_trait::async_trait;
use dp_core::error::{DpError, Result};
use dp_core::file::{FileGateway, FileItem, FileUpload};
use dp_core::profile::{DataGateway, DataProfile, PreviewRow};
use dp_core::project::{NewProject, Project, ProjectGateway};
use dp_core::session::{ChatReply, Message, NewSession, Session, SessionGateway};
use dp_core::version::{NewVersion, Version, VersionGateway};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Converts a transport failure into the shared error type.
///
/// Timeouts and connection failures are network errors; a body that does
/// not match the expected shape is a serialization error.
pub fn map_transport_error(err: reqwest::Error) -> DpError {
    if err.is_decode() {
        return DpError::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        };
    }
    if err.is_timeout() {
        return DpError::network(format!("request timed out: {}", err));
    }
    if err.is_connect() {
        return DpError::network(format!("cannot reach the API server: {}", err));
    }
    DpError::network(err.to_string())
}

/// Client for the data-processing backend.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Creates a gateway honouring the configured base URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns `DpError::Config` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DpError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Passes successful responses through and classifies the rest.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBodyDto>(&body) {
            Ok(parsed) => parsed.message(),
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            Err(_) => body,
        };
        tracing::debug!("[HttpGateway] {} -> {}", status, message);
        Err(DpError::from_status(status.as_u16(), message))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(map_transport_error)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::decode(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::decode(response).await
    }
}

#[async_trait]
impl ProjectGateway for HttpGateway {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get_json("/projects").await
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project> {
        self.post_json("/projects", project).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.get_json(&format!("/projects/{}", project_id)).await
    }
}

#[async_trait]
impl SessionGateway for HttpGateway {
    async fn list_sessions(&self, project_id: &str) -> Result<Vec<Session>> {
        let response = self
            .client
            .get(self.url("/sessions"))
            .query(&[("project_id", project_id)])
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::decode(response).await
    }

    async fn create_session(&self, request: &NewSession) -> Result<Session> {
        let response = self
            .client
            .post(self.url("/sessions"))
            .form(request)
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::decode(response).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.get_json(&format!("/sessions/{}", session_id)).await
    }

    async fn send_message(&self, session_id: &str, content: &str) -> Result<ChatReply> {
        let body = ChatRequestDto {
            session_id,
            message: content,
        };
        let dto: ChatResponseDto = self.post_json("/chat", &body).await?;
        Ok(dto.into())
    }

    async fn get_history(&self, session_id: &str) -> Result<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .get_json(&format!("/sessions/{}/history", session_id))
            .await?;
        for message in &mut messages {
            if message.session_id.is_empty() {
                message.session_id = session_id.to_string();
            }
        }
        Ok(messages)
    }
}

#[async_trait]
impl FileGateway for HttpGateway {
    async fn list_files(&self, project_id: &str) -> Result<Vec<FileItem>> {
        self.get_json(&format!("/projects/{}/files", project_id)).await
    }

    async fn upload_file(&self, project_id: &str, upload: &FileUpload) -> Result<FileItem> {
        let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&format!("/projects/{}/upload", project_id)))
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;
        let dto: UploadResponseDto = Self::decode(response).await?;
        if let Some(version_id) = &dto.version_id {
            tracing::debug!("[HttpGateway] Upload created version {}", version_id);
        }
        Ok(dto.into_file_item(upload.bytes.len() as u64))
    }
}

#[async_trait]
impl DataGateway for HttpGateway {
    async fn profile(&self, file_path: &str) -> Result<DataProfile> {
        self.post_json("/data/profile", &ProfileRequestDto { file_path })
            .await
    }

    async fn preview(&self, file_path: &str, limit: usize) -> Result<Vec<PreviewRow>> {
        self.post_json("/data/preview", &PreviewRequestDto { file_path, limit })
            .await
    }
}

#[async_trait]
impl VersionGateway for HttpGateway {
    async fn list_versions(&self, project_id: &str) -> Result<Vec<Version>> {
        self.get_json(&format!("/projects/{}/versions", project_id))
            .await
    }

    async fn create_version(&self, project_id: &str, request: &NewVersion) -> Result<Version> {
        self.post_json(&format!("/projects/{}/versions", project_id), request)
            .await
    }

    async fn rollback_version(&self, project_id: &str, version_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!(
                "/projects/{}/versions/{}/rollback",
                project_id, version_id
            )))
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_version(&self, project_id: &str, version_id: &str) -> Result<Version> {
        self.get_json(&format!("/projects/{}/versions/{}", project_id, version_id))
            .await
    }

    async fn compare_versions(&self, project_id: &str, left: &str, right: &str) -> Result<Value> {
        self.get_json(&format!(
            "/projects/{}/versions/compare/{}/{}",
            project_id, left, right
        ))
        .await
    }

    async fn download_version(&self, project_id: &str, version_id: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.url(&format!(
                "/projects/{}/versions/{}/download",
                project_id, version_id
            )))
            .send()
            .await
            .map_err(map_transport_error)?;
        let bytes = Self::check(response)
            .await?
            .bytes()
            .await
            .map_err(map_transport_error)?;
        Ok(bytes.to_vec())
    }
}
