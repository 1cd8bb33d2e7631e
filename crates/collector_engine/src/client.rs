use std::time::Duration;

use engine_logging::engine_debug;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::types::{AnalyzeRequest, CollectRequest};
use crate::{
    CollaboratorError, CollectionStart, CollectionStatus, Extraction, FailureKind,
};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The remote service that collects comments, detects entities and runs the
/// analysis. The orchestrator only talks to it through this trait.
#[async_trait::async_trait]
pub trait Collaborator: Send + Sync {
    async fn start_collection(&self, url: &str) -> Result<CollectionStart, CollaboratorError>;

    async fn collection_status(&self, video_id: &str)
        -> Result<CollectionStatus, CollaboratorError>;

    async fn extract_entities(&self, video_id: &str) -> Result<Extraction, CollaboratorError>;

    async fn analyze(&self, video_id: &str, entity_ids: &[String])
        -> Result<(), CollaboratorError>;
}

/// [`Collaborator`] backed by the analysis backend's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCollaborator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCollaborator {
    pub fn new(settings: ClientSettings) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| CollaboratorError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CollaboratorError> {
        let response = Self::check_status(response).await?;
        response.json::<T>().await.map_err(map_reqwest_error)
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CollaboratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let kind = if status == StatusCode::NOT_FOUND {
            FailureKind::NotFound
        } else {
            FailureKind::HttpStatus(status.as_u16())
        };
        Err(CollaboratorError::new(kind, body))
    }
}

#[async_trait::async_trait]
impl Collaborator for HttpCollaborator {
    async fn start_collection(&self, url: &str) -> Result<CollectionStart, CollaboratorError> {
        let endpoint = self.endpoint("/api/analysis/collect");
        engine_debug!("POST {} video_url={}", endpoint, url);
        let response = self
            .client
            .post(&endpoint)
            .json(&CollectRequest { video_url: url })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read_json(response).await
    }

    async fn collection_status(
        &self,
        video_id: &str,
    ) -> Result<CollectionStatus, CollaboratorError> {
        let endpoint = self.endpoint(&format!("/api/analysis/collect/{video_id}"));
        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read_json(response).await
    }

    async fn extract_entities(&self, video_id: &str) -> Result<Extraction, CollaboratorError> {
        let endpoint = self.endpoint(&format!(
            "/api/tiger-extraction/extract/preview/{video_id}"
        ));
        engine_debug!("GET {}", endpoint);
        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read_json(response).await
    }

    async fn analyze(&self, video_id: &str, entity_ids: &[String]) -> Result<(), CollaboratorError> {
        let endpoint = self.endpoint("/api/analysis/analyze");
        engine_debug!("POST {} video_id={} entities={}", endpoint, video_id, entity_ids.len());
        let response = self
            .client
            .post(&endpoint)
            .json(&AnalyzeRequest {
                video_id,
                entity_ids,
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        // The analysis summary is not used beyond success or failure.
        Self::check_status(response).await.map(|_| ())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        return CollaboratorError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return CollaboratorError::new(FailureKind::Decode, err.to_string());
    }
    if let Some(status) = err.status() {
        if status == StatusCode::NOT_FOUND {
            return CollaboratorError::new(FailureKind::NotFound, err.to_string());
        }
        return CollaboratorError::new(FailureKind::HttpStatus(status.as_u16()), err.to_string());
    }
    CollaboratorError::new(FailureKind::Network, err.to_string())
}
