use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

use crate::db::VersionStore;
use crate::models::{
    DocumentLatestResponse, DocumentSaveRequest, DocumentSaveResponse, DocumentVersionResponse,
    DocumentVersionUpdateRequest, ErrorResponse, SyncError, Version,
};

/// [`VersionStore`] reached over the server's REST surface.
#[derive(Debug, Clone)]
pub struct HttpVersionStore {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpVersionStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn authorized(&self, request: RequestBuilder, doc_id: &str) -> RequestBuilder {
        request
            .query(&[("doc", doc_id)])
            .header("Authorization", format!("Bearer {}", self.token))
    }

    async fn send(&self, request: RequestBuilder, doc_id: &str, number: u32) -> Result<Response, SyncError> {
        let response = self
            .authorized(request, doc_id)
            .send()
            .await
            .map_err(|e| SyncError::StorageUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        warn!("Version request for document '{}' failed: {} {}", doc_id, status, message);

        Err(match status {
            StatusCode::NOT_FOUND => SyncError::NotFound {
                document: doc_id.to_string(),
                version: number,
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Unauthorized(message),
            StatusCode::CONFLICT => SyncError::InvalidState(message),
            _ => SyncError::StorageUnavailable(message),
        })
    }
}

fn malformed(e: reqwest::Error) -> SyncError {
    SyncError::StorageUnavailable(format!("malformed response: {}", e))
}

#[async_trait]
impl VersionStore for HttpVersionStore {
    async fn append_version(&self, doc_id: &str, content: &str) -> Result<u32, SyncError> {
        let url = format!("{}/api/documents", self.base_url);
        let request = self.client.post(&url).json(&DocumentSaveRequest {
            content: content.to_string(),
        });
        let saved: DocumentSaveResponse = self.send(request, doc_id, 0).await?.json().await.map_err(malformed)?;
        Ok(saved.version)
    }

    async fn update_version(&self, doc_id: &str, number: u32, content: &str) -> Result<(), SyncError> {
        let url = format!("{}/api/documents/version/{}", self.base_url, number);
        let request = self.client.put(&url).json(&DocumentVersionUpdateRequest {
            content: content.to_string(),
        });
        self.send(request, doc_id, number).await?;
        Ok(())
    }

    async fn get_version(&self, doc_id: &str, number: u32) -> Result<Version, SyncError> {
        let url = format!("{}/api/documents/version/{}", self.base_url, number);
        let version: DocumentVersionResponse = self
            .send(self.client.get(&url), doc_id, number)
            .await?
            .json()
            .await
            .map_err(malformed)?;
        Ok(version.into())
    }

    async fn count(&self, doc_id: &str) -> Result<u32, SyncError> {
        let url = format!("{}/api/documents", self.base_url);
        let latest: DocumentLatestResponse = self
            .send(self.client.get(&url), doc_id, 0)
            .await?
            .json()
            .await
            .map_err(malformed)?;
        Ok(latest.total)
    }
}
