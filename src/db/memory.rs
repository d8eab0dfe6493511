use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::VersionStore;
use crate::models::{SyncError, Version};

/// Process-local version store, used when no database is configured.
#[derive(Default)]
pub struct InMemoryVersionStore {
    documents: RwLock<HashMap<String, Vec<Version>>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(doc_id: &str, number: u32) -> SyncError {
    SyncError::NotFound {
        document: doc_id.to_string(),
        version: number,
    }
}

#[async_trait]
impl VersionStore for InMemoryVersionStore {
    async fn append_version(&self, doc_id: &str, content: &str) -> Result<u32, SyncError> {
        let mut documents = self.documents.write().await;
        let versions = documents.entry(doc_id.to_string()).or_default();
        let number = versions.len() as u32 + 1;
        versions.push(Version {
            number,
            content: content.to_string(),
            created_at: Utc::now(),
        });
        debug!("Appended version {} of document '{}'", number, doc_id);
        Ok(number)
    }

    async fn update_version(&self, doc_id: &str, number: u32, content: &str) -> Result<(), SyncError> {
        let mut documents = self.documents.write().await;
        let version = documents
            .get_mut(doc_id)
            .and_then(|versions| versions.get_mut((number as usize).wrapping_sub(1)))
            .ok_or_else(|| not_found(doc_id, number))?;
        version.content = content.to_string();
        debug!("Updated version {} of document '{}' in place", number, doc_id);
        Ok(())
    }

    async fn get_version(&self, doc_id: &str, number: u32) -> Result<Version, SyncError> {
        let documents = self.documents.read().await;
        documents
            .get(doc_id)
            .and_then(|versions| versions.get((number as usize).wrapping_sub(1)))
            .cloned()
            .ok_or_else(|| not_found(doc_id, number))
    }

    async fn count(&self, doc_id: &str) -> Result<u32, SyncError> {
        let documents = self.documents.read().await;
        Ok(documents.get(doc_id).map_or(0, |versions| versions.len() as u32))
    }
}
