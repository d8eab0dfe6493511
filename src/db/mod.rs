pub mod dbversions;
pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{SyncError, Version};

pub use dbversions::PgVersionStore;
pub use memory::InMemoryVersionStore;

/// Linear, numbered history of snapshots per document.
///
/// Numbers start at 1 and stay contiguous. Only `update_version` may change
/// an existing entry, and it never changes the count.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Append the next version and return its number.
    async fn append_version(&self, doc_id: &str, content: &str) -> Result<u32, SyncError>;

    /// Overwrite the content of an existing version in place.
    async fn update_version(&self, doc_id: &str, number: u32, content: &str) -> Result<(), SyncError>;

    async fn get_version(&self, doc_id: &str, number: u32) -> Result<Version, SyncError>;

    /// Number of versions, 0 when the document was never saved.
    async fn count(&self, doc_id: &str) -> Result<u32, SyncError>;
}

#[async_trait]
impl<T: VersionStore + ?Sized> VersionStore for Arc<T> {
    async fn append_version(&self, doc_id: &str, content: &str) -> Result<u32, SyncError> {
        (**self).append_version(doc_id, content).await
    }

    async fn update_version(&self, doc_id: &str, number: u32, content: &str) -> Result<(), SyncError> {
        (**self).update_version(doc_id, number, content).await
    }

    async fn get_version(&self, doc_id: &str, number: u32) -> Result<Version, SyncError> {
        (**self).get_version(doc_id, number).await
    }

    async fn count(&self, doc_id: &str) -> Result<u32, SyncError> {
        (**self).count(doc_id).await
    }
}

/// Content of the newest version, if the document was ever saved.
pub async fn latest_content<S: VersionStore + ?Sized>(store: &S, doc_id: &str) -> Result<Option<String>, SyncError> {
    match store.count(doc_id).await? {
        0 => Ok(None),
        total => Ok(Some(store.get_version(doc_id, total).await?.content)),
    }
}
