pub mod health;
pub mod doc_latest;
pub mod doc_save;
pub mod doc_version;
pub mod diagnostics;

pub use health::*;
pub use doc_latest::*;
pub use doc_save::*;
pub use doc_version::*;
pub use diagnostics::*;

use axum::{http::StatusCode, Json};
use tracing::{error, warn};

use crate::models::{ErrorResponse, SyncError};

/// Log a store failure and turn it into the handler's error reply.
pub(crate) fn store_error(action: &str, e: SyncError) -> (StatusCode, Json<ErrorResponse>) {
    match &e {
        SyncError::StorageUnavailable(_) => error!("Failed to {}: {}", action, e),
        _ => warn!("Failed to {}: {}", action, e),
    }
    e.to_error_response()
}
