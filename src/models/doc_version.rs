use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::Version;

/// Selects the document a REST call applies to
#[derive(Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct DocumentQuery {
    /// Document id, the configured default room when omitted
    pub doc: Option<String>,
}

/// Request for overwriting an existing version
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentVersionUpdateRequest {
    pub content: String,
}

/// Response for a single document version
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct DocumentVersionResponse {
    pub number: u32,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<Version> for DocumentVersionResponse {
    fn from(version: Version) -> Self {
        Self {
            number: version.number,
            content: version.content,
            created_at: version.created_at,
        }
    }
}

impl From<DocumentVersionResponse> for Version {
    fn from(response: DocumentVersionResponse) -> Self {
        Self {
            number: response.number,
            content: response.content,
            created_at: response.created_at,
        }
    }
}
