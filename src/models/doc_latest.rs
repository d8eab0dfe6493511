use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::DocumentVersionResponse;

/// Response describing how far a document's history goes
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentLatestResponse {
    pub document: String,
    pub total: u32,
    pub latest: Option<DocumentVersionResponse>,
}
