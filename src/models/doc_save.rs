use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request for saving the content as a new version
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentSaveRequest {
    pub content: String,
}

/// Response returned after a new version was appended
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentSaveResponse {
    pub document: String,
    pub version: u32,
    pub total: u32,
}
