use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub filename: Option<String>,
    pub file_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedDocumentResponse {
    pub message: &'static str,
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
