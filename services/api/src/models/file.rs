//! Uploaded file models

use serde::Serialize;
use uuid::Uuid;

/// File received from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Metadata for a stored object, ready to insert
#[derive(Debug, Clone)]
pub struct NewFile {
    pub user_id: Uuid,
    pub object_key: String,
    pub mime_type: String,
    pub size: i64,
}

/// Response for a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub uri: String,
}
