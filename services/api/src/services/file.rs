//! Profile image uploads

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::time::timeout;
use tracing::info;
use uuid::Uuid;

use super::within_deadline;
use crate::{
    error::{ApiError, ApiResult},
    models::file::{NewFile, UploadedFile},
    repositories::FileStore,
    storage::ObjectStorage,
};

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Media type without parameters, lowercased
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Reduce a client-supplied file name to a safe object key component
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn object_key(user_id: Uuid, unix_ts: i64, file_name: &str) -> String {
    format!(
        "uploads/{}_{}_{}",
        user_id,
        unix_ts,
        sanitize_file_name(file_name)
    )
}

/// Validates uploads, pushes them to object storage and records them
#[derive(Clone)]
pub struct FileService {
    storage: Arc<dyn ObjectStorage>,
    files: Arc<dyn FileStore>,
    deadline: Duration,
}

impl FileService {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        files: Arc<dyn FileStore>,
        deadline: Duration,
    ) -> Self {
        Self {
            storage,
            files,
            deadline,
        }
    }

    /// Upload `file` for `user_id` and return its public URI
    pub async fn upload(&self, user_id: Uuid, file: UploadedFile) -> ApiResult<String> {
        if file.bytes.is_empty() {
            return Err(ApiError::InvalidInput("File is required".to_string()));
        }
        if file.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::InvalidInput(
                "File size exceeds 10MB limit".to_string(),
            ));
        }
        let mime_type = essence(&file.content_type);
        if !ALLOWED_CONTENT_TYPES.contains(&mime_type.as_str()) {
            return Err(ApiError::InvalidInput(
                "Only JPEG and PNG files are allowed".to_string(),
            ));
        }

        let key = object_key(user_id, Utc::now().timestamp(), &file.file_name);
        let size = file.bytes.len() as i64;

        let uri = timeout(
            self.deadline,
            self.storage.upload(&key, &mime_type, file.bytes, size),
        )
        .await
        .map_err(|_| ApiError::DeadlineExceeded)?
        .map_err(ApiError::Storage)?;

        let file_id = within_deadline(
            self.deadline,
            self.files.record(&NewFile {
                user_id,
                object_key: key.clone(),
                mime_type,
                size,
            }),
        )
        .await?;
        info!(%user_id, %file_id, key = %key, size, "Stored uploaded file");

        Ok(uri)
    }
}
