//! File metadata repository

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use super::FileStore;
use crate::models::file::NewFile;

/// Repository for uploaded file records
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for FileRepository {
    async fn record(&self, file: &NewFile) -> DatabaseResult<Uuid> {
        info!("Recording file {} for user {}", file.object_key, file.user_id);

        let row = sqlx::query(
            r#"
            INSERT INTO files (id, user_id, object_key, mime_type, size)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(file.user_id)
        .bind(&file.object_key)
        .bind(&file.mime_type)
        .bind(file.size)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }
}
