//! Object storage for uploaded files
//!
//! Uploads go to an S3-compatible bucket (MinIO in local setups) and are
//! addressed by a public URI built from the configured public endpoint.

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    primitives::ByteStream,
};
use tracing::info;

/// Stores uploaded objects and hands back a public URI
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
        size: i64,
    ) -> Result<String>;
}

/// S3 storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint, e.g. `http://minio:9000`
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Base URL clients use to fetch objects
    pub public_endpoint: String,
    pub region: String,
}

/// Build the public URI for an object
pub fn public_uri(public_endpoint: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", public_endpoint.trim_end_matches('/'), bucket, key)
}

/// S3-backed object storage
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    config: StorageConfig,
}

impl S3Storage {
    /// Connect to the bucket, creating it when missing
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "fitbyte-static",
            ))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        let storage = Self {
            client: Client::from_conf(s3_config),
            config,
        };
        storage.ensure_bucket().await?;
        Ok(storage)
    }

    async fn ensure_bucket(&self) -> Result<()> {
        if self
            .client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }

        info!("Creating bucket: {}", self.config.bucket);
        self.client
            .create_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create bucket: {}", e))?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
        size: i64,
    ) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(size)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to upload object {}: {}", key, e))?;

        info!("Uploaded object {} ({} bytes)", key, size);
        Ok(public_uri(
            &self.config.public_endpoint,
            &self.config.bucket,
            key,
        ))
    }
}
