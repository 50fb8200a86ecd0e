//! Service settings layered from defaults and the environment
//!
//! Database and Redis settings are read by `common` itself; everything the
//! HTTP service needs on top of that lives here.

use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

use crate::{jwt::JwtConfig, storage::StorageConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub http_port: u16,
    /// Deadline applied to every store and cache call
    pub request_timeout_secs: u64,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiry_secs: u64,
    pub minio_endpoint: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub minio_bucket: String,
    pub minio_public_endpoint: String,
    pub minio_region: String,
    pub run_migrations: bool,
}

impl Settings {
    /// Load settings, letting environment variables override the defaults
    ///
    /// `JWT_SECRET` has no usable default; an unset secret is rejected when
    /// the token service starts.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("http_port", 8080_i64)?
            .set_default("request_timeout_secs", 5_i64)?
            .set_default("jwt_secret", "")?
            .set_default("jwt_issuer", "fitbyte-app")?
            .set_default("jwt_expiry_secs", 86_400_i64)?
            .set_default("minio_endpoint", "http://localhost:9000")?
            .set_default("minio_access_key", "minioadmin")?
            .set_default("minio_secret_key", "minioadmin")?
            .set_default("minio_bucket", "fitbyte")?
            .set_default("minio_public_endpoint", "http://localhost:9000")?
            .set_default("minio_region", "us-east-1")?
            .set_default("run_migrations", true)?
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.jwt_secret.clone(),
            issuer: self.jwt_issuer.clone(),
            expiry_secs: self.jwt_expiry_secs,
        }
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            endpoint: self.minio_endpoint.clone(),
            access_key: self.minio_access_key.clone(),
            secret_key: self.minio_secret_key.clone(),
            bucket: self.minio_bucket.clone(),
            public_endpoint: self.minio_public_endpoint.clone(),
            region: self.minio_region.clone(),
        }
    }
}
