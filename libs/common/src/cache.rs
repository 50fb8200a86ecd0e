//! Redis cache module for the Fitbyte backend
//!
//! This module provides the key-value cache adapter used for read-through
//! caching and pattern invalidation. Values are opaque strings to the
//! adapter; [`set_json`] and [`get_json`] handle serialization for callers.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisResult, aio::MultiplexedConnection};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{CacheError, CacheResult};

/// Key-value cache operations used by the services
///
/// `get` on a missing or expired key must return [`CacheError::NotFound`] so
/// callers can tell an ordinary miss apart from a broken backend.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Fetch the value stored under `key`
    async fn get(&self, key: &str) -> CacheResult<String>;

    /// Remove a single key
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Remove every key matching a glob `pattern`, returning how many went away
    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64>;

    /// Check that the backend answers
    async fn ping(&self) -> CacheResult<()>;
}

/// Serialize `value` as JSON and store it under `key`
pub async fn set_json<T>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration) -> CacheResult<()>
where
    T: Serialize + Sync + ?Sized,
{
    let encoded = serde_json::to_string(value)?;
    cache.set(key, &encoded, ttl).await
}

/// Fetch the JSON value under `key` and decode it
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> CacheResult<T> {
    let raw = cache.get(key).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Redis client sharing one multiplexed connection across all callers
///
/// The connection is opened on first use and cloned for every command.
/// Clones of the pool share it. A connection-level failure drops it so the
/// next command reconnects.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisPool {
    /// Initialize a new Redis client
    ///
    /// Opening the client does not connect; an unreachable Redis only shows up
    /// on the first command.
    pub async fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone())
            .map_err(|e| CacheError::Configuration(format!("Invalid Redis URL: {}", e)))?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool {
            client,
            connection: Arc::new(Mutex::new(None)),
        })
    }

    /// Get a handle on the shared connection, opening it if needed
    async fn get_connection(&self) -> CacheResult<MultiplexedConnection> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        debug!("Opened shared Redis connection");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Run one command on the shared connection
    async fn run<T, F, Fut>(&self, command: F) -> CacheResult<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.get_connection().await?;
        match command(conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
                    warn!(error = %e, "Dropping broken Redis connection");
                    self.connection.lock().await.take();
                }
                Err(e.into())
            }
        }
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let pong: String = self
            .run(|mut conn| async move { redis::cmd("PING").query_async(&mut conn).await })
            .await?;
        Ok(pong == "PONG")
    }
}

#[async_trait]
impl Cache for RedisPool {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        self.run(|mut conn| async move { conn.set_ex::<_, _, ()>(key, value, seconds).await })
            .await
    }

    async fn get(&self, key: &str) -> CacheResult<String> {
        let value: Option<String> = self
            .run(|mut conn| async move { conn.get(key).await })
            .await?;
        value.ok_or_else(|| CacheError::NotFound {
            key: key.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let _: u64 = self
            .run(|mut conn| async move { conn.del(key).await })
            .await?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let keys: Vec<String> = self
            .run(|mut conn| async move { conn.keys(pattern).await })
            .await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let removed: u64 = self
            .run(|mut conn| async move { conn.del(&keys).await })
            .await?;
        debug!(pattern, removed, "Deleted cache keys by pattern");
        Ok(removed)
    }

    async fn ping(&self) -> CacheResult<()> {
        if self.health_check().await? {
            Ok(())
        } else {
            Err(CacheError::Configuration(
                "Unexpected PING reply".to_string(),
            ))
        }
    }
}
