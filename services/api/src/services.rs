//! Business services sitting between the HTTP handlers and the stores
//!
//! Services own the cache policy. The relational store is authoritative:
//! every store call runs under the request deadline and its failures end the
//! operation, while cache failures are logged and treated as misses.

use std::{future::Future, sync::Arc, time::Duration};

use common::{
    cache::{Cache, get_json, set_json},
    error::DatabaseResult,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

pub mod activity;
pub mod file;
pub mod health;
pub mod user;

pub use activity::ActivityService;
pub use file::FileService;
pub use health::HealthService;
pub use user::UserService;

/// Run a store call under `deadline`
///
/// A timeout surfaces as [`ApiError::DeadlineExceeded`]; store errors are
/// classified through `From<DatabaseError>`.
pub(crate) async fn within_deadline<T, F>(deadline: Duration, call: F) -> ApiResult<T>
where
    F: Future<Output = DatabaseResult<T>>,
{
    match timeout(deadline, call).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ApiError::DeadlineExceeded),
    }
}

/// Best-effort JSON cache in front of the stores
#[derive(Clone)]
pub struct CacheLayer {
    cache: Arc<dyn Cache>,
    deadline: Duration,
}

impl CacheLayer {
    pub fn new(cache: Arc<dyn Cache>, deadline: Duration) -> Self {
        Self { cache, deadline }
    }

    /// Cached value under `key`, or `None` on a miss or any cache failure
    pub async fn fetch<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match timeout(self.deadline, get_json::<T>(self.cache.as_ref(), key)).await {
            Ok(Ok(value)) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Ok(Err(e)) if e.is_not_found() => {
                debug!(key, "Cache miss");
                None
            }
            Ok(Err(e)) => {
                warn!(key, error = %e, "Cache read failed, falling back to store");
                None
            }
            Err(_) => {
                warn!(key, "Cache read timed out, falling back to store");
                None
            }
        }
    }

    /// Store `value` under `key`; failures are only logged
    pub async fn store<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize + Sync + ?Sized,
    {
        match timeout(self.deadline, set_json(self.cache.as_ref(), key, value, ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key, error = %e, "Failed to populate cache"),
            Err(_) => warn!(key, "Cache write timed out"),
        }
    }

    /// Remove `key`; failures are only logged
    pub async fn evict(&self, key: &str) {
        match timeout(self.deadline, self.cache.delete(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key, error = %e, "Failed to evict cache entry"),
            Err(_) => warn!(key, "Cache eviction timed out"),
        }
    }

    /// Remove every key matching `pattern`; failures are only logged
    pub async fn evict_pattern(&self, pattern: &str) {
        match timeout(self.deadline, self.cache.delete_pattern(pattern)).await {
            Ok(Ok(removed)) => debug!(pattern, removed, "Invalidated cache entries"),
            Ok(Err(e)) => warn!(pattern, error = %e, "Failed to invalidate cache entries"),
            Err(_) => warn!(pattern, "Cache invalidation timed out"),
        }
    }

    /// Whether the backend answers a ping within the deadline
    pub async fn is_reachable(&self) -> bool {
        match timeout(self.deadline, self.cache.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Cache ping failed");
                false
            }
            Err(_) => {
                warn!("Cache ping timed out");
                false
            }
        }
    }
}
