//! Dependency health reporting

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::time::timeout;
use tracing::error;

use super::CacheLayer;
use crate::repositories::DatabaseProbe;

/// Overall service status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Degraded,
    Down,
}

/// State of one dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Connected,
    Disconnected,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub database: ComponentState,
    pub cache: ComponentState,
}

impl HealthReport {
    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

/// Checks the database first; the cache is only probed when it is up
#[derive(Clone)]
pub struct HealthService {
    database: Arc<dyn DatabaseProbe>,
    cache: CacheLayer,
    deadline: Duration,
}

impl HealthService {
    pub fn new(database: Arc<dyn DatabaseProbe>, cache: CacheLayer, deadline: Duration) -> Self {
        Self {
            database,
            cache,
            deadline,
        }
    }

    pub async fn check(&self) -> HealthReport {
        let database_up = match timeout(self.deadline, self.database.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(error = %e, "Database health check failed");
                false
            }
            Err(_) => {
                error!("Database health check timed out");
                false
            }
        };

        if !database_up {
            return HealthReport {
                status: HealthStatus::Down,
                database: ComponentState::Disconnected,
                cache: ComponentState::Unknown,
            };
        }

        if !self.cache.is_reachable().await {
            return HealthReport {
                status: HealthStatus::Degraded,
                database: ComponentState::Connected,
                cache: ComponentState::Disconnected,
            };
        }

        HealthReport {
            status: HealthStatus::Up,
            database: ComponentState::Connected,
            cache: ComponentState::Connected,
        }
    }
}
