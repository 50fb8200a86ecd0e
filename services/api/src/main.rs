use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod jwt;
mod middleware;
mod models;
mod password;
mod repositories;
mod routes;
mod services;
mod state;
mod storage;
mod validation;

#[cfg(test)]
mod testing;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, init_pool},
};
use tokio::net::TcpListener;

use crate::{
    config::Settings,
    jwt::{JwtService, TokenIssuer},
    password::Argon2Hasher,
    repositories::{ActivityRepository, FileRepository, UserRepository},
    services::{ActivityService, CacheLayer, FileService, HealthService, UserService},
    state::AppState,
    storage::S3Storage,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting API service");

    let settings = Settings::load()?;
    let deadline = settings.request_timeout();

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    if settings.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    // The service keeps running without Redis; reads fall back to Postgres
    let redis_pool = RedisPool::new(&RedisConfig::from_env()?).await?;
    match redis_pool.health_check().await {
        Ok(true) => info!("Redis connection successful"),
        _ => tracing::warn!("Redis is not reachable, continuing without cache"),
    }

    let jwt_service = JwtService::new(settings.jwt_config())?;
    info!("Issuing tokens valid for {}s", jwt_service.expiry_secs());
    let tokens: Arc<dyn TokenIssuer> = Arc::new(jwt_service);
    let storage = S3Storage::new(settings.storage_config()).await?;

    let cache = CacheLayer::new(Arc::new(redis_pool), deadline);
    let user_repository = Arc::new(UserRepository::new(pool.clone()));

    let app_state = AppState {
        user_service: UserService::new(
            user_repository.clone(),
            cache.clone(),
            Arc::new(Argon2Hasher),
            tokens.clone(),
            deadline,
        ),
        activity_service: ActivityService::new(
            Arc::new(ActivityRepository::new(pool.clone())),
            user_repository,
            cache.clone(),
            deadline,
        ),
        file_service: FileService::new(
            Arc::new(storage),
            Arc::new(FileRepository::new(pool.clone())),
            deadline,
        ),
        health_service: HealthService::new(Arc::new(pool), cache, deadline),
        tokens,
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let address = format!("0.0.0.0:{}", settings.http_port);
    let listener = TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
