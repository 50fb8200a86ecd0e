//! Common library for the Fitbyte backend
//!
//! This crate provides shared infrastructure used by the services: PostgreSQL
//! connectivity, the Redis-backed cache adapter, and the typed errors both
//! of them surface.
//!
//! ```rust,no_run
//! use common::cache::{Cache, RedisConfig, RedisPool};
//! use common::database::{DatabaseConfig, health_check, init_pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = init_pool(&DatabaseConfig::from_env()?).await?;
//!     println!("Database health check: {}", health_check(&pool).await?);
//!
//!     let cache = RedisPool::new(&RedisConfig::from_env()?).await?;
//!     cache.ping().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
