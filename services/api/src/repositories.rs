//! Repositories for database operations
//!
//! Each store is a trait so services can be exercised against in-memory
//! doubles; the sqlx-backed implementations live in the submodules.

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    activity::{Activity, ActivityFilter},
    file::NewFile,
    user::{NewUser, ProfileChanges, User},
};

pub mod activity;
pub mod file;
pub mod user;

pub use activity::ActivityRepository;
pub use file::FileRepository;
pub use user::UserRepository;

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user
    async fn create(&self, new_user: &NewUser) -> DatabaseResult<User>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    /// Find a user by email
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Whether a user with this ID exists
    async fn exists(&self, id: Uuid) -> DatabaseResult<bool>;

    /// Overwrite the profile columns, returning the updated row
    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> DatabaseResult<Option<User>>;
}

/// Activity persistence
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Insert a new activity
    async fn create(&self, activity: &Activity) -> DatabaseResult<()>;

    /// Activities of one user matching `filter`, newest `done_at` first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &ActivityFilter,
    ) -> DatabaseResult<Vec<Activity>>;

    /// The activity if it exists and belongs to `user_id`
    async fn find_owned(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
    ) -> DatabaseResult<Option<Activity>>;

    /// Write the mutable columns of an owned activity
    async fn update(&self, activity: &Activity) -> DatabaseResult<Option<Activity>>;

    /// Delete an owned activity; `DatabaseError::NotFound` when nothing matched
    async fn delete(&self, user_id: Uuid, activity_id: Uuid) -> DatabaseResult<()>;
}

/// Uploaded file metadata persistence
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Insert the record and return its id
    async fn record(&self, file: &NewFile) -> DatabaseResult<Uuid>;
}

/// Database reachability check used by the health endpoint
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn ping(&self) -> DatabaseResult<()>;
}

#[async_trait]
impl DatabaseProbe for PgPool {
    async fn ping(&self) -> DatabaseResult<()> {
        common::database::health_check(self).await.map(|_| ())
    }
}
