//! Activity repository for database operations

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use super::ActivityStore;
use crate::models::activity::{Activity, ActivityFilter};

const ACTIVITY_COLUMNS: &str = "id, user_id, activity_type, done_at, duration_in_minutes, \
     calories_burned, created_at, updated_at";

/// Activity repository
#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    /// Create a new activity repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn activity_from_row(row: &PgRow) -> DatabaseResult<Activity> {
    let activity_type: String = row.try_get("activity_type")?;

    Ok(Activity {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        activity_type: activity_type
            .parse()
            .map_err(|e| DatabaseError::Decode(format!("{}", e)))?,
        done_at: row.try_get("done_at")?,
        duration_in_minutes: row.try_get("duration_in_minutes")?,
        calories_burned: row.try_get("calories_burned")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Build the listing query for one user
///
/// Every filter value is bound; only fixed column names reach the SQL text.
pub(crate) fn list_query(user_id: Uuid, filter: &ActivityFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE user_id = "
    ));
    builder.push_bind(user_id);

    if let Some(activity_type) = filter.activity_type {
        builder
            .push(" AND activity_type = ")
            .push_bind(activity_type.as_str());
    }
    if let Some(from) = filter.done_at_from {
        builder.push(" AND done_at >= ").push_bind(from);
    }
    if let Some(to) = filter.done_at_to {
        builder.push(" AND done_at <= ").push_bind(to);
    }
    if let Some(min) = filter.calories_burned_min {
        builder.push(" AND calories_burned >= ").push_bind(min);
    }
    if let Some(max) = filter.calories_burned_max {
        builder.push(" AND calories_burned <= ").push_bind(max);
    }

    builder
        .push(" ORDER BY done_at DESC LIMIT ")
        .push_bind(filter.effective_limit())
        .push(" OFFSET ")
        .push_bind(filter.effective_offset());

    builder
}

#[async_trait]
impl ActivityStore for ActivityRepository {
    async fn create(&self, activity: &Activity) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, user_id, activity_type, done_at, duration_in_minutes,
                                    calories_burned, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(activity.id)
        .bind(activity.user_id)
        .bind(activity.activity_type.as_str())
        .bind(activity.done_at)
        .bind(activity.duration_in_minutes)
        .bind(activity.calories_burned)
        .bind(activity.created_at)
        .bind(activity.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &ActivityFilter,
    ) -> DatabaseResult<Vec<Activity>> {
        let rows = list_query(user_id, filter)
            .build()
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(activity_from_row).collect()
    }

    async fn find_owned(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
    ) -> DatabaseResult<Option<Activity>> {
        let row = sqlx::query(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = $1 AND user_id = $2"
        ))
        .bind(activity_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(activity_from_row).transpose()
    }

    async fn update(&self, activity: &Activity) -> DatabaseResult<Option<Activity>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE activities
            SET activity_type = $3, done_at = $4, duration_in_minutes = $5,
                calories_burned = $6, updated_at = $7
            WHERE id = $1 AND user_id = $2
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(activity.id)
        .bind(activity.user_id)
        .bind(activity.activity_type.as_str())
        .bind(activity.done_at)
        .bind(activity.duration_in_minutes)
        .bind(activity.calories_burned)
        .bind(activity.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(activity_from_row).transpose()
    }

    async fn delete(&self, user_id: Uuid, activity_id: Uuid) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM activities WHERE id = $1 AND user_id = $2")
            .bind(activity_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }

        Ok(())
    }
}
