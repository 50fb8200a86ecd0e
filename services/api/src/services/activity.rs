//! Activity logging with calorie computation and read-through caching
//!
//! Cache layout, all keyed with the user id as the leading component so a
//! single prefix pattern drops every list of one user:
//!
//! - `activity:<activity id>`: one activity, 1 hour
//! - `user_activities:<user id><filter suffix>`: one filtered page, 30 minutes
//! - `user_exists:<user id>`: positive existence flag, 5 minutes

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::{CacheLayer, within_deadline};
use crate::{
    error::{ApiError, ApiResult},
    models::activity::{
        Activity, ActivityFilter, ActivityType, CreateActivityRequest, MAX_DURATION_MINUTES,
        UpdateActivityRequest,
    },
    repositories::{ActivityStore, UserStore},
};

const USER_EXISTS_TTL: Duration = Duration::from_secs(5 * 60);
const ACTIVITY_TTL: Duration = Duration::from_secs(60 * 60);
const ACTIVITY_LIST_TTL: Duration = Duration::from_secs(30 * 60);

pub fn activity_key(activity_id: Uuid) -> String {
    format!("activity:{}", activity_id)
}

pub fn user_exists_key(user_id: Uuid) -> String {
    format!("user_exists:{}", user_id)
}

/// Cache key for one filtered listing
///
/// Only the fields that are set contribute, in a fixed order and each tagged
/// with its name, so two different filters never share a key.
pub fn activity_list_key(user_id: Uuid, filter: &ActivityFilter) -> String {
    let mut key = format!("user_activities:{}", user_id);

    if let Some(activity_type) = filter.activity_type {
        key.push_str(&format!("_type_{}", activity_type));
    }
    if let Some(from) = filter.done_at_from {
        key.push_str(&format!("_from_{}", from.to_rfc3339()));
    }
    if let Some(to) = filter.done_at_to {
        key.push_str(&format!("_to_{}", to.to_rfc3339()));
    }
    if let Some(min) = filter.calories_burned_min {
        key.push_str(&format!("_cal_min_{}", min));
    }
    if let Some(max) = filter.calories_burned_max {
        key.push_str(&format!("_cal_max_{}", max));
    }
    if let Some(limit) = filter.limit {
        key.push_str(&format!("_limit_{}", limit));
    }
    if let Some(offset) = filter.offset {
        key.push_str(&format!("_offset_{}", offset));
    }

    key
}

/// Pattern matching every cached listing of `user_id`
pub fn activity_list_pattern(user_id: Uuid) -> String {
    format!("user_activities:{}*", user_id)
}

fn parse_activity_type(raw: &str) -> ApiResult<ActivityType> {
    raw.parse::<ActivityType>()
        .map_err(|e| ApiError::InvalidActivityType(e.0))
}

// Postgres keeps microseconds; truncating up front keeps cached copies equal
// to what the store hands back.
fn parse_done_at(raw: &str) -> ApiResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(6))
        .map_err(|_| ApiError::InvalidInput("doneAt must be an ISO 8601 date".to_string()))
}

fn validate_duration(duration_in_minutes: i32) -> ApiResult<()> {
    if duration_in_minutes < 1 {
        return Err(ApiError::InvalidInput(
            "durationInMinutes must be at least 1".to_string(),
        ));
    }
    if duration_in_minutes > MAX_DURATION_MINUTES {
        return Err(ApiError::InvalidInput(format!(
            "durationInMinutes must be at most {}",
            MAX_DURATION_MINUTES
        )));
    }
    Ok(())
}

fn activity_not_found() -> ApiError {
    ApiError::NotFound("activity not found".to_string())
}

/// Activity operations on behalf of an authenticated user
#[derive(Clone)]
pub struct ActivityService {
    activities: Arc<dyn ActivityStore>,
    users: Arc<dyn UserStore>,
    cache: CacheLayer,
    deadline: Duration,
}

impl ActivityService {
    pub fn new(
        activities: Arc<dyn ActivityStore>,
        users: Arc<dyn UserStore>,
        cache: CacheLayer,
        deadline: Duration,
    ) -> Self {
        Self {
            activities,
            users,
            cache,
            deadline,
        }
    }

    /// Fail with `Unauthorized` unless `user_id` names an existing user
    async fn ensure_user_exists(&self, user_id: Uuid) -> ApiResult<()> {
        let key = user_exists_key(user_id);
        if self.cache.fetch::<bool>(&key).await == Some(true) {
            return Ok(());
        }

        let exists = within_deadline(self.deadline, self.users.exists(user_id)).await?;
        if !exists {
            warn!(%user_id, "Activity request for unknown user");
            return Err(ApiError::Unauthorized);
        }

        self.cache.store(&key, &true, USER_EXISTS_TTL).await;
        Ok(())
    }

    /// Log a new activity; calories are always computed here
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreateActivityRequest,
    ) -> ApiResult<Activity> {
        self.ensure_user_exists(user_id).await?;

        validate_duration(request.duration_in_minutes)?;
        let done_at = parse_done_at(&request.done_at)?;
        let activity_type = parse_activity_type(&request.activity_type)?;

        let now = Utc::now().trunc_subsecs(6);
        let activity = Activity {
            id: Uuid::new_v4(),
            user_id,
            activity_type,
            done_at,
            duration_in_minutes: request.duration_in_minutes,
            calories_burned: activity_type.calories_for(request.duration_in_minutes),
            created_at: now,
            updated_at: now,
        };

        within_deadline(self.deadline, self.activities.create(&activity)).await?;
        info!(activity_id = %activity.id, %user_id, "Created activity");

        self.cache
            .store(&activity_key(activity.id), &activity, ACTIVITY_TTL)
            .await;
        self.cache
            .evict_pattern(&activity_list_pattern(user_id))
            .await;

        Ok(activity)
    }

    /// Activities of `user_id` matching `filter`, newest first
    pub async fn list(&self, user_id: Uuid, filter: &ActivityFilter) -> ApiResult<Vec<Activity>> {
        let key = activity_list_key(user_id, filter);
        if let Some(cached) = self.cache.fetch::<Vec<Activity>>(&key).await {
            return Ok(cached);
        }

        let activities = within_deadline(
            self.deadline,
            self.activities.list_for_user(user_id, filter),
        )
        .await?;

        self.cache
            .store(&key, activities.as_slice(), ACTIVITY_LIST_TTL)
            .await;
        Ok(activities)
    }

    /// One activity owned by `user_id`; absent and foreign look the same
    pub async fn get(&self, user_id: Uuid, activity_id: Uuid) -> ApiResult<Activity> {
        let key = activity_key(activity_id);
        if let Some(cached) = self.cache.fetch::<Activity>(&key).await {
            if cached.user_id == user_id {
                return Ok(cached);
            }
            return Err(activity_not_found());
        }

        let activity = within_deadline(
            self.deadline,
            self.activities.find_owned(user_id, activity_id),
        )
        .await?
        .ok_or_else(activity_not_found)?;

        self.cache.store(&key, &activity, ACTIVITY_TTL).await;
        Ok(activity)
    }

    /// Apply the fields present in `request` and recompute calories
    pub async fn update(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
        request: UpdateActivityRequest,
    ) -> ApiResult<Activity> {
        self.ensure_user_exists(user_id).await?;

        let key = activity_key(activity_id);
        let mut activity = match self.cache.fetch::<Activity>(&key).await {
            Some(cached) if cached.user_id == user_id => cached,
            Some(_) => return Err(ApiError::Forbidden),
            None => within_deadline(
                self.deadline,
                self.activities.find_owned(user_id, activity_id),
            )
            .await?
            .ok_or(ApiError::Forbidden)?,
        };

        if let Some(raw) = request.activity_type.as_deref() {
            activity.activity_type = parse_activity_type(raw)?;
        }
        if let Some(raw) = request.done_at.as_deref() {
            activity.done_at = parse_done_at(raw)?;
        }
        if let Some(duration) = request.duration_in_minutes {
            validate_duration(duration)?;
            activity.duration_in_minutes = duration;
        }
        activity.calories_burned = activity
            .activity_type
            .calories_for(activity.duration_in_minutes);
        activity.updated_at = Utc::now().trunc_subsecs(6);

        // A cached copy may outlive the row; the scoped write settles it
        let updated = within_deadline(self.deadline, self.activities.update(&activity))
            .await?
            .ok_or(ApiError::Forbidden)?;
        info!(%activity_id, %user_id, "Updated activity");

        self.cache.store(&key, &updated, ACTIVITY_TTL).await;
        self.cache
            .evict_pattern(&activity_list_pattern(user_id))
            .await;

        Ok(updated)
    }

    /// Delete an owned activity
    pub async fn delete(&self, user_id: Uuid, activity_id: Uuid) -> ApiResult<()> {
        within_deadline(self.deadline, self.activities.delete(user_id, activity_id))
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => activity_not_found(),
                other => other,
            })?;
        info!(%activity_id, %user_id, "Deleted activity");

        self.cache.evict(&activity_key(activity_id)).await;
        self.cache
            .evict_pattern(&activity_list_pattern(user_id))
            .await;

        Ok(())
    }
}
