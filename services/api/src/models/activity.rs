//! Activity models for the API service

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default page size for activity listings
pub const DEFAULT_LIMIT: i64 = 5;

/// Longest single activity accepted, one week
pub const MAX_DURATION_MINUTES: i32 = 7 * 24 * 60;

/// Supported activity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Walking,
    Yoga,
    Stretching,
    Cycling,
    Swimming,
    Dancing,
    Hiking,
    Running,
    #[serde(rename = "HIIT")]
    Hiit,
    JumpRope,
}

/// Returned when a string names no known activity type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown activity type: {0}")]
pub struct UnknownActivityType(pub String);

impl ActivityType {
    pub const ALL: [ActivityType; 10] = [
        ActivityType::Walking,
        ActivityType::Yoga,
        ActivityType::Stretching,
        ActivityType::Cycling,
        ActivityType::Swimming,
        ActivityType::Dancing,
        ActivityType::Hiking,
        ActivityType::Running,
        ActivityType::Hiit,
        ActivityType::JumpRope,
    ];

    /// Wire and storage name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Walking => "Walking",
            ActivityType::Yoga => "Yoga",
            ActivityType::Stretching => "Stretching",
            ActivityType::Cycling => "Cycling",
            ActivityType::Swimming => "Swimming",
            ActivityType::Dancing => "Dancing",
            ActivityType::Hiking => "Hiking",
            ActivityType::Running => "Running",
            ActivityType::Hiit => "HIIT",
            ActivityType::JumpRope => "JumpRope",
        }
    }

    /// Calories burned per minute of this activity
    pub fn calories_per_minute(&self) -> i32 {
        match self {
            ActivityType::Walking | ActivityType::Yoga | ActivityType::Stretching => 4,
            ActivityType::Cycling | ActivityType::Swimming | ActivityType::Dancing => 8,
            ActivityType::Hiking
            | ActivityType::Running
            | ActivityType::Hiit
            | ActivityType::JumpRope => 10,
        }
    }

    /// Calories burned over `duration_in_minutes`
    ///
    /// Durations are bounded by [`MAX_DURATION_MINUTES`] before they get here.
    pub fn calories_for(&self, duration_in_minutes: i32) -> i32 {
        self.calories_per_minute() * duration_in_minutes
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = UnknownActivityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownActivityType(s.to_string()))
    }
}

/// Activity entity, also the shape stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "activityId")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_type: ActivityType,
    pub done_at: DateTime<Utc>,
    pub duration_in_minutes: i32,
    pub calories_burned: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for logging a new activity
///
/// `activity_type` and `done_at` stay strings so the service can report
/// precise validation errors.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    pub activity_type: String,
    pub done_at: String,
    pub duration_in_minutes: i32,
}

/// Partial activity update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivityRequest {
    pub activity_type: Option<String>,
    pub done_at: Option<String>,
    pub duration_in_minutes: Option<i32>,
}

/// Validated filter for activity listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityFilter {
    pub activity_type: Option<ActivityType>,
    pub done_at_from: Option<DateTime<Utc>>,
    pub done_at_to: Option<DateTime<Utc>>,
    pub calories_burned_min: Option<i32>,
    pub calories_burned_max: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ActivityFilter {
    /// Page size actually applied to the query
    pub fn effective_limit(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT)
    }

    /// Offset actually applied to the query
    pub fn effective_offset(&self) -> i64 {
        self.offset.filter(|o| *o >= 0).unwrap_or(0)
    }
}

/// Raw query parameters for `GET /v1/activity`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub activity_type: Option<String>,
    pub done_at_from: Option<String>,
    pub done_at_to: Option<String>,
    pub calories_burned_min: Option<String>,
    pub calories_burned_max: Option<String>,
}

impl ActivityQuery {
    /// Convert into a filter, silently dropping values that do not parse
    pub fn into_filter(self) -> ActivityFilter {
        fn timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
            raw.and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
                .map(|dt| dt.with_timezone(&Utc))
        }

        ActivityFilter {
            activity_type: self.activity_type.and_then(|v| v.parse().ok()),
            done_at_from: timestamp(self.done_at_from),
            done_at_to: timestamp(self.done_at_to),
            calories_burned_min: self.calories_burned_min.and_then(|v| v.parse().ok()),
            calories_burned_max: self.calories_burned_max.and_then(|v| v.parse().ok()),
            limit: self
                .limit
                .and_then(|v| v.parse().ok())
                .filter(|l: &i64| *l > 0),
            offset: self
                .offset
                .and_then(|v| v.parse().ok())
                .filter(|o: &i64| *o >= 0),
        }
    }
}

/// Activity as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub activity_id: Uuid,
    pub activity_type: ActivityType,
    pub done_at: String,
    pub duration_in_minutes: i32,
    pub calories_burned: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        Self {
            activity_id: activity.id,
            activity_type: activity.activity_type,
            done_at: activity.done_at.to_rfc3339(),
            duration_in_minutes: activity.duration_in_minutes,
            calories_burned: activity.calories_burned,
            created_at: activity.created_at.to_rfc3339(),
            updated_at: activity.updated_at.to_rfc3339(),
        }
    }
}
