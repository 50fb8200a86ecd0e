//! User and profile models for the API service

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Training preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Preference {
    Cardio,
    Weight,
}

impl Preference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::Cardio => "CARDIO",
            Preference::Weight => "WEIGHT",
        }
    }
}

impl FromStr for Preference {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CARDIO" => Ok(Preference::Cardio),
            "WEIGHT" => Ok(Preference::Weight),
            _ => Err(()),
        }
    }
}

/// Unit the user's weight is recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeightUnit {
    Kg,
    Lbs,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "KG",
            WeightUnit::Lbs => "LBS",
        }
    }
}

impl FromStr for WeightUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "KG" => Ok(WeightUnit::Kg),
            "LBS" => Ok(WeightUnit::Lbs),
            _ => Err(()),
        }
    }
}

/// Unit the user's height is recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeightUnit {
    Cm,
    Inch,
}

impl HeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeightUnit::Cm => "CM",
            HeightUnit::Inch => "INCH",
        }
    }
}

impl FromStr for HeightUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CM" => Ok(HeightUnit::Cm),
            "INCH" => Ok(HeightUnit::Inch),
            _ => Err(()),
        }
    }
}

/// User entity
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub preference: Option<Preference>,
    pub weight_unit: Option<WeightUnit>,
    pub height_unit: Option<HeightUnit>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user creation payload, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

/// Public profile projection, also the shape stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: String,
    pub preference: Option<Preference>,
    pub weight_unit: Option<WeightUnit>,
    pub height_unit: Option<HeightUnit>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub image_uri: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            preference: user.preference,
            weight_unit: user.weight_unit,
            height_unit: user.height_unit,
            weight: user.weight,
            height: user.height,
            image_uri: user.image_uri,
        }
    }
}

/// Request for `PATCH /v1/user`
///
/// Enumerated fields arrive as strings so validation can name the offending
/// field. Unset or empty fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub preference: Option<String>,
    pub weight_unit: Option<String>,
    pub height_unit: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub name: Option<String>,
    pub image_uri: Option<String>,
}

/// Complete set of profile columns to write
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub preference: Option<Preference>,
    pub weight_unit: Option<WeightUnit>,
    pub height_unit: Option<HeightUnit>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub image_uri: Option<String>,
}
