//! API models for request and response payloads

use serde::{Deserialize, Serialize};

pub mod activity;
pub mod file;
pub mod user;

/// Request for user registration and login
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response for registration and login
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResponse {
    pub email: String,
    pub token: String,
}
