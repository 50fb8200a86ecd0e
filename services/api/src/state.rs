//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    jwt::TokenIssuer,
    services::{ActivityService, FileService, HealthService, UserService},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub activity_service: ActivityService,
    pub file_service: FileService,
    pub health_service: HealthService,
    pub tokens: Arc<dyn TokenIssuer>,
}
