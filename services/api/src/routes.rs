//! API service routes

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::{
        CredentialsRequest,
        activity::{ActivityQuery, ActivityResponse, CreateActivityRequest, UpdateActivityRequest},
        file::{UploadResponse, UploadedFile},
        user::UpdateProfileRequest,
    },
    services::file::MAX_UPLOAD_BYTES,
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/user", get(get_user).patch(update_user))
        .route("/activity", post(create_activity).get(list_activities))
        .route(
            "/activity/:activity_id",
            get(get_activity)
                .patch(update_activity)
                .delete(delete_activity),
        )
        .route(
            "/file",
            // headroom for the multipart framing around the file itself
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let v1 = Router::new()
        .route("/healthz", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected_routes);

    Router::new()
        .nest("/v1", v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unwrap a JSON body, reporting malformed payloads as bad requests
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))
}

fn parse_activity_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidInput("invalid activity ID format".to_string()))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.health_service.check().await;
    let status = if report.is_up() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(report))
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.user_service.register(json_body(payload)?).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.user_service.login(json_body(payload)?).await?;

    Ok(Json(response))
}

/// Get the caller's profile
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.user_service.get(user.id).await?;

    Ok(Json(profile))
}

/// Partially update the caller's profile
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .user_service
        .update(user.id, json_body(payload)?)
        .await?;

    Ok(Json(profile))
}

/// Log a new activity
pub async fn create_activity(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateActivityRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let activity = state
        .activity_service
        .create(user.id, json_body(payload)?)
        .await?;

    Ok((StatusCode::CREATED, Json(ActivityResponse::from(activity))))
}

/// List the caller's activities
pub async fn list_activities(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter();
    let activities = state.activity_service.list(user.id, &filter).await?;

    let response: Vec<ActivityResponse> =
        activities.into_iter().map(ActivityResponse::from).collect();
    Ok(Json(response))
}

/// Get one of the caller's activities
pub async fn get_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let activity_id = parse_activity_id(&activity_id)?;
    let activity = state.activity_service.get(user.id, activity_id).await?;

    Ok(Json(ActivityResponse::from(activity)))
}

/// Partially update one of the caller's activities
pub async fn update_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<String>,
    payload: Result<Json<UpdateActivityRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let activity_id = parse_activity_id(&activity_id)?;
    let activity = state
        .activity_service
        .update(user.id, activity_id, json_body(payload)?)
        .await?;

    Ok(Json(ActivityResponse::from(activity)))
}

/// Delete one of the caller's activities
pub async fn delete_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let activity_id = parse_activity_id(&activity_id)?;
    state.activity_service.delete(user.id, activity_id).await?;

    Ok(Json(json!({"message": "deleted"})))
}

/// Upload a profile image from the multipart field `file`
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidInput(e.body_text()))?;

        upload = Some(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let file = upload.ok_or_else(|| ApiError::InvalidInput("File is required".to_string()))?;
    let uri = state.file_service.upload(user.id, file).await?;

    Ok(Json(UploadResponse { uri }))
}
