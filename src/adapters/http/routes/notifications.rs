use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::AppResult,
    use_cases::notification::CreateNotificationInput,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_notification))
        .route("/user/{user_id}", get(list_for_user))
        .route("/{notification_id}/read", patch(mark_read))
        .route("/{notification_id}", delete(delete_notification))
}

async fn create_notification(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateNotificationInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let notification = app_state
        .notification_use_cases
        .create(&actor, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn list_for_user(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let notifications = app_state
        .notification_use_cases
        .list_for_user(&actor, user_id)
        .await?;
    Ok(Json(notifications))
}

async fn mark_read(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let notification = app_state
        .notification_use_cases
        .mark_read(&actor, notification_id)
        .await?;
    Ok(Json(notification))
}

async fn delete_notification(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    app_state
        .notification_use_cases
        .delete(&actor, notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
