use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::AppResult,
    domain::entities::user::{User, UserRole, UserStatus},
};

/// A user as exposed over HTTP; never carries the password hash.
#[derive(Serialize)]
pub struct UserProfile {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    status: UserStatus,
    role: UserRole,
    email_verified: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            status: user.status,
            role: user.role,
            email_verified: user.email_verified,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize)]
struct SetStatusPayload {
    status: UserStatus,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{user_id}", get(get_user).delete(delete_user))
        .route("/{user_id}/status", patch(set_status))
}

async fn list_users(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let users = app_state.user_use_cases.list(&actor).await?;
    let body: Vec<UserProfile> = users.into_iter().map(UserProfile::from).collect();
    Ok(Json(body))
}

async fn get_user(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let user = app_state.user_use_cases.get(&actor, user_id).await?;
    Ok(Json(UserProfile::from(user)))
}

async fn set_status(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetStatusPayload>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let user = app_state
        .user_use_cases
        .set_status(&actor, user_id, payload.status)
        .await?;
    Ok(Json(UserProfile::from(user)))
}

async fn delete_user(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    app_state.user_use_cases.delete(&actor, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
