use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, auth::current_user, routes::users::UserProfile},
    app_error::AppResult,
    use_cases::user::{AuthSession, RegisterInput},
};

#[derive(Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    token: String,
    token_type: &'static str,
    user: UserProfile,
}

impl From<AuthSession> for SessionResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            token_type: "Bearer",
            user: session.user.into(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> AppResult<impl IntoResponse> {
    let session = app_state.user_use_cases.register(payload).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<impl IntoResponse> {
    let session = app_state
        .user_use_cases
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(SessionResponse::from(session)))
}

async fn me(State(app_state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let user = app_state.user_use_cases.get(&actor, actor.user_id).await?;
    Ok(Json(UserProfile::from(user)))
}
