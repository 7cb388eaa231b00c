use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/summary", get(summary))
}

async fn summary(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let summary = app_state.analytics_use_cases.summary(&actor).await?;
    Ok(Json(summary))
}
