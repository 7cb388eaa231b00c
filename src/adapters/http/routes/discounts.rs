use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::AppResult,
    use_cases::discount::{CreateDiscountInput, UpdateDiscountInput},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_discounts).post(create_discount))
        .route(
            "/{discount_id}",
            get(get_discount)
                .patch(update_discount)
                .delete(delete_discount),
        )
}

async fn list_discounts(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let discounts = app_state.discount_use_cases.list(&actor).await?;
    Ok(Json(discounts))
}

async fn get_discount(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(discount_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let discount = app_state.discount_use_cases.get(&actor, discount_id).await?;
    Ok(Json(discount))
}

async fn create_discount(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateDiscountInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let discount = app_state.discount_use_cases.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(discount)))
}

async fn update_discount(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(discount_id): Path<Uuid>,
    Json(payload): Json<UpdateDiscountInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let discount = app_state
        .discount_use_cases
        .update(&actor, discount_id, payload)
        .await?;
    Ok(Json(discount))
}

async fn delete_discount(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(discount_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    app_state
        .discount_use_cases
        .delete(&actor, discount_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
