use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::AppResult,
    domain::entities::subscription::{CancelReason, Subscription, SubscriptionStatus},
    use_cases::subscription::{CreateSubscriptionInput, UpdateSubscriptionInput},
};

/// A subscription together with the values derived from it at response time.
#[derive(Serialize)]
struct SubscriptionResponse {
    #[serde(flatten)]
    subscription: Subscription,
    effective_price_cents: i64,
    remaining_days: i64,
    duration_days: i64,
    is_in_trial: bool,
    is_current: bool,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(subscription: Subscription) -> Self {
        let now = Utc::now();
        Self {
            effective_price_cents: subscription.effective_price_cents(),
            remaining_days: subscription.remaining_days(now),
            duration_days: subscription.duration_days(),
            is_in_trial: subscription.is_in_trial(now),
            is_current: subscription.is_current(now),
            subscription,
        }
    }
}

fn to_response(subscriptions: Vec<Subscription>) -> Json<Vec<SubscriptionResponse>> {
    Json(
        subscriptions
            .into_iter()
            .map(SubscriptionResponse::from)
            .collect(),
    )
}

#[derive(Deserialize)]
struct ListQuery {
    status: Option<SubscriptionStatus>,
}

#[derive(Deserialize)]
struct ExpiringQuery {
    days: Option<i64>,
}

#[derive(Deserialize)]
struct RenewPayload {
    #[serde(default = "one_cycle")]
    cycles: u32,
}

fn one_cycle() -> u32 {
    1
}

#[derive(Deserialize, Default)]
struct CancelPayload {
    reason: Option<CancelReason>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscriptions).post(create_subscription))
        .route("/expiring", get(list_expiring))
        .route("/change-plan", post(change_plan))
        .route("/user/{user_id}", get(list_for_user))
        .route("/user/{user_id}/active", get(get_active_for_user))
        .route(
            "/{subscription_id}",
            get(get_subscription).patch(update_subscription),
        )
        .route("/{subscription_id}/renew", post(renew_subscription))
        .route("/{subscription_id}/cancel", post(cancel_subscription))
}

async fn create_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateSubscriptionInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let subscription = app_state
        .subscription_use_cases
        .create(&actor, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::from(subscription)),
    ))
}

async fn list_subscriptions(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let subscriptions = app_state
        .subscription_use_cases
        .list(&actor, query.status)
        .await?;
    Ok(to_response(subscriptions))
}

async fn list_expiring(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ExpiringQuery>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let days = query.days.unwrap_or(app_state.config.expiring_window_days);
    let subscriptions = app_state
        .subscription_use_cases
        .list_expiring(&actor, days)
        .await?;
    Ok(to_response(subscriptions))
}

async fn list_for_user(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let subscriptions = app_state
        .subscription_use_cases
        .list_for_user(&actor, user_id)
        .await?;
    Ok(to_response(subscriptions))
}

async fn get_active_for_user(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let subscription = app_state
        .subscription_use_cases
        .get_active_for_user(&actor, user_id)
        .await?;
    Ok(Json(subscription.map(SubscriptionResponse::from)))
}

async fn get_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(subscription_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let subscription = app_state
        .subscription_use_cases
        .get(&actor, subscription_id)
        .await?;
    Ok(Json(SubscriptionResponse::from(subscription)))
}

async fn update_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let subscription = app_state
        .subscription_use_cases
        .update(&actor, subscription_id, payload)
        .await?;
    Ok(Json(SubscriptionResponse::from(subscription)))
}

async fn renew_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<RenewPayload>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let subscription = app_state
        .subscription_use_cases
        .renew(&actor, subscription_id, payload.cycles)
        .await?;
    Ok(Json(SubscriptionResponse::from(subscription)))
}

async fn cancel_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(subscription_id): Path<Uuid>,
    payload: Option<Json<CancelPayload>>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let Json(payload) = payload.unwrap_or_default();
    let subscription = app_state
        .subscription_use_cases
        .cancel(&actor, subscription_id, payload.reason)
        .await?;
    Ok(Json(SubscriptionResponse::from(subscription)))
}

async fn change_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateSubscriptionInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let subscription = app_state
        .subscription_use_cases
        .change_plan(&actor, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::from(subscription)),
    ))
}
