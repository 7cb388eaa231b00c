use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::AppResult,
    domain::entities::{
        billing_cycle::BillingCycle,
        plan::{Plan, PlanCategory, PlanStatus, PlanVisibility},
    },
    use_cases::plan::{CreatePlanInput, PlanListFilters, UpdatePlanInput},
};

#[derive(Serialize)]
struct CyclePrices {
    monthly: i64,
    quarterly: i64,
    yearly: i64,
}

#[derive(Serialize)]
struct PlanResponse {
    #[serde(flatten)]
    plan: Plan,
    prices: CyclePrices,
    quarterly_savings: i64,
    yearly_savings: i64,
    feature_count: usize,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        Self {
            prices: CyclePrices {
                monthly: plan.price_for_cycle(BillingCycle::Monthly),
                quarterly: plan.price_for_cycle(BillingCycle::Quarterly),
                yearly: plan.price_for_cycle(BillingCycle::Yearly),
            },
            quarterly_savings: plan.quarterly_savings(),
            yearly_savings: plan.yearly_savings(),
            feature_count: plan.feature_count(),
            plan,
        }
    }
}

#[derive(Deserialize)]
struct PlanListQuery {
    category: Option<PlanCategory>,
    status: Option<PlanStatus>,
    visibility: Option<PlanVisibility>,
    min_price: Option<i64>,
    max_price: Option<i64>,
    cycle: Option<BillingCycle>,
}

#[derive(Deserialize)]
struct PriceRangeQuery {
    min_price: Option<i64>,
    max_price: Option<i64>,
    cycle: Option<BillingCycle>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_public_plans).post(create_plan))
        .route("/all", get(list_all_plans))
        .route(
            "/{plan_id}",
            get(get_plan).patch(update_plan).delete(delete_plan),
        )
}

fn to_response(plans: Vec<Plan>) -> Json<Vec<PlanResponse>> {
    Json(plans.into_iter().map(PlanResponse::from).collect())
}

async fn list_public_plans(
    State(app_state): State<AppState>,
    Query(query): Query<PriceRangeQuery>,
) -> AppResult<impl IntoResponse> {
    let plans = if query.min_price.is_some() || query.max_price.is_some() {
        app_state
            .plan_use_cases
            .list_by_price_range(
                query.min_price,
                query.max_price,
                query.cycle.unwrap_or(BillingCycle::Monthly),
            )
            .await?
    } else {
        app_state.plan_use_cases.list_public().await?
    };
    Ok(to_response(plans))
}

async fn list_all_plans(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PlanListQuery>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let filters = PlanListFilters {
        category: query.category,
        status: query.status,
        visibility: query.visibility,
        min_price_cents: query.min_price,
        max_price_cents: query.max_price,
        price_cycle: query.cycle,
    };
    let plans = app_state.plan_use_cases.list(&actor, filters).await?;
    Ok(to_response(plans))
}

async fn get_plan(
    State(app_state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state.plan_use_cases.get(plan_id).await?;
    Ok(Json(PlanResponse::from(plan)))
}

async fn create_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let plan = app_state.plan_use_cases.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(PlanResponse::from(plan))))
}

async fn update_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<Uuid>,
    Json(payload): Json<UpdatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    let plan = app_state
        .plan_use_cases
        .update(&actor, plan_id, payload)
        .await?;
    Ok(Json(PlanResponse::from(plan)))
}

async fn delete_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_user(&headers, &app_state)?;
    app_state.plan_use_cases.delete(&actor, plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
