use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        actor::Actor,
        use_cases::subscription::SubscriptionRepo,
        validators::{
            MAX_TRIAL_DURATION, is_valid_currency, is_valid_plan_code, is_within_length,
        },
    },
    domain::entities::{
        billing_cycle::BillingCycle,
        plan::{
            Plan, PlanCategory, PlanFeature, PlanPricing, PlanStatus, PlanTrial, PlanVisibility,
            ProductType,
        },
    },
};

#[derive(Debug, Clone, Default)]
pub struct PlanListFilters {
    pub category: Option<PlanCategory>,
    pub status: Option<PlanStatus>,
    pub visibility: Option<PlanVisibility>,
    /// Inclusive bounds on the price billed for `price_cycle`.
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    /// Cycle the price bounds apply to; monthly when unset.
    pub price_cycle: Option<BillingCycle>,
}

impl PlanListFilters {
    pub fn matches_price(&self, plan: &Plan) -> bool {
        let price = plan.price_for_cycle(self.price_cycle.unwrap_or(BillingCycle::Monthly));
        self.min_price_cents.is_none_or(|min| price >= min)
            && self.max_price_cents.is_none_or(|max| price <= max)
    }
}

#[async_trait]
pub trait PlanRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>>;
    async fn get_by_code(&self, code: &str) -> AppResult<Option<Plan>>;
    /// Ordered by sort order, then monthly price.
    async fn list(&self, filters: &PlanListFilters) -> AppResult<Vec<Plan>>;
    async fn insert(&self, plan: &Plan) -> AppResult<Plan>;
    async fn update(&self, plan: &Plan) -> AppResult<Plan>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanInput {
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: PlanCategory,
    pub product_type: ProductType,
    #[serde(default)]
    pub data_quota_gb: Option<i64>,
    #[serde(default)]
    pub speed: Option<String>,
    pub pricing: PlanPricing,
    #[serde(default)]
    pub features: Vec<PlanFeature>,
    #[serde(default)]
    pub status: Option<PlanStatus>,
    #[serde(default)]
    pub visibility: Option<PlanVisibility>,
    #[serde(default)]
    pub trial: Option<PlanTrial>,
    #[serde(default)]
    pub setup_fee_cents: i64,
    #[serde(default)]
    pub sort_order: i32,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlanInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<PlanCategory>,
    pub product_type: Option<ProductType>,
    pub data_quota_gb: Option<i64>,
    pub speed: Option<String>,
    pub pricing: Option<PlanPricing>,
    pub features: Option<Vec<PlanFeature>>,
    pub status: Option<PlanStatus>,
    pub visibility: Option<PlanVisibility>,
    pub trial: Option<PlanTrial>,
    pub setup_fee_cents: Option<i64>,
    pub sort_order: Option<i32>,
}

#[derive(Clone)]
pub struct PlanUseCases {
    plans: Arc<dyn PlanRepo>,
    subscriptions: Arc<dyn SubscriptionRepo>,
}

impl PlanUseCases {
    pub fn new(plans: Arc<dyn PlanRepo>, subscriptions: Arc<dyn SubscriptionRepo>) -> Self {
        Self {
            plans,
            subscriptions,
        }
    }

    /// Plans offered to customers: active and public.
    #[instrument(skip(self))]
    pub async fn list_public(&self) -> AppResult<Vec<Plan>> {
        self.plans
            .list(&PlanListFilters {
                status: Some(PlanStatus::Active),
                visibility: Some(PlanVisibility::Public),
                ..Default::default()
            })
            .await
    }

    /// Public plans whose price for `cycle` lies within `[min, max]`, cheapest first.
    #[instrument(skip(self))]
    pub async fn list_by_price_range(
        &self,
        min_cents: Option<i64>,
        max_cents: Option<i64>,
        cycle: BillingCycle,
    ) -> AppResult<Vec<Plan>> {
        if min_cents.is_some_and(|m| m < 0) || max_cents.is_some_and(|m| m < 0) {
            return Err(AppError::InvalidInput("Prices cannot be negative".into()));
        }
        if let (Some(min), Some(max)) = (min_cents, max_cents)
            && min > max
        {
            return Err(AppError::InvalidInput(
                "Minimum price cannot exceed maximum price".into(),
            ));
        }

        let mut plans = self
            .plans
            .list(&PlanListFilters {
                status: Some(PlanStatus::Active),
                visibility: Some(PlanVisibility::Public),
                min_price_cents: min_cents,
                max_price_cents: max_cents,
                price_cycle: Some(cycle),
                ..Default::default()
            })
            .await?;
        plans.sort_by_key(|p| p.price_for_cycle(cycle));
        Ok(plans)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, actor: &Actor, filters: PlanListFilters) -> AppResult<Vec<Plan>> {
        actor.require_admin()?;
        self.plans.list(&filters).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> AppResult<Plan> {
        self.plans.get_by_id(id).await?.ok_or(AppError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn create(&self, actor: &Actor, input: CreatePlanInput) -> AppResult<Plan> {
        actor.require_admin()?;

        let code = input.code.trim().to_lowercase();
        if !is_valid_plan_code(&code) {
            return Err(AppError::InvalidInput(
                "Plan code may only contain lowercase letters, numbers, hyphens and underscores"
                    .into(),
            ));
        }
        if self.plans.get_by_code(&code).await?.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Plan code '{}' is already in use",
                code
            )));
        }

        let mut plan = Plan {
            id: Uuid::new_v4(),
            code,
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            category: input.category,
            product_type: input.product_type,
            data_quota_gb: input.data_quota_gb,
            speed: input.speed,
            pricing: input.pricing,
            features: input.features,
            status: input.status.unwrap_or(PlanStatus::Active),
            visibility: input.visibility.unwrap_or(PlanVisibility::Public),
            trial: input.trial.unwrap_or_default(),
            setup_fee_cents: input.setup_fee_cents,
            sort_order: input.sort_order,
            created_at: None,
            updated_at: None,
        };
        prepare(&mut plan)?;

        let created = self.plans.insert(&plan).await?;
        tracing::info!(plan_id = %created.id, code = %created.code, "Plan created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdatePlanInput) -> AppResult<Plan> {
        actor.require_admin()?;
        let mut plan = self.get(id).await?;

        if let Some(name) = input.name {
            plan.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            plan.description = description.trim().to_string();
        }
        if let Some(category) = input.category {
            plan.category = category;
        }
        if let Some(product_type) = input.product_type {
            plan.product_type = product_type;
        }
        if input.data_quota_gb.is_some() {
            plan.data_quota_gb = input.data_quota_gb;
        }
        if input.speed.is_some() {
            plan.speed = input.speed;
        }
        if let Some(pricing) = input.pricing {
            plan.pricing = pricing;
        }
        if let Some(features) = input.features {
            plan.features = features;
        }
        if let Some(status) = input.status {
            plan.status = status;
        }
        if let Some(visibility) = input.visibility {
            plan.visibility = visibility;
        }
        if let Some(trial) = input.trial {
            plan.trial = trial;
        }
        if let Some(fee) = input.setup_fee_cents {
            plan.setup_fee_cents = fee;
        }
        if let Some(sort_order) = input.sort_order {
            plan.sort_order = sort_order;
        }
        prepare(&mut plan)?;

        self.plans.update(&plan).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;

        let in_use = self.subscriptions.count_active_by_plan(id).await?;
        if in_use > 0 {
            return Err(AppError::InvalidInput(format!(
                "Plan has {} active subscription(s) and cannot be deleted",
                in_use
            )));
        }
        if !self.plans.delete(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(plan_id = %id, "Plan deleted");
        Ok(())
    }
}

/// Validate a plan and derive its discounted cycle prices.
fn prepare(plan: &mut Plan) -> AppResult<()> {
    if !is_within_length(&plan.name, 1, 100) {
        return Err(AppError::InvalidInput(
            "Plan name must be between 1 and 100 characters".into(),
        ));
    }
    if !is_within_length(&plan.description, 1, 500) {
        return Err(AppError::InvalidInput(
            "Plan description must be between 1 and 500 characters".into(),
        ));
    }

    let pricing = &mut plan.pricing;
    pricing.currency = pricing.currency.trim().to_uppercase();
    if !is_valid_currency(&pricing.currency) {
        return Err(AppError::InvalidInput(
            "Currency must be a 3-letter code (e.g., USD, EUR)".into(),
        ));
    }
    if pricing.monthly_cents < 0
        || pricing.quarterly_cents.is_some_and(|c| c < 0)
        || pricing.yearly_cents.is_some_and(|c| c < 0)
    {
        return Err(AppError::InvalidInput("Prices cannot be negative".into()));
    }
    for pct in [pricing.quarterly_discount_pct, pricing.yearly_discount_pct]
        .into_iter()
        .flatten()
    {
        if pct > 100 {
            return Err(AppError::InvalidInput(
                "Discount percentage cannot exceed 100".into(),
            ));
        }
    }
    pricing.apply_cycle_discounts();

    if plan.trial.available && !(1..=MAX_TRIAL_DURATION).contains(&plan.trial.duration) {
        return Err(AppError::InvalidInput(format!(
            "Trial duration must be between 1 and {}",
            MAX_TRIAL_DURATION
        )));
    }
    if plan.setup_fee_cents < 0 {
        return Err(AppError::InvalidInput("Setup fee cannot be negative".into()));
    }
    if plan.data_quota_gb.is_some_and(|q| q < 0) {
        return Err(AppError::InvalidInput("Data quota cannot be negative".into()));
    }
    if plan.features.iter().any(|f| f.name.trim().is_empty()) {
        return Err(AppError::InvalidInput("Feature names cannot be empty".into()));
    }
    Ok(())
}
