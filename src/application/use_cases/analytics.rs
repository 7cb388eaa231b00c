use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{
        actor::Actor,
        use_cases::{
            plan::{PlanListFilters, PlanRepo},
            subscription::SubscriptionRepo,
            user::UserRepo,
        },
    },
    domain::entities::{
        billing_cycle::BillingCycle,
        subscription::{Subscription, SubscriptionStatus},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanPopularity {
    pub plan_id: Uuid,
    pub plan_name: Option<String>,
    pub active_subscriptions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_users: i64,
    pub active_subscriptions: usize,
    pub cancelled_subscriptions: usize,
    /// Sum of effective prices of active subscriptions, minor units.
    pub revenue_cents: i64,
    pub mrr_cents: i64,
    pub plan_popularity: Vec<PlanPopularity>,
}

/// Monthly equivalent of one cycle's charge, kept fractional until the total
/// is rounded.
fn monthly_amount_cents(price_cents: i64, cycle: BillingCycle) -> f64 {
    price_cents as f64 / f64::from(cycle.months())
}

pub fn calculate_mrr_cents(subscriptions: &[Subscription]) -> i64 {
    subscriptions
        .iter()
        .filter(|s| s.status == SubscriptionStatus::Active)
        .map(|s| monthly_amount_cents(s.effective_price_cents(), s.billing_cycle))
        .sum::<f64>()
        .round() as i64
}

#[derive(Clone)]
pub struct AnalyticsUseCases {
    users: Arc<dyn UserRepo>,
    subscriptions: Arc<dyn SubscriptionRepo>,
    plans: Arc<dyn PlanRepo>,
}

impl AnalyticsUseCases {
    pub fn new(
        users: Arc<dyn UserRepo>,
        subscriptions: Arc<dyn SubscriptionRepo>,
        plans: Arc<dyn PlanRepo>,
    ) -> Self {
        Self {
            users,
            subscriptions,
            plans,
        }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, actor: &Actor) -> AppResult<AnalyticsSummary> {
        actor.require_admin()?;

        let total_users = self.users.count().await?;
        let all = self.subscriptions.list(None).await?;
        let active: Vec<Subscription> = all
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active)
            .cloned()
            .collect();
        let cancelled_subscriptions = all
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Cancelled)
            .count();

        let revenue_cents: i64 = active.iter().map(Subscription::effective_price_cents).sum();
        let mrr_cents = calculate_mrr_cents(&active);

        let mut per_plan: HashMap<Uuid, usize> = HashMap::new();
        for s in &active {
            *per_plan.entry(s.plan_id).or_default() += 1;
        }
        let plan_names: HashMap<Uuid, String> = self
            .plans
            .list(&PlanListFilters::default())
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let mut plan_popularity: Vec<PlanPopularity> = per_plan
            .into_iter()
            .map(|(plan_id, count)| PlanPopularity {
                plan_id,
                plan_name: plan_names.get(&plan_id).cloned(),
                active_subscriptions: count,
            })
            .collect();
        plan_popularity.sort_by(|a, b| {
            b.active_subscriptions
                .cmp(&a.active_subscriptions)
                .then_with(|| a.plan_name.cmp(&b.plan_name))
        });

        Ok(AnalyticsSummary {
            total_users,
            active_subscriptions: active.len(),
            cancelled_subscriptions,
            revenue_cents,
            mrr_cents,
            plan_popularity,
        })
    }
}
