use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        actor::Actor,
        use_cases::{
            discount::DiscountUseCases, notification::NotificationUseCases, plan::PlanRepo,
            user::UserRepo,
        },
    },
    domain::{
        entities::{
            billing_cycle::BillingCycle,
            notification::NotificationKind,
            subscription::{CancelReason, Subscription, SubscriptionStatus, TrialPeriod},
        },
        lifecycle::NewSubscription,
    },
};

const MAX_EXPIRING_WINDOW_DAYS: i64 = 365;

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>>;
    async fn get_active_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>>;
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>>;
    async fn list(&self, status: Option<SubscriptionStatus>) -> AppResult<Vec<Subscription>>;
    /// Active subscriptions with `from <= end_date <= to`, soonest first.
    async fn list_active_ending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Subscription>>;
    /// Active subscriptions whose `end_date` is before `now`.
    async fn list_lapsed(&self, now: DateTime<Utc>) -> AppResult<Vec<Subscription>>;
    async fn count_active_by_plan(&self, plan_id: Uuid) -> AppResult<i64>;
    async fn insert(&self, subscription: &Subscription) -> AppResult<Subscription>;
    async fn update(&self, subscription: &Subscription) -> AppResult<Subscription>;
    /// Store `previous` and insert `replacement` as one atomic write.
    /// Neither row changes if either write fails.
    async fn replace(
        &self,
        previous: &Subscription,
        replacement: &Subscription,
    ) -> AppResult<Subscription>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionInput {
    /// Admins may subscribe on behalf of another user; defaults to the caller.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub plan_id: Uuid,
    #[serde(default = "default_cycle")]
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default = "default_auto_renewal")]
    pub auto_renewal: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_cycle() -> BillingCycle {
    BillingCycle::Monthly
}

fn default_auto_renewal() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubscriptionInput {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub billing_cycle: Option<BillingCycle>,
    pub auto_renewal: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub renewed: usize,
    pub expired: usize,
    /// Records left untouched this pass; retried on the next one.
    pub failed: usize,
}

#[derive(Clone)]
pub struct SubscriptionUseCases {
    subscriptions: Arc<dyn SubscriptionRepo>,
    plans: Arc<dyn PlanRepo>,
    users: Arc<dyn UserRepo>,
    discounts: Arc<DiscountUseCases>,
    notifications: Arc<NotificationUseCases>,
}

impl SubscriptionUseCases {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepo>,
        plans: Arc<dyn PlanRepo>,
        users: Arc<dyn UserRepo>,
        discounts: Arc<DiscountUseCases>,
        notifications: Arc<NotificationUseCases>,
    ) -> Self {
        Self {
            subscriptions,
            plans,
            users,
            discounts,
            notifications,
        }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateSubscriptionInput,
    ) -> AppResult<Subscription> {
        let user_id = input.user_id.unwrap_or(actor.user_id);
        actor.require_owner_or_admin(user_id)?;

        if self.subscriptions.get_active_by_user(user_id).await?.is_some() {
            return Err(AppError::InvalidState(
                "User already has an active subscription".into(),
            ));
        }

        let (subscription, plan_name) = self.build(user_id, input).await?;
        let created = self.subscriptions.insert(&subscription).await?;

        tracing::info!(
            subscription_id = %created.id,
            user_id = %created.user_id,
            plan_id = %created.plan_id,
            "Subscription created"
        );
        self.notifications
            .notify(
                created.user_id,
                NotificationKind::Billing,
                &format!(
                    "Your {} subscription is active until {}.",
                    plan_name,
                    created.end_date.format("%Y-%m-%d")
                ),
            )
            .await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Subscription> {
        let subscription = self
            .subscriptions
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;
        actor.require_owner_or_admin(subscription.user_id)?;
        Ok(subscription)
    }

    #[instrument(skip(self))]
    pub async fn get_active_for_user(
        &self,
        actor: &Actor,
        user_id: Uuid,
    ) -> AppResult<Option<Subscription>> {
        actor.require_owner_or_admin(user_id)?;
        self.subscriptions.get_active_by_user(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(&self, actor: &Actor, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        actor.require_owner_or_admin(user_id)?;
        self.subscriptions.list_by_user(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        actor: &Actor,
        status: Option<SubscriptionStatus>,
    ) -> AppResult<Vec<Subscription>> {
        actor.require_admin()?;
        self.subscriptions.list(status).await
    }

    /// Active subscriptions ending within the next `days` days.
    #[instrument(skip(self))]
    pub async fn list_expiring(&self, actor: &Actor, days: i64) -> AppResult<Vec<Subscription>> {
        actor.require_admin()?;
        if !(1..=MAX_EXPIRING_WINDOW_DAYS).contains(&days) {
            return Err(AppError::InvalidInput(format!(
                "days must be between 1 and {}",
                MAX_EXPIRING_WINDOW_DAYS
            )));
        }
        let now = Utc::now();
        self.subscriptions
            .list_active_ending_between(now, now + Duration::days(days))
            .await
    }

    #[instrument(skip(self))]
    pub async fn renew(&self, actor: &Actor, id: Uuid, cycles: u32) -> AppResult<Subscription> {
        let mut subscription = self.get(actor, id).await?;
        subscription.renew(cycles)?;
        let renewed = self.subscriptions.update(&subscription).await?;

        tracing::info!(subscription_id = %renewed.id, cycles, "Subscription renewed");
        self.notifications
            .notify(
                renewed.user_id,
                NotificationKind::Billing,
                &format!(
                    "Your subscription has been renewed until {}.",
                    renewed.end_date.format("%Y-%m-%d")
                ),
            )
            .await;
        Ok(renewed)
    }

    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: Option<CancelReason>,
    ) -> AppResult<Subscription> {
        let mut subscription = self.get(actor, id).await?;
        // Customers always cancel on their own behalf.
        let reason = if actor.role.is_admin() {
            reason.unwrap_or(CancelReason::AdminAction)
        } else {
            CancelReason::UserRequest
        };
        subscription.cancel(reason, Utc::now());
        let cancelled = self.subscriptions.update(&subscription).await?;

        tracing::info!(subscription_id = %cancelled.id, reason = ?cancelled.cancel_reason, "Subscription cancelled");
        self.notify_cancelled(&cancelled).await;
        Ok(cancelled)
    }

    /// Replace the user's active subscription with one on a different plan.
    #[instrument(skip(self))]
    pub async fn change_plan(
        &self,
        actor: &Actor,
        input: CreateSubscriptionInput,
    ) -> AppResult<Subscription> {
        let user_id = input.user_id.unwrap_or(actor.user_id);
        actor.require_owner_or_admin(user_id)?;

        // Build first so a rejected plan leaves the current subscription intact.
        let (replacement, plan_name) = self.build(user_id, input).await?;

        let created = match self.subscriptions.get_active_by_user(user_id).await? {
            Some(mut current) => {
                if current.plan_id == replacement.plan_id
                    && current.billing_cycle == replacement.billing_cycle
                {
                    return Err(AppError::InvalidInput(
                        "Already subscribed to this plan and billing cycle".into(),
                    ));
                }
                current.cancel(CancelReason::UserRequest, Utc::now());
                self.subscriptions.replace(&current, &replacement).await?
            }
            None => self.subscriptions.insert(&replacement).await?,
        };
        tracing::info!(
            subscription_id = %created.id,
            user_id = %user_id,
            plan_id = %created.plan_id,
            "Subscription plan changed"
        );
        self.notifications
            .notify(
                user_id,
                NotificationKind::Billing,
                &format!("You are now subscribed to {}.", plan_name),
            )
            .await;
        Ok(created)
    }

    /// Administrative edit. The billing date is recomputed only when the
    /// start date or cycle changed.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateSubscriptionInput,
    ) -> AppResult<Subscription> {
        actor.require_admin()?;
        let previous = self
            .subscriptions
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut subscription = previous.clone();
        if let Some(start) = input.start_date {
            subscription.start_date = start;
        }
        if let Some(end) = input.end_date {
            subscription.end_date = end;
        }
        if let Some(cycle) = input.billing_cycle {
            subscription.billing_cycle = cycle;
        }
        if let Some(auto_renewal) = input.auto_renewal {
            subscription.auto_renewal = auto_renewal;
        }
        if input.notes.is_some() {
            subscription.notes = input.notes;
        }

        subscription.initialize(Some(&previous))?;
        subscription.validate()?;
        self.subscriptions.update(&subscription).await
    }

    /// Cancel every subscription of a user that is not already cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_all_for_user(&self, user_id: Uuid, reason: CancelReason) -> AppResult<usize> {
        let now = Utc::now();
        let mut count = 0;
        for mut subscription in self.subscriptions.list_by_user(user_id).await? {
            if subscription.status == SubscriptionStatus::Cancelled {
                continue;
            }
            subscription.cancel(reason, now);
            self.subscriptions.update(&subscription).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Roll lapsed subscriptions forward: auto-renewing ones are renewed
    /// until they cover `now`, the rest are marked expired.
    #[instrument(skip(self))]
    pub async fn sweep_lapsed(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();

        for subscription in self.subscriptions.list_lapsed(now).await? {
            let id = subscription.id;
            let settled = match self.settle_lapsed(subscription, now).await {
                Ok(settled) => settled,
                Err(e) => {
                    tracing::warn!(subscription_id = %id, error = %e, "Failed to settle lapsed subscription");
                    report.failed += 1;
                    continue;
                }
            };

            let message = if settled.status == SubscriptionStatus::Active {
                report.renewed += 1;
                format!(
                    "Your subscription was automatically renewed until {}.",
                    settled.end_date.format("%Y-%m-%d")
                )
            } else {
                report.expired += 1;
                "Your subscription has expired. Renew to keep your service active.".to_string()
            };
            self.notifications
                .notify(settled.user_id, NotificationKind::Alert, &message)
                .await;
        }

        Ok(report)
    }

    async fn settle_lapsed(
        &self,
        mut subscription: Subscription,
        now: DateTime<Utc>,
    ) -> AppResult<Subscription> {
        if subscription.auto_renewal {
            while subscription.end_date < now {
                subscription.renew(1)?;
            }
        } else {
            subscription.status = SubscriptionStatus::Expired;
        }
        self.subscriptions.update(&subscription).await
    }

    /// Price, trial and discount resolution shared by `create` and `change_plan`.
    async fn build(
        &self,
        user_id: Uuid,
        input: CreateSubscriptionInput,
    ) -> AppResult<(Subscription, String)> {
        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let plan = self
            .plans
            .get_by_id(input.plan_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !plan.is_active() {
            return Err(AppError::InvalidInput(format!(
                "Plan '{}' is not available for new subscriptions",
                plan.code
            )));
        }

        let now = Utc::now();
        let discount = match input.discount_code.as_deref() {
            Some(code) if !code.trim().is_empty() => Some(
                self.discounts
                    .redeemable(code, now)
                    .await?
                    .to_subscription_discount(),
            ),
            _ => None,
        };

        let start_date = input.start_date.unwrap_or(now);
        let trial = plan
            .trial_end(start_date)
            .map(|end| TrialPeriod {
                is_active: true,
                start_date: Some(start_date),
                end_date: Some(end),
            })
            .unwrap_or_default();

        let subscription = Subscription::create(NewSubscription {
            id: None,
            user_id,
            plan_id: plan.id,
            start_date,
            end_date: None,
            billing_cycle: input.billing_cycle,
            price_cents: plan.price_for_cycle(input.billing_cycle),
            currency: plan.pricing.currency.clone(),
            discount,
            auto_renewal: input.auto_renewal,
            trial,
            notes: input.notes,
        })?;

        Ok((subscription, plan.name))
    }

    async fn notify_cancelled(&self, subscription: &Subscription) {
        let reason = subscription
            .cancel_reason
            .map(|r| r.as_str())
            .unwrap_or(CancelReason::default().as_str());
        self.notifications
            .notify(
                subscription.user_id,
                NotificationKind::Billing,
                &format!("Your subscription has been cancelled ({}).", reason),
            )
            .await;
    }
}
