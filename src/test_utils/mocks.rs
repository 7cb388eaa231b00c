//! In-memory implementations of the repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        discount::DiscountRepo,
        notification::NotificationRepo,
        plan::{PlanListFilters, PlanRepo},
        subscription::SubscriptionRepo,
        user::UserRepo,
    },
    domain::entities::{
        discount::Discount,
        notification::Notification,
        plan::Plan,
        subscription::{Subscription, SubscriptionStatus},
        user::User,
    },
};

fn stamp(created_at: &mut Option<DateTime<Utc>>, updated_at: &mut Option<DateTime<Utc>>) {
    let now = Utc::now();
    created_at.get_or_insert(now);
    *updated_at = Some(now);
}

// ============================================================================
// InMemoryUserRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    pub users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.users.lock().unwrap().len() as i64)
    }

    async fn insert(&self, user: &User) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::InvalidInput("Duplicate entry".into()));
        }
        let mut user = user.clone();
        stamp(&mut user.created_at, &mut user.updated_at);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            return Err(AppError::NotFound);
        }
        let mut user = user.clone();
        stamp(&mut user.created_at, &mut user.updated_at);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.users.lock().unwrap().remove(&id).is_some())
    }
}

// ============================================================================
// InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRepo {
    pub plans: Mutex<HashMap<Uuid, Plan>>,
}

impl InMemoryPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: Vec<Plan>) -> Self {
        Self {
            plans: Mutex::new(plans.into_iter().map(|p| (p.id, p)).collect()),
        }
    }
}

#[async_trait]
impl PlanRepo for InMemoryPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> AppResult<Option<Plan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn list(&self, filters: &PlanListFilters) -> AppResult<Vec<Plan>> {
        let mut plans: Vec<Plan> = self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| filters.category.is_none_or(|c| p.category == c))
            .filter(|p| filters.status.is_none_or(|s| p.status == s))
            .filter(|p| filters.visibility.is_none_or(|v| p.visibility == v))
            .filter(|p| filters.matches_price(p))
            .cloned()
            .collect();
        plans.sort_by_key(|p| (p.sort_order, p.pricing.monthly_cents));
        Ok(plans)
    }

    async fn insert(&self, plan: &Plan) -> AppResult<Plan> {
        let mut plan = plan.clone();
        stamp(&mut plan.created_at, &mut plan.updated_at);
        self.plans.lock().unwrap().insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn update(&self, plan: &Plan) -> AppResult<Plan> {
        let mut plans = self.plans.lock().unwrap();
        if !plans.contains_key(&plan.id) {
            return Err(AppError::NotFound);
        }
        let mut plan = plan.clone();
        stamp(&mut plan.created_at, &mut plan.updated_at);
        plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.plans.lock().unwrap().remove(&id).is_some())
    }
}

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<HashMap<Uuid, Subscription>>,
    /// When set, every insert fails as a database error would.
    pub fail_inserts: AtomicBool,
    /// Updates of these ids fail as a database error would.
    pub fail_updates_for: Mutex<HashSet<Uuid>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Mutex::new(subscriptions.into_iter().map(|s| (s.id, s)).collect()),
            ..Default::default()
        }
    }

    fn check_insert(&self) -> AppResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Database("insert rejected".into()));
        }
        Ok(())
    }

    fn check_update(&self, id: Uuid) -> AppResult<()> {
        if self.fail_updates_for.lock().unwrap().contains(&id) {
            return Err(AppError::Database("update rejected".into()));
        }
        Ok(())
    }

    fn filtered(&self, pred: impl Fn(&Subscription) -> bool) -> Vec<Subscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| pred(s))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.subscriptions.lock().unwrap().get(&id).cloned())
    }

    async fn get_active_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self
            .filtered(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
            .into_iter()
            .next())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let mut subs = self.filtered(|s| s.user_id == user_id);
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subs)
    }

    async fn list(&self, status: Option<SubscriptionStatus>) -> AppResult<Vec<Subscription>> {
        let mut subs = self.filtered(|s| status.is_none_or(|st| s.status == st));
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subs)
    }

    async fn list_active_ending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Subscription>> {
        let mut subs = self.filtered(|s| {
            s.status == SubscriptionStatus::Active && s.end_date >= from && s.end_date <= to
        });
        subs.sort_by_key(|s| s.end_date);
        Ok(subs)
    }

    async fn list_lapsed(&self, now: DateTime<Utc>) -> AppResult<Vec<Subscription>> {
        Ok(self.filtered(|s| s.status == SubscriptionStatus::Active && s.end_date < now))
    }

    async fn count_active_by_plan(&self, plan_id: Uuid) -> AppResult<i64> {
        Ok(self
            .filtered(|s| s.plan_id == plan_id && s.status == SubscriptionStatus::Active)
            .len() as i64)
    }

    async fn insert(&self, subscription: &Subscription) -> AppResult<Subscription> {
        self.check_insert()?;
        let mut subscriptions = self.subscriptions.lock().unwrap();
        check_one_active(&subscriptions, subscription)?;
        let mut subscription = subscription.clone();
        stamp(&mut subscription.created_at, &mut subscription.updated_at);
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn update(&self, subscription: &Subscription) -> AppResult<Subscription> {
        self.check_update(subscription.id)?;
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if !subscriptions.contains_key(&subscription.id) {
            return Err(AppError::NotFound);
        }
        let mut subscription = subscription.clone();
        stamp(&mut subscription.created_at, &mut subscription.updated_at);
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn replace(
        &self,
        previous: &Subscription,
        replacement: &Subscription,
    ) -> AppResult<Subscription> {
        self.check_update(previous.id)?;
        self.check_insert()?;
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if !subscriptions.contains_key(&previous.id) {
            return Err(AppError::NotFound);
        }

        // Validate against the post-update view before writing either row.
        let mut staged = subscriptions.clone();
        staged.insert(previous.id, previous.clone());
        check_one_active(&staged, replacement)?;

        let mut previous = previous.clone();
        stamp(&mut previous.created_at, &mut previous.updated_at);
        subscriptions.insert(previous.id, previous);

        let mut replacement = replacement.clone();
        stamp(&mut replacement.created_at, &mut replacement.updated_at);
        subscriptions.insert(replacement.id, replacement.clone());
        Ok(replacement)
    }
}

/// Mirrors the partial unique index on active subscriptions per user.
fn check_one_active(
    subscriptions: &HashMap<Uuid, Subscription>,
    candidate: &Subscription,
) -> AppResult<()> {
    let conflict = candidate.status == SubscriptionStatus::Active
        && subscriptions.values().any(|s| {
            s.id != candidate.id
                && s.user_id == candidate.user_id
                && s.status == SubscriptionStatus::Active
        });
    if conflict {
        return Err(AppError::InvalidState(
            "User already has an active subscription".into(),
        ));
    }
    Ok(())
}

// ============================================================================
// InMemoryDiscountRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryDiscountRepo {
    pub discounts: Mutex<HashMap<Uuid, Discount>>,
}

impl InMemoryDiscountRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DiscountRepo for InMemoryDiscountRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Discount>> {
        Ok(self.discounts.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> AppResult<Option<Discount>> {
        Ok(self
            .discounts
            .lock()
            .unwrap()
            .values()
            .find(|d| d.code == code)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<Discount>> {
        let mut discounts: Vec<Discount> =
            self.discounts.lock().unwrap().values().cloned().collect();
        discounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(discounts)
    }

    async fn insert(&self, discount: &Discount) -> AppResult<Discount> {
        let mut discount = discount.clone();
        stamp(&mut discount.created_at, &mut discount.updated_at);
        self.discounts
            .lock()
            .unwrap()
            .insert(discount.id, discount.clone());
        Ok(discount)
    }

    async fn update(&self, discount: &Discount) -> AppResult<Discount> {
        let mut discounts = self.discounts.lock().unwrap();
        if !discounts.contains_key(&discount.id) {
            return Err(AppError::NotFound);
        }
        let mut discount = discount.clone();
        stamp(&mut discount.created_at, &mut discount.updated_at);
        discounts.insert(discount.id, discount.clone());
        Ok(discount)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.discounts.lock().unwrap().remove(&id).is_some())
    }
}

// ============================================================================
// InMemoryNotificationRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryNotificationRepo {
    pub notifications: Mutex<HashMap<Uuid, Notification>>,
}

impl InMemoryNotificationRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepo for InMemoryNotificationRepo {
    async fn insert(&self, notification: &Notification) -> AppResult<Notification> {
        let mut notification = notification.clone();
        notification.created_at.get_or_insert_with(Utc::now);
        self.notifications
            .lock()
            .unwrap()
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Notification>> {
        Ok(self.notifications.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .notifications
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<Option<Notification>> {
        let mut notifications = self.notifications.lock().unwrap();
        Ok(notifications.get_mut(&id).map(|n| {
            n.is_read = true;
            n.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.notifications.lock().unwrap().remove(&id).is_some())
    }
}
