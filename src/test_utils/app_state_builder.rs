//! `TestAppStateBuilder` creates an `AppState` backed by in-memory repos for
//! HTTP-level tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        use_cases::{
            analytics::AnalyticsUseCases, discount::DiscountUseCases,
            notification::NotificationUseCases, plan::PlanUseCases,
            subscription::SubscriptionUseCases, user::UserUseCases,
        },
    },
    domain::entities::user::UserRole,
    infra::config::AppConfig,
    test_utils::{
        InMemoryDiscountRepo, InMemoryNotificationRepo, InMemoryPlanRepo,
        InMemorySubscriptionRepo, InMemoryUserRepo,
    },
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";

/// Sign an access token the test `AppState` will accept.
pub fn test_token(user_id: Uuid, role: UserRole) -> String {
    jwt::issue(
        user_id,
        role,
        &SecretString::new(TEST_JWT_SECRET.into()),
        Duration::hours(1),
    )
    .unwrap()
}

pub fn bearer(user_id: Uuid, role: UserRole) -> String {
    format!("Bearer {}", test_token(user_id, role))
}

/// Builder for an `AppState` wired to in-memory repositories.
///
/// # Example
///
/// ```ignore
/// let plans = Arc::new(InMemoryPlanRepo::with_plans(vec![create_test_plan(|_| {})]));
/// let app_state = TestAppStateBuilder::new().with_plan_repo(plans.clone()).build();
/// ```
#[derive(Default)]
pub struct TestAppStateBuilder {
    users: Option<Arc<InMemoryUserRepo>>,
    plans: Option<Arc<InMemoryPlanRepo>>,
    subscriptions: Option<Arc<InMemorySubscriptionRepo>>,
    discounts: Option<Arc<InMemoryDiscountRepo>>,
    notifications: Option<Arc<InMemoryNotificationRepo>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_repo(mut self, repo: Arc<InMemoryUserRepo>) -> Self {
        self.users = Some(repo);
        self
    }

    pub fn with_plan_repo(mut self, repo: Arc<InMemoryPlanRepo>) -> Self {
        self.plans = Some(repo);
        self
    }

    pub fn with_subscription_repo(mut self, repo: Arc<InMemorySubscriptionRepo>) -> Self {
        self.subscriptions = Some(repo);
        self
    }

    pub fn with_discount_repo(mut self, repo: Arc<InMemoryDiscountRepo>) -> Self {
        self.discounts = Some(repo);
        self
    }

    pub fn with_notification_repo(mut self, repo: Arc<InMemoryNotificationRepo>) -> Self {
        self.notifications = Some(repo);
        self
    }

    pub fn build(self) -> AppState {
        let users = self.users.unwrap_or_default();
        let plans = self.plans.unwrap_or_default();
        let subscriptions = self.subscriptions.unwrap_or_default();
        let discounts = self.discounts.unwrap_or_default();
        let notifications = self.notifications.unwrap_or_default();

        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            access_token_ttl: Duration::hours(24),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            db_max_connections: 1,
            expiry_sweep_secs: 3_600,
            expiring_window_days: 7,
            admin_email: None,
            admin_password: None,
        });

        let notification_use_cases = Arc::new(NotificationUseCases::new(notifications));
        let discount_use_cases = Arc::new(DiscountUseCases::new(discounts));

        let subscription_use_cases = Arc::new(SubscriptionUseCases::new(
            subscriptions.clone(),
            plans.clone(),
            users.clone(),
            discount_use_cases.clone(),
            notification_use_cases.clone(),
        ));

        let plan_use_cases = Arc::new(PlanUseCases::new(plans.clone(), subscriptions.clone()));

        let user_use_cases = Arc::new(UserUseCases::new(
            users.clone(),
            subscription_use_cases.clone(),
            config.jwt_secret.clone(),
            config.access_token_ttl,
        ));

        let analytics_use_cases = Arc::new(AnalyticsUseCases::new(users, subscriptions, plans));

        AppState {
            config,
            user_use_cases,
            plan_use_cases,
            discount_use_cases,
            subscription_use_cases,
            notification_use_cases,
            analytics_use_cases,
        }
    }
}
