use std::sync::Arc;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        analytics::AnalyticsUseCases, discount::DiscountUseCases,
        notification::NotificationUseCases, plan::PlanUseCases,
        subscription::SubscriptionUseCases, user::UserUseCases,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub user_use_cases: Arc<UserUseCases>,
    pub plan_use_cases: Arc<PlanUseCases>,
    pub discount_use_cases: Arc<DiscountUseCases>,
    pub subscription_use_cases: Arc<SubscriptionUseCases>,
    pub notification_use_cases: Arc<NotificationUseCases>,
    pub analytics_use_cases: Arc<AnalyticsUseCases>,
}
