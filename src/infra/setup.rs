use crate::{
    adapters::http::app_state::AppState,
    infra::{InfraError, config::AppConfig, postgres_persistence},
    use_cases::{
        analytics::AnalyticsUseCases,
        discount::{DiscountRepo, DiscountUseCases},
        notification::{NotificationRepo, NotificationUseCases},
        plan::{PlanRepo, PlanUseCases},
        subscription::{SubscriptionRepo, SubscriptionUseCases},
        user::{UserRepo, UserUseCases},
    },
};
use secrecy::ExposeSecret;
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc =
        Arc::new(postgres_persistence(&config.database_url, config.db_max_connections).await?);

    let user_repo_arc = postgres_arc.clone() as Arc<dyn UserRepo>;
    let plan_repo_arc = postgres_arc.clone() as Arc<dyn PlanRepo>;
    let subscription_repo_arc = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;
    let discount_repo_arc = postgres_arc.clone() as Arc<dyn DiscountRepo>;
    let notification_repo_arc = postgres_arc.clone() as Arc<dyn NotificationRepo>;

    let notification_use_cases = Arc::new(NotificationUseCases::new(notification_repo_arc));
    let discount_use_cases = Arc::new(DiscountUseCases::new(discount_repo_arc));

    let subscription_use_cases = Arc::new(SubscriptionUseCases::new(
        subscription_repo_arc.clone(),
        plan_repo_arc.clone(),
        user_repo_arc.clone(),
        discount_use_cases.clone(),
        notification_use_cases.clone(),
    ));

    let plan_use_cases = Arc::new(PlanUseCases::new(
        plan_repo_arc.clone(),
        subscription_repo_arc.clone(),
    ));

    let user_use_cases = Arc::new(UserUseCases::new(
        user_repo_arc.clone(),
        subscription_use_cases.clone(),
        config.jwt_secret.clone(),
        config.access_token_ttl,
    ));

    let analytics_use_cases = Arc::new(AnalyticsUseCases::new(
        user_repo_arc,
        subscription_repo_arc,
        plan_repo_arc,
    ));

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        user_use_cases
            .ensure_admin(email, password.expose_secret())
            .await
            .map_err(InfraError::AdminBootstrap)?;
    }

    Ok(AppState {
        config: Arc::new(config),
        user_use_cases,
        plan_use_cases,
        discount_use_cases,
        subscription_use_cases,
        notification_use_cases,
        analytics_use_cases,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "telesub=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let json_layer = File::create("app.log").ok().map(|file| {
        fmt::layer()
            .json()
            .with_writer(file)
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
