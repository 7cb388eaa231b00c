pub mod analytics;
pub mod auth;
pub mod discounts;
pub mod notifications;
pub mod plans;
pub mod subscriptions;
pub mod users;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/plans", plans::router())
        .nest("/discounts", discounts::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/users", users::router())
        .nest("/notifications", notifications::router())
        .nest("/analytics", analytics::router())
}
