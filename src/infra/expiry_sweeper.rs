use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info};

use crate::use_cases::subscription::SubscriptionUseCases;

/// Sweep period in seconds, never below one.
fn sweep_period_secs(configured: u64) -> u64 {
    configured.max(1)
}

pub async fn run_expiry_sweep_loop(subscription_use_cases: Arc<SubscriptionUseCases>, every_secs: u64) {
    let every_secs = sweep_period_secs(every_secs);
    let mut ticker = interval(Duration::from_secs(every_secs));

    info!(
        "Subscription expiry sweeper started (running every {}s)",
        every_secs
    );

    loop {
        ticker.tick().await;

        match subscription_use_cases.sweep_lapsed(Utc::now()).await {
            Ok(report) if report.renewed + report.expired + report.failed > 0 => {
                info!(
                    renewed = report.renewed,
                    expired = report.expired,
                    failed = report.failed,
                    "Processed lapsed subscriptions"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = ?e, "Subscription expiry sweep failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_period_is_clamped_to_one_second() {
        assert_eq!(sweep_period_secs(0), 1);
        assert_eq!(sweep_period_secs(300), 300);
    }
}
