use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    Postgres, Row,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, parse_json_with_fallback},
    app_error::{AppError, AppResult},
    domain::entities::subscription::{
        Subscription, SubscriptionDiscount, SubscriptionStatus, TrialPeriod,
    },
    use_cases::subscription::SubscriptionRepo,
};

const SELECT_COLS: &str = r#"
    id, user_id, plan_id, status, start_date, end_date, next_billing_date,
    billing_cycle, price_cents, currency, discount, auto_renewal,
    trial_active, trial_start, trial_end, notes, cancelled_at, cancel_reason,
    created_at, updated_at
"#;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

fn row_to_subscription(row: &PgRow) -> Subscription {
    let id: Uuid = row.get("id");
    let discount_json: Option<serde_json::Value> = row.get("discount");
    let discount: Option<SubscriptionDiscount> = parse_json_with_fallback(
        &discount_json.unwrap_or(serde_json::Value::Null),
        "discount",
        "subscription",
        &id.to_string(),
    );

    Subscription {
        id,
        user_id: row.get("user_id"),
        plan_id: row.get("plan_id"),
        status: row.get("status"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        next_billing_date: row.get("next_billing_date"),
        billing_cycle: row.get("billing_cycle"),
        price_cents: row.get("price_cents"),
        currency: row.get("currency"),
        discount,
        auto_renewal: row.get("auto_renewal"),
        trial: TrialPeriod {
            is_active: row.get("trial_active"),
            start_date: row.get("trial_start"),
            end_date: row.get("trial_end"),
        },
        notes: row.get("notes"),
        cancelled_at: row.get("cancelled_at"),
        cancel_reason: row.get("cancel_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn discount_to_json(discount: &Option<SubscriptionDiscount>) -> Option<serde_json::Value> {
    discount
        .as_ref()
        .and_then(|d| serde_json::to_value(d).ok())
}

fn insert_sql() -> String {
    format!(
        r#"
        INSERT INTO subscriptions (
            id, user_id, plan_id, status, start_date, end_date, next_billing_date,
            billing_cycle, price_cents, currency, discount, auto_renewal,
            trial_active, trial_start, trial_end, notes, cancelled_at, cancel_reason
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING {}
        "#,
        SELECT_COLS
    )
}

fn update_sql() -> String {
    format!(
        r#"
        UPDATE subscriptions SET
            plan_id = $2, status = $3, start_date = $4, end_date = $5,
            next_billing_date = $6, billing_cycle = $7, price_cents = $8, currency = $9,
            discount = $10, auto_renewal = $11, trial_active = $12, trial_start = $13,
            trial_end = $14, notes = $15, cancelled_at = $16, cancel_reason = $17,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        SELECT_COLS
    )
}

fn bind_insert<'q>(sql: &'q str, subscription: &'q Subscription) -> PgQuery<'q> {
    sqlx::query(sql)
        .bind(subscription.id)
        .bind(subscription.user_id)
        .bind(subscription.plan_id)
        .bind(subscription.status)
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.next_billing_date)
        .bind(subscription.billing_cycle)
        .bind(subscription.price_cents)
        .bind(&subscription.currency)
        .bind(discount_to_json(&subscription.discount))
        .bind(subscription.auto_renewal)
        .bind(subscription.trial.is_active)
        .bind(subscription.trial.start_date)
        .bind(subscription.trial.end_date)
        .bind(&subscription.notes)
        .bind(subscription.cancelled_at)
        .bind(subscription.cancel_reason)
}

fn bind_update<'q>(sql: &'q str, subscription: &'q Subscription) -> PgQuery<'q> {
    sqlx::query(sql)
        .bind(subscription.id)
        .bind(subscription.plan_id)
        .bind(subscription.status)
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.next_billing_date)
        .bind(subscription.billing_cycle)
        .bind(subscription.price_cents)
        .bind(&subscription.currency)
        .bind(discount_to_json(&subscription.discount))
        .bind(subscription.auto_renewal)
        .bind(subscription.trial.is_active)
        .bind(subscription.trial.start_date)
        .bind(subscription.trial.end_date)
        .bind(&subscription.notes)
        .bind(subscription.cancelled_at)
        .bind(subscription.cancel_reason)
}

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn get_active_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 AND status = 'active' LIMIT 1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn list(&self, status: Option<SubscriptionStatus>) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE ($1::subscription_status IS NULL OR status = $1) ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn list_active_ending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE status = 'active' AND end_date >= $1 AND end_date <= $2 ORDER BY end_date",
            SELECT_COLS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn list_lapsed(&self, now: DateTime<Utc>) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE status = 'active' AND end_date < $1 ORDER BY end_date",
            SELECT_COLS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn count_active_by_plan(&self, plan_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscriptions WHERE plan_id = $1 AND status = 'active'",
        )
        .bind(plan_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(count)
    }

    async fn insert(&self, subscription: &Subscription) -> AppResult<Subscription> {
        let sql = insert_sql();
        let row = bind_insert(&sql, subscription)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn update(&self, subscription: &Subscription) -> AppResult<Subscription> {
        let sql = update_sql();
        let row = bind_update(&sql, subscription)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        row.as_ref().map(row_to_subscription).ok_or(AppError::NotFound)
    }

    async fn replace(
        &self,
        previous: &Subscription,
        replacement: &Subscription,
    ) -> AppResult<Subscription> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let update = update_sql();
        bind_update(&update, previous)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::from)?
            .ok_or(AppError::NotFound)?;

        let insert = insert_sql();
        let row = bind_insert(&insert, replacement)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }
}
