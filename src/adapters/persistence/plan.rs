use async_trait::async_trait;
use sqlx::{Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, parse_json_with_fallback},
    app_error::{AppError, AppResult},
    domain::entities::plan::{Plan, PlanPricing},
    use_cases::plan::{PlanListFilters, PlanRepo},
};

const SELECT_COLS: &str = r#"
    id, code, name, description, category, product_type, data_quota_gb, speed,
    monthly_cents, currency, quarterly_cents, quarterly_discount_pct,
    yearly_cents, yearly_discount_pct, features, status, visibility, trial,
    setup_fee_cents, sort_order, created_at, updated_at
"#;

/// Price billed for the cycle bound as `$6`, falling back to monthly multiples
/// like `Plan::price_for_cycle`.
const CYCLE_PRICE_EXPR: &str = r#"
    CASE $6::billing_cycle
        WHEN 'quarterly' THEN COALESCE(NULLIF(quarterly_cents, 0), monthly_cents * 3)
        WHEN 'yearly' THEN COALESCE(NULLIF(yearly_cents, 0), monthly_cents * 12)
        ELSE monthly_cents
    END
"#;

fn pct_from_db(value: Option<i16>) -> Option<u8> {
    value.and_then(|v| u8::try_from(v).ok())
}

fn row_to_plan(row: &PgRow) -> Plan {
    let id: Uuid = row.get("id");
    let entity_id = id.to_string();
    let features_json: serde_json::Value = row.get("features");
    let trial_json: Option<serde_json::Value> = row.get("trial");

    Plan {
        id,
        code: row.get("code"),
        name: row.get("name"),
        description: row.get("description"),
        category: row.get("category"),
        product_type: row.get("product_type"),
        data_quota_gb: row.get("data_quota_gb"),
        speed: row.get("speed"),
        pricing: PlanPricing {
            monthly_cents: row.get("monthly_cents"),
            currency: row.get("currency"),
            quarterly_cents: row.get("quarterly_cents"),
            quarterly_discount_pct: pct_from_db(row.get("quarterly_discount_pct")),
            yearly_cents: row.get("yearly_cents"),
            yearly_discount_pct: pct_from_db(row.get("yearly_discount_pct")),
        },
        features: parse_json_with_fallback(&features_json, "features", "plan", &entity_id),
        status: row.get("status"),
        visibility: row.get("visibility"),
        trial: parse_json_with_fallback(
            &trial_json.unwrap_or(serde_json::Value::Null),
            "trial",
            "plan",
            &entity_id,
        ),
        setup_fee_cents: row.get("setup_fee_cents"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl PlanRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!("SELECT {} FROM plans WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn get_by_code(&self, code: &str) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!("SELECT {} FROM plans WHERE code = $1", SELECT_COLS))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn list(&self, filters: &PlanListFilters) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM plans
            WHERE ($1::plan_category IS NULL OR category = $1)
              AND ($2::plan_status IS NULL OR status = $2)
              AND ($3::plan_visibility IS NULL OR visibility = $3)
              AND ($4::bigint IS NULL OR {price} >= $4)
              AND ($5::bigint IS NULL OR {price} <= $5)
            ORDER BY sort_order, monthly_cents
            "#,
            SELECT_COLS,
            price = CYCLE_PRICE_EXPR
        ))
        .bind(filters.category)
        .bind(filters.status)
        .bind(filters.visibility)
        .bind(filters.min_price_cents)
        .bind(filters.max_price_cents)
        .bind(filters.price_cycle)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_plan).collect())
    }

    async fn insert(&self, plan: &Plan) -> AppResult<Plan> {
        let features_json = serde_json::to_value(&plan.features).unwrap_or(serde_json::json!([]));
        let trial_json = serde_json::to_value(&plan.trial).unwrap_or(serde_json::Value::Null);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO plans (
                id, code, name, description, category, product_type, data_quota_gb, speed,
                monthly_cents, currency, quarterly_cents, quarterly_discount_pct,
                yearly_cents, yearly_discount_pct, features, status, visibility, trial,
                setup_fee_cents, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(plan.id)
        .bind(&plan.code)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.category)
        .bind(plan.product_type)
        .bind(plan.data_quota_gb)
        .bind(&plan.speed)
        .bind(plan.pricing.monthly_cents)
        .bind(&plan.pricing.currency)
        .bind(plan.pricing.quarterly_cents)
        .bind(plan.pricing.quarterly_discount_pct.map(i16::from))
        .bind(plan.pricing.yearly_cents)
        .bind(plan.pricing.yearly_discount_pct.map(i16::from))
        .bind(features_json)
        .bind(plan.status)
        .bind(plan.visibility)
        .bind(trial_json)
        .bind(plan.setup_fee_cents)
        .bind(plan.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_plan(&row))
    }

    async fn update(&self, plan: &Plan) -> AppResult<Plan> {
        let features_json = serde_json::to_value(&plan.features).unwrap_or(serde_json::json!([]));
        let trial_json = serde_json::to_value(&plan.trial).unwrap_or(serde_json::Value::Null);

        let row = sqlx::query(&format!(
            r#"
            UPDATE plans SET
                code = $2, name = $3, description = $4, category = $5, product_type = $6,
                data_quota_gb = $7, speed = $8, monthly_cents = $9, currency = $10,
                quarterly_cents = $11, quarterly_discount_pct = $12, yearly_cents = $13,
                yearly_discount_pct = $14, features = $15, status = $16, visibility = $17,
                trial = $18, setup_fee_cents = $19, sort_order = $20, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(plan.id)
        .bind(&plan.code)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.category)
        .bind(plan.product_type)
        .bind(plan.data_quota_gb)
        .bind(&plan.speed)
        .bind(plan.pricing.monthly_cents)
        .bind(&plan.pricing.currency)
        .bind(plan.pricing.quarterly_cents)
        .bind(plan.pricing.quarterly_discount_pct.map(i16::from))
        .bind(plan.pricing.yearly_cents)
        .bind(plan.pricing.yearly_discount_pct.map(i16::from))
        .bind(features_json)
        .bind(plan.status)
        .bind(plan.visibility)
        .bind(trial_json)
        .bind(plan.setup_fee_cents)
        .bind(plan.sort_order)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_plan).ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
