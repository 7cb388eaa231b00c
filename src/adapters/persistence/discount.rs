use async_trait::async_trait;
use sqlx::{Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::discount::Discount,
    use_cases::discount::DiscountRepo,
};

const SELECT_COLS: &str =
    "id, code, kind, value, valid_from, valid_to, status, created_at, updated_at";

fn row_to_discount(row: &PgRow) -> Discount {
    Discount {
        id: row.get("id"),
        code: row.get("code"),
        kind: row.get("kind"),
        value: row.get("value"),
        valid_from: row.get("valid_from"),
        valid_to: row.get("valid_to"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl DiscountRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Discount>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM discounts WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_discount))
    }

    async fn get_by_code(&self, code: &str) -> AppResult<Option<Discount>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM discounts WHERE code = $1",
            SELECT_COLS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_discount))
    }

    async fn list(&self) -> AppResult<Vec<Discount>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM discounts ORDER BY code",
            SELECT_COLS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_discount).collect())
    }

    async fn insert(&self, discount: &Discount) -> AppResult<Discount> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO discounts (id, code, kind, value, valid_from, valid_to, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(discount.id)
        .bind(&discount.code)
        .bind(discount.kind)
        .bind(discount.value)
        .bind(discount.valid_from)
        .bind(discount.valid_to)
        .bind(discount.status)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_discount(&row))
    }

    async fn update(&self, discount: &Discount) -> AppResult<Discount> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE discounts SET
                code = $2, kind = $3, value = $4, valid_from = $5, valid_to = $6,
                status = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(discount.id)
        .bind(&discount.code)
        .bind(discount.kind)
        .bind(discount.value)
        .bind(discount.valid_from)
        .bind(discount.valid_to)
        .bind(discount.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_discount).ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM discounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
