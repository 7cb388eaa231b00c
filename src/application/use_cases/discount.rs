use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{actor::Actor, validators::is_valid_discount_code},
    domain::entities::discount::{Discount, DiscountKind, DiscountStatus},
};

#[async_trait]
pub trait DiscountRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Discount>>;
    async fn get_by_code(&self, code: &str) -> AppResult<Option<Discount>>;
    async fn list(&self) -> AppResult<Vec<Discount>>;
    async fn insert(&self, discount: &Discount) -> AppResult<Discount>;
    async fn update(&self, discount: &Discount) -> AppResult<Discount>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDiscountInput {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<DiscountStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDiscountInput {
    #[serde(rename = "type")]
    pub kind: Option<DiscountKind>,
    pub value: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub status: Option<DiscountStatus>,
}

#[derive(Clone)]
pub struct DiscountUseCases {
    repo: Arc<dyn DiscountRepo>,
}

impl DiscountUseCases {
    pub fn new(repo: Arc<dyn DiscountRepo>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, actor: &Actor) -> AppResult<Vec<Discount>> {
        actor.require_admin()?;
        self.repo.list().await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Discount> {
        actor.require_admin()?;
        self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)
    }

    /// Look up a code that a customer wants to apply right now.
    #[instrument(skip(self))]
    pub async fn redeemable(&self, code: &str, at: DateTime<Utc>) -> AppResult<Discount> {
        let code = normalise_code(code);
        let discount = self
            .repo
            .get_by_code(&code)
            .await?
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown discount code '{}'", code)))?;

        if !discount.is_redeemable_at(at) {
            return Err(AppError::InvalidInput(format!(
                "Discount code '{}' is not currently valid",
                code
            )));
        }
        Ok(discount)
    }

    #[instrument(skip(self))]
    pub async fn create(&self, actor: &Actor, input: CreateDiscountInput) -> AppResult<Discount> {
        actor.require_admin()?;

        let code = normalise_code(&input.code);
        if !is_valid_discount_code(&code) {
            return Err(AppError::InvalidInput(
                "Discount code must be 3-32 letters, digits, hyphens or underscores".into(),
            ));
        }
        if self.repo.get_by_code(&code).await?.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Discount code '{}' already exists",
                code
            )));
        }

        let discount = Discount {
            id: Uuid::new_v4(),
            code,
            kind: input.kind,
            value: input.value,
            valid_from: input.valid_from,
            valid_to: input.valid_to,
            status: input.status.unwrap_or(DiscountStatus::Active),
            created_at: None,
            updated_at: None,
        };
        validate(&discount)?;

        let created = self.repo.insert(&discount).await?;
        tracing::info!(discount_id = %created.id, code = %created.code, "Discount created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateDiscountInput,
    ) -> AppResult<Discount> {
        let mut discount = self.get(actor, id).await?;

        if let Some(kind) = input.kind {
            discount.kind = kind;
        }
        if let Some(value) = input.value {
            discount.value = value;
        }
        if let Some(from) = input.valid_from {
            discount.valid_from = from;
        }
        if let Some(to) = input.valid_to {
            discount.valid_to = to;
        }
        if let Some(status) = input.status {
            discount.status = status;
        }
        validate(&discount)?;

        self.repo.update(&discount).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

fn normalise_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn validate(discount: &Discount) -> AppResult<()> {
    if discount.value <= 0 {
        return Err(AppError::InvalidInput(
            "Discount value must be positive".into(),
        ));
    }
    if discount.kind == DiscountKind::Percentage && discount.value > 100 {
        return Err(AppError::InvalidInput(
            "Percentage discount cannot exceed 100".into(),
        ));
    }
    if discount.valid_from >= discount.valid_to {
        return Err(AppError::InvalidInput(
            "valid_from must be before valid_to".into(),
        ));
    }
    Ok(())
}
