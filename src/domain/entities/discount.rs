use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subscription::{DiscountType, SubscriptionDiscount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "discount_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Flat,
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "discount_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountStatus {
    Active,
    Inactive,
}

/// A catalogue discount code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discount {
    pub id: Uuid,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    /// Whole percentage, or minor currency units for flat discounts.
    pub value: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub status: DiscountStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Discount {
    pub fn is_redeemable_at(&self, at: DateTime<Utc>) -> bool {
        self.status == DiscountStatus::Active && self.valid_from <= at && at <= self.valid_to
    }

    /// The discount as it is recorded on a subscription.
    pub fn to_subscription_discount(&self) -> SubscriptionDiscount {
        SubscriptionDiscount {
            amount: self.value,
            kind: match self.kind {
                DiscountKind::Flat => DiscountType::Fixed,
                DiscountKind::Percentage => DiscountType::Percentage,
            },
            code: Some(self.code.clone()),
        }
    }
}
