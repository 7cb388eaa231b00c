use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::billing_cycle::BillingCycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanCategory {
    Basic,
    Premium,
    Enterprise,
    Trial,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Fibernet,
    BroadbandCopper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Inactive,
    Deprecated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanVisibility {
    Public,
    Private,
    Hidden,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialUnit {
    #[default]
    Days,
    Weeks,
    Months,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTrial {
    pub available: bool,
    pub duration: u32,
    pub unit: TrialUnit,
}

impl Default for PlanTrial {
    fn default() -> Self {
        Self {
            available: false,
            duration: 7,
            unit: TrialUnit::Days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFeature {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_included")]
    pub included: bool,
    #[serde(default)]
    pub limit: Option<i64>,
}

fn default_included() -> bool {
    true
}

/// Per-cycle pricing in minor currency units. Quarterly and yearly discounts
/// are whole percentages applied to the equivalent run of monthly charges.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanPricing {
    pub monthly_cents: i64,
    pub currency: String,
    #[serde(default)]
    pub quarterly_cents: Option<i64>,
    #[serde(default)]
    pub quarterly_discount_pct: Option<u8>,
    #[serde(default)]
    pub yearly_cents: Option<i64>,
    #[serde(default)]
    pub yearly_discount_pct: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: PlanCategory,
    pub product_type: ProductType,
    pub data_quota_gb: Option<i64>,
    pub speed: Option<String>,
    pub pricing: PlanPricing,
    pub features: Vec<PlanFeature>,
    pub status: PlanStatus,
    pub visibility: PlanVisibility,
    pub trial: PlanTrial,
    pub setup_fee_cents: i64,
    pub sort_order: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlanPricing {
    /// Derive quarterly and yearly amounts from their discount percentages.
    pub fn apply_cycle_discounts(&mut self) {
        if let Some(pct) = self.quarterly_discount_pct.filter(|p| *p > 0) {
            self.quarterly_cents = Some(discounted(self.monthly_cents * 3, pct));
        }
        if let Some(pct) = self.yearly_discount_pct.filter(|p| *p > 0) {
            self.yearly_cents = Some(discounted(self.monthly_cents * 12, pct));
        }
    }
}

fn discounted(base_cents: i64, pct: u8) -> i64 {
    (base_cents as f64 * (1.0 - f64::from(pct) / 100.0)).round() as i64
}

impl Plan {
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    /// Charge for one billing cycle, falling back to the monthly run rate.
    pub fn price_for_cycle(&self, cycle: BillingCycle) -> i64 {
        let monthly = self.pricing.monthly_cents;
        match cycle {
            BillingCycle::Monthly => monthly,
            BillingCycle::Quarterly => self
                .pricing
                .quarterly_cents
                .filter(|c| *c > 0)
                .unwrap_or(monthly * 3),
            BillingCycle::Yearly => self
                .pricing
                .yearly_cents
                .filter(|c| *c > 0)
                .unwrap_or(monthly * 12),
        }
    }

    pub fn yearly_savings(&self) -> i64 {
        match self.pricing.yearly_cents {
            Some(yearly) if yearly > 0 && self.pricing.monthly_cents > 0 => {
                self.pricing.monthly_cents * 12 - yearly
            }
            _ => 0,
        }
    }

    pub fn quarterly_savings(&self) -> i64 {
        match self.pricing.quarterly_cents {
            Some(quarterly) if quarterly > 0 && self.pricing.monthly_cents > 0 => {
                self.pricing.monthly_cents * 3 - quarterly
            }
            _ => 0,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.features.iter().filter(|f| f.included).count()
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.find_feature(name).is_some_and(|f| f.included)
    }

    pub fn feature_limit(&self, name: &str) -> Option<i64> {
        self.find_feature(name).and_then(|f| f.limit)
    }

    fn find_feature(&self, name: &str) -> Option<&PlanFeature> {
        self.features
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// End of the trial window starting at `start`, if the plan offers one.
    /// `None` also when the window would end past the representable range.
    pub fn trial_end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.trial.available || self.trial.duration == 0 {
            return None;
        }
        let n = self.trial.duration;
        match self.trial.unit {
            TrialUnit::Days => start.checked_add_signed(Duration::try_days(i64::from(n))?),
            TrialUnit::Weeks => start.checked_add_signed(Duration::try_weeks(i64::from(n))?),
            TrialUnit::Months => start.checked_add_months(Months::new(n)),
        }
    }
}
