use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "billing_cycle", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::Yearly => "yearly",
        }
    }

    /// Number of calendar months covered by one cycle.
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::Yearly => 12,
        }
    }

    /// Advance `from` by `cycles` whole billing cycles.
    ///
    /// Month arithmetic clamps to the last valid day of the target month,
    /// so Jan 31 + 1 month lands on Feb 28 (or Feb 29 in a leap year).
    /// Returns `None` when the result falls outside the representable range.
    pub fn advance(&self, from: DateTime<Utc>, cycles: u32) -> Option<DateTime<Utc>> {
        let months = self.months().checked_mul(cycles)?;
        from.checked_add_months(Months::new(months))
    }
}
