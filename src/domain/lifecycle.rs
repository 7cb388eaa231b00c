//! Subscription lifecycle: billing-date computation, renewal, cancellation and
//! the derived pricing/time values.
//!
//! Every mutating operation checks its preconditions before touching the
//! record, so a failed call leaves the subscription exactly as it was.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::entities::{
    billing_cycle::BillingCycle,
    subscription::{
        CancelReason, DiscountType, Subscription, SubscriptionDiscount, SubscriptionStatus,
        TrialPeriod,
    },
};

const MILLIS_PER_DAY: i64 = 86_400_000;
const MAX_NOTES_LEN: usize = 500;
/// Upper bound for a single renewal request (ten years of monthly cycles).
pub const MAX_RENEWAL_CYCLES: u32 = 120;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// `start` advanced by exactly one billing cycle.
pub fn compute_next_billing_date(
    start: DateTime<Utc>,
    cycle: BillingCycle,
) -> Result<DateTime<Utc>, LifecycleError> {
    advance_or_reject(cycle, start, 1)
}

fn advance_or_reject(
    cycle: BillingCycle,
    from: DateTime<Utc>,
    cycles: u32,
) -> Result<DateTime<Utc>, LifecycleError> {
    cycle
        .advance(from, cycles)
        .ok_or_else(|| LifecycleError::Validation("Billing date is out of range".into()))
}

/// Input for [`Subscription::create`].
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    /// Defaults to one billing cycle after `start_date`.
    pub end_date: Option<DateTime<Utc>>,
    pub billing_cycle: BillingCycle,
    pub price_cents: i64,
    pub currency: String,
    pub discount: Option<SubscriptionDiscount>,
    pub auto_renewal: bool,
    pub trial: TrialPeriod,
    pub notes: Option<String>,
}

impl Subscription {
    /// Build a new, validated `active` subscription with its billing date filled in.
    pub fn create(new: NewSubscription) -> Result<Self, LifecycleError> {
        let end_date = match new.end_date {
            Some(end) => end,
            None => advance_or_reject(new.billing_cycle, new.start_date, 1)?,
        };

        let mut subscription = Subscription {
            id: new.id.unwrap_or_else(Uuid::new_v4),
            user_id: new.user_id,
            plan_id: new.plan_id,
            status: SubscriptionStatus::Active,
            start_date: new.start_date,
            end_date,
            next_billing_date: new.start_date,
            billing_cycle: new.billing_cycle,
            price_cents: new.price_cents,
            currency: new.currency.trim().to_uppercase(),
            discount: new.discount,
            auto_renewal: new.auto_renewal,
            trial: new.trial,
            notes: new.notes,
            cancelled_at: None,
            cancel_reason: None,
            created_at: None,
            updated_at: None,
        };
        subscription.initialize(None)?;
        subscription.validate()?;
        Ok(subscription)
    }

    /// Check the field-level invariants that must hold before persisting.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.end_date <= self.start_date {
            return Err(LifecycleError::Validation(
                "End date must be after start date".into(),
            ));
        }
        if self.price_cents < 0 {
            return Err(LifecycleError::Validation("Price cannot be negative".into()));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(LifecycleError::Validation(
                "Currency must be a 3-letter code (e.g., USD, EUR)".into(),
            ));
        }
        if let Some(discount) = &self.discount {
            if discount.amount < 0 {
                return Err(LifecycleError::Validation(
                    "Discount amount cannot be negative".into(),
                ));
            }
            if discount.kind == DiscountType::Percentage && discount.amount > 100 {
                return Err(LifecycleError::Validation(
                    "Percentage discount cannot exceed 100".into(),
                ));
            }
        }
        if self.trial.is_active {
            match (self.trial.start_date, self.trial.end_date) {
                (Some(start), Some(end)) if end > start => {}
                _ => {
                    return Err(LifecycleError::Validation(
                        "Active trial needs a start date before its end date".into(),
                    ));
                }
            }
        }
        if self.status == SubscriptionStatus::Cancelled
            && (self.auto_renewal || self.cancelled_at.is_none())
        {
            return Err(LifecycleError::Validation(
                "A cancelled subscription cannot auto-renew and must keep its cancellation date"
                    .into(),
            ));
        }
        if let Some(notes) = &self.notes
            && notes.chars().count() > MAX_NOTES_LEN
        {
            return Err(LifecycleError::Validation(
                "Notes cannot exceed 500 characters".into(),
            ));
        }
        Ok(())
    }

    /// Recompute `next_billing_date` for a new record, or when `start_date` or
    /// `billing_cycle` differ from the previously stored version.
    pub fn initialize(&mut self, previous: Option<&Subscription>) -> Result<(), LifecycleError> {
        let needs_recompute = match previous {
            None => true,
            Some(prev) => {
                prev.start_date != self.start_date || prev.billing_cycle != self.billing_cycle
            }
        };
        if needs_recompute {
            self.next_billing_date =
                compute_next_billing_date(self.start_date, self.billing_cycle)?;
        }
        Ok(())
    }

    /// Extend the subscription by `cycles` billing cycles, anchored at the
    /// current `end_date`.
    pub fn renew(&mut self, cycles: u32) -> Result<(), LifecycleError> {
        if self.status != SubscriptionStatus::Active {
            return Err(LifecycleError::InvalidState(
                "cannot renew a non-active subscription".into(),
            ));
        }
        if cycles == 0 || cycles > MAX_RENEWAL_CYCLES {
            return Err(LifecycleError::Validation(format!(
                "Renewal must cover between 1 and {} billing cycles",
                MAX_RENEWAL_CYCLES
            )));
        }

        let new_end = advance_or_reject(self.billing_cycle, self.end_date, cycles)?;
        self.end_date = new_end;
        self.next_billing_date = new_end;
        Ok(())
    }

    /// Cancel the subscription. Cancelling again re-stamps the record.
    pub fn cancel(&mut self, reason: CancelReason, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancel_reason = Some(reason);
        self.auto_renewal = false;
    }

    /// Price after the attached discount, never below zero.
    pub fn effective_price_cents(&self) -> i64 {
        let Some(discount) = self.discount.as_ref().filter(|d| d.amount != 0) else {
            return self.price_cents;
        };

        match discount.kind {
            DiscountType::Percentage => {
                let factor = 1.0 - discount.amount as f64 / 100.0;
                ((self.price_cents as f64) * factor).round().max(0.0) as i64
            }
            DiscountType::Fixed => (self.price_cents - discount.amount).max(0),
        }
    }

    /// Whole days left until `end_date`, rounded up. Zero unless active.
    pub fn remaining_days(&self, now: DateTime<Utc>) -> i64 {
        if self.status != SubscriptionStatus::Active {
            return 0;
        }
        ceil_days((self.end_date - now).num_milliseconds()).max(0)
    }

    pub fn duration_days(&self) -> i64 {
        ceil_days((self.end_date - self.start_date).num_milliseconds())
    }

    pub fn is_in_trial(&self, now: DateTime<Utc>) -> bool {
        if !self.trial.is_active {
            return false;
        }
        match (self.trial.start_date, self.trial.end_date) {
            (Some(start), Some(end)) => now >= start && now <= end,
            _ => false,
        }
    }

    /// Active and not past its end date.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && now <= self.end_date
    }
}

fn ceil_days(millis: i64) -> i64 {
    if millis <= 0 {
        return millis / MILLIS_PER_DAY;
    }
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn new_subscription(start: DateTime<Utc>, cycle: BillingCycle) -> NewSubscription {
        NewSubscription {
            id: None,
            user_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            start_date: start,
            end_date: None,
            billing_cycle: cycle,
            price_cents: 1000,
            currency: "usd".into(),
            discount: None,
            auto_renewal: true,
            trial: TrialPeriod::default(),
            notes: None,
        }
    }

    fn active_with_end(end: DateTime<Utc>, cycle: BillingCycle) -> Subscription {
        let mut input = new_subscription(utc(2024, 12, 10), cycle);
        input.end_date = Some(end);
        Subscription::create(input).unwrap()
    }

    #[test]
    fn compute_next_billing_date_per_cycle() {
        let start = utc(2025, 1, 31);
        assert_eq!(
            compute_next_billing_date(start, BillingCycle::Monthly),
            Ok(utc(2025, 2, 28))
        );
        assert_eq!(
            compute_next_billing_date(start, BillingCycle::Quarterly),
            Ok(utc(2025, 4, 30))
        );
        assert_eq!(
            compute_next_billing_date(start, BillingCycle::Yearly),
            Ok(utc(2026, 1, 31))
        );
    }

    #[test]
    fn create_fills_next_billing_date_and_defaults_end() {
        let sub = Subscription::create(new_subscription(utc(2025, 3, 1), BillingCycle::Quarterly))
            .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.next_billing_date, utc(2025, 6, 1));
        assert_eq!(sub.end_date, utc(2025, 6, 1));
        assert_eq!(sub.currency, "USD");
    }

    #[test]
    fn create_then_renew_advances_quarterly() {
        let mut sub =
            Subscription::create(new_subscription(utc(2025, 3, 1), BillingCycle::Quarterly))
                .unwrap();
        assert_eq!(sub.next_billing_date, utc(2025, 6, 1));

        sub.renew(1).unwrap();

        assert_eq!(sub.next_billing_date, utc(2025, 9, 1));
        assert_eq!(sub.end_date, utc(2025, 9, 1));
    }

    #[test]
    fn create_rejects_end_before_start() {
        let mut input = new_subscription(utc(2025, 3, 1), BillingCycle::Monthly);
        input.end_date = Some(utc(2025, 3, 1));

        let err = Subscription::create(input).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
    }

    #[test]
    fn create_rejects_negative_price_and_bad_currency() {
        let mut input = new_subscription(utc(2025, 3, 1), BillingCycle::Monthly);
        input.price_cents = -1;
        assert!(matches!(
            Subscription::create(input).unwrap_err(),
            LifecycleError::Validation(_)
        ));

        let mut input = new_subscription(utc(2025, 3, 1), BillingCycle::Monthly);
        input.currency = "US".into();
        assert!(matches!(
            Subscription::create(input).unwrap_err(),
            LifecycleError::Validation(_)
        ));
    }

    #[test]
    fn create_rejects_percentage_over_hundred() {
        let mut input = new_subscription(utc(2025, 3, 1), BillingCycle::Monthly);
        input.discount = Some(SubscriptionDiscount {
            amount: 150,
            kind: DiscountType::Percentage,
            code: None,
        });
        assert!(Subscription::create(input).is_err());
    }

    #[test]
    fn initialize_recomputes_only_when_schedule_changes() {
        let original =
            Subscription::create(new_subscription(utc(2025, 1, 10), BillingCycle::Monthly))
                .unwrap();

        let mut untouched = original.clone();
        untouched.next_billing_date = utc(2030, 1, 1);
        untouched.initialize(Some(&original)).unwrap();
        assert_eq!(untouched.next_billing_date, utc(2030, 1, 1));

        let mut recycled = original.clone();
        recycled.billing_cycle = BillingCycle::Yearly;
        recycled.initialize(Some(&original)).unwrap();
        assert_eq!(recycled.next_billing_date, utc(2026, 1, 10));

        let mut moved = original.clone();
        moved.start_date = utc(2025, 2, 1);
        moved.initialize(Some(&original)).unwrap();
        assert_eq!(moved.next_billing_date, utc(2025, 3, 1));
    }

    #[test]
    fn renew_monthly_from_end_date() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);

        sub.renew(1).unwrap();

        assert_eq!(sub.end_date, utc(2025, 2, 10));
        assert_eq!(sub.next_billing_date, utc(2025, 2, 10));
    }

    #[test]
    fn renew_multiple_cycles() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Yearly);
        sub.renew(2).unwrap();
        assert_eq!(sub.end_date, utc(2027, 1, 10));
    }

    #[test]
    fn renew_cancelled_fails_without_mutation() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        sub.cancel(CancelReason::UserRequest, utc(2025, 1, 5));
        let before = sub.clone();

        let err = sub.renew(1).unwrap_err();

        assert!(matches!(err, LifecycleError::InvalidState(_)));
        assert_eq!(sub, before);
    }

    #[test]
    fn renew_zero_cycles_is_validation_error() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        let before = sub.clone();
        assert!(matches!(
            sub.renew(0).unwrap_err(),
            LifecycleError::Validation(_)
        ));
        assert_eq!(sub, before);
    }

    #[test]
    fn renew_beyond_cycle_limit_is_rejected_unchanged() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        let before = sub.clone();

        for cycles in [MAX_RENEWAL_CYCLES + 1, 4_000_000, u32::MAX] {
            assert!(matches!(
                sub.renew(cycles).unwrap_err(),
                LifecycleError::Validation(_)
            ));
        }
        assert_eq!(sub, before);

        sub.renew(MAX_RENEWAL_CYCLES).unwrap();
        assert_eq!(sub.end_date, utc(2035, 1, 10));
    }

    #[test]
    fn renew_past_calendar_range_is_validation_error() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Yearly);
        sub.end_date = DateTime::<Utc>::MAX_UTC - Duration::days(30);
        let before = sub.clone();

        assert!(matches!(
            sub.renew(1).unwrap_err(),
            LifecycleError::Validation(_)
        ));
        assert_eq!(sub, before);
    }

    #[test]
    fn create_near_calendar_limit_is_validation_error() {
        let start = DateTime::<Utc>::MAX_UTC - Duration::days(10);
        let err = Subscription::create(new_subscription(start, BillingCycle::Monthly)).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));

        let mut input = new_subscription(start, BillingCycle::Monthly);
        input.end_date = Some(DateTime::<Utc>::MAX_UTC);
        assert!(matches!(
            Subscription::create(input).unwrap_err(),
            LifecycleError::Validation(_)
        ));
    }

    #[test]
    fn validate_rejects_auto_renewing_cancelled_record() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        sub.cancel(CancelReason::UserRequest, utc(2025, 1, 3));
        assert!(sub.validate().is_ok());

        let mut renewing = sub.clone();
        renewing.auto_renewal = true;
        assert!(matches!(
            renewing.validate().unwrap_err(),
            LifecycleError::Validation(_)
        ));

        let mut unstamped = sub.clone();
        unstamped.cancelled_at = None;
        assert!(unstamped.validate().is_err());
    }

    #[test]
    fn cancel_stamps_record() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        let now = utc(2025, 1, 3);

        sub.cancel(CancelReason::default(), now);

        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(!sub.auto_renewal);
        assert_eq!(sub.cancelled_at, Some(now));
        assert_eq!(sub.cancel_reason, Some(CancelReason::UserRequest));
    }

    #[test]
    fn cancel_twice_restamps() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        sub.cancel(CancelReason::UserRequest, utc(2025, 1, 3));
        sub.cancel(CancelReason::AdminAction, utc(2025, 1, 4));

        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert_eq!(sub.cancelled_at, Some(utc(2025, 1, 4)));
        assert_eq!(sub.cancel_reason, Some(CancelReason::AdminAction));
    }

    #[test]
    fn effective_price_percentage() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        sub.discount = Some(SubscriptionDiscount {
            amount: 20,
            kind: DiscountType::Percentage,
            code: Some("SAVE20".into()),
        });
        assert_eq!(sub.effective_price_cents(), 800);
    }

    #[test]
    fn effective_price_fixed_is_floored_at_zero() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        sub.discount = Some(SubscriptionDiscount {
            amount: 1200,
            kind: DiscountType::Fixed,
            code: None,
        });
        assert_eq!(sub.effective_price_cents(), 0);

        sub.discount.as_mut().unwrap().amount = 250;
        assert_eq!(sub.effective_price_cents(), 750);
    }

    #[test]
    fn effective_price_without_discount_amount() {
        let mut sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        assert_eq!(sub.effective_price_cents(), 1000);

        sub.discount = Some(SubscriptionDiscount {
            amount: 0,
            kind: DiscountType::Fixed,
            code: None,
        });
        assert_eq!(sub.effective_price_cents(), 1000);
    }

    #[test]
    fn remaining_days_for_active() {
        let now = utc(2025, 1, 1);
        let sub = active_with_end(now + Duration::days(5), BillingCycle::Monthly);
        assert_eq!(sub.remaining_days(now), 5);

        // Partial days round up
        assert_eq!(sub.remaining_days(now + Duration::hours(1)), 5);
        // Past end date floors at zero
        assert_eq!(sub.remaining_days(now + Duration::days(9)), 0);
    }

    #[test]
    fn remaining_days_zero_when_cancelled() {
        let now = utc(2025, 1, 1);
        let mut sub = active_with_end(now + Duration::days(5), BillingCycle::Monthly);
        sub.cancel(CancelReason::UserRequest, now);
        assert_eq!(sub.remaining_days(now), 0);
    }

    #[test]
    fn duration_days_spans_start_to_end() {
        let sub = Subscription::create(new_subscription(utc(2025, 1, 1), BillingCycle::Monthly))
            .unwrap();
        assert_eq!(sub.duration_days(), 31);
    }

    #[test]
    fn trial_window_membership() {
        let mut input = new_subscription(utc(2025, 1, 1), BillingCycle::Monthly);
        input.trial = TrialPeriod {
            is_active: true,
            start_date: Some(utc(2025, 1, 1)),
            end_date: Some(utc(2025, 1, 8)),
        };
        let sub = Subscription::create(input).unwrap();

        assert!(sub.is_in_trial(utc(2025, 1, 5)));
        assert!(!sub.is_in_trial(utc(2025, 1, 9)));
    }

    #[test]
    fn is_current_requires_active_and_unexpired() {
        let sub = active_with_end(utc(2025, 1, 10), BillingCycle::Monthly);
        assert!(sub.is_current(utc(2025, 1, 9)));
        assert!(!sub.is_current(utc(2025, 1, 11)));
    }
}
