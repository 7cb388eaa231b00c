//! Test data factories.
//!
//! Each factory returns a complete, valid object. Use the closure parameter
//! to override specific fields.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    billing_cycle::BillingCycle,
    discount::{Discount, DiscountKind, DiscountStatus},
    plan::{
        Plan, PlanCategory, PlanFeature, PlanPricing, PlanStatus, PlanTrial, PlanVisibility,
        ProductType,
    },
    subscription::{Subscription, SubscriptionStatus, TrialPeriod},
    user::{User, UserRole, UserStatus},
};

/// Create a test plan: an active, public monthly fibre plan.
pub fn create_test_plan(overrides: impl FnOnce(&mut Plan)) -> Plan {
    let mut plan = Plan {
        id: Uuid::new_v4(),
        code: "fibernet-basic".to_string(),
        name: "Fibernet Basic".to_string(),
        description: "50 Mbps fibre broadband".to_string(),
        category: PlanCategory::Basic,
        product_type: ProductType::Fibernet,
        data_quota_gb: Some(500),
        speed: Some("50 Mbps".to_string()),
        pricing: PlanPricing {
            monthly_cents: 49_900,
            currency: "INR".to_string(),
            quarterly_cents: None,
            quarterly_discount_pct: None,
            yearly_cents: None,
            yearly_discount_pct: None,
        },
        features: vec![
            PlanFeature {
                name: "Unlimited calls".to_string(),
                description: None,
                included: true,
                limit: None,
            },
            PlanFeature {
                name: "OTT bundle".to_string(),
                description: Some("Streaming apps".to_string()),
                included: false,
                limit: None,
            },
        ],
        status: PlanStatus::Active,
        visibility: PlanVisibility::Public,
        trial: PlanTrial::default(),
        setup_fee_cents: 0,
        sort_order: 0,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut plan);
    plan
}

/// Create a test subscription: active, monthly, ending in the future.
pub fn create_test_subscription(overrides: impl FnOnce(&mut Subscription)) -> Subscription {
    let start = Utc::now() - Duration::days(10);
    let end = BillingCycle::Monthly.advance(start, 1).unwrap();
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        plan_id: Uuid::new_v4(),
        status: SubscriptionStatus::Active,
        start_date: start,
        end_date: end,
        next_billing_date: end,
        billing_cycle: BillingCycle::Monthly,
        price_cents: 49_900,
        currency: "INR".to_string(),
        discount: None,
        auto_renewal: true,
        trial: TrialPeriod::default(),
        notes: None,
        cancelled_at: None,
        cancel_reason: None,
        created_at: Some(start),
        updated_at: Some(start),
    };
    overrides(&mut subscription);
    subscription
}

/// Create a test discount: an active 10% code valid for the surrounding month.
pub fn create_test_discount(overrides: impl FnOnce(&mut Discount)) -> Discount {
    let now = Utc::now();
    let mut discount = Discount {
        id: Uuid::new_v4(),
        code: "SAVE10".to_string(),
        kind: DiscountKind::Percentage,
        value: 10,
        valid_from: now - Duration::days(15),
        valid_to: now + Duration::days(15),
        status: DiscountStatus::Active,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut discount);
    discount
}

/// Create a test user with a unique email. The password hash is a
/// placeholder; register through `UserUseCases` when login matters.
pub fn create_test_user(overrides: impl FnOnce(&mut User)) -> User {
    let id = Uuid::new_v4();
    let mut user = User {
        id,
        name: "Test User".to_string(),
        email: format!("user-{}@example.com", id.simple()),
        phone: "+919876543210".to_string(),
        password_hash: "not-a-real-hash".to_string(),
        status: UserStatus::Active,
        role: UserRole::User,
        email_verified: true,
        last_login: None,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut user);
    user
}

/// A fixed timestamp for deterministic fixtures.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}
