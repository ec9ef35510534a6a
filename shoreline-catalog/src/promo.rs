use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "percentage" => Some(DiscountType::Percentage),
            "fixed" => Some(DiscountType::Fixed),
            _ => None,
        }
    }
}

/// Stored promotional code rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub usage_cap: Option<i32>,
    pub usage_count: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PromoCode {
    /// Canonical form used for storage and lookup.
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_cap.is_some_and(|cap| self.usage_count >= cap)
    }

    /// Discount this code grants on `order_total`. Percentage discounts are not
    /// floored here; fixed discounts never exceed the order.
    pub fn discount_for(&self, order_total: Decimal) -> Decimal {
        match self.discount_type {
            DiscountType::Percentage => order_total * self.discount_value / Decimal::ONE_HUNDRED,
            DiscountType::Fixed => self.discount_value.min(order_total),
        }
    }

    pub fn descriptor(&self) -> PromoDescriptor {
        PromoDescriptor {
            promo_code_id: self.id,
            code: self.code.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
        }
    }
}

/// What a caller learns about a code that passed validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoDescriptor {
    pub promo_code_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoApplication {
    pub discount_amount: Decimal,
    pub descriptor: PromoDescriptor,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PromoRejection {
    #[error("Promo code not found")]
    NotFound,

    #[error("Promo code is not active")]
    Inactive,

    #[error("Promo code has expired")]
    Expired,

    #[error("Promo code has reached its usage limit")]
    CapReached,

    #[error("Order total is below the promo minimum of {minimum}")]
    BelowMinimum { minimum: Decimal },
}

impl PromoRejection {
    /// Stable machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            PromoRejection::NotFound => "promo_not_found",
            PromoRejection::Inactive => "promo_inactive",
            PromoRejection::Expired => "promo_expired",
            PromoRejection::CapReached => "promo_cap_reached",
            PromoRejection::BelowMinimum { .. } => "promo_below_minimum",
        }
    }
}

/// Checks a looked-up code against its rules. Read-only: never touches the
/// usage counter, so it is safe to call on every keystroke.
pub struct PromoValidator;

impl PromoValidator {
    pub fn validate(
        promo: Option<&PromoCode>,
        order_total: Decimal,
        now: DateTime<Utc>,
    ) -> Result<PromoApplication, PromoRejection> {
        let promo = promo.ok_or(PromoRejection::NotFound)?;

        if !promo.is_active {
            return Err(PromoRejection::Inactive);
        }

        if promo.starts_at.is_some_and(|starts| now < starts) {
            return Err(PromoRejection::Inactive);
        }

        if promo.expires_at.is_some_and(|expires| now >= expires) {
            return Err(PromoRejection::Expired);
        }

        if promo.is_exhausted() {
            return Err(PromoRejection::CapReached);
        }

        if let Some(minimum) = promo.min_order_value {
            if order_total < minimum {
                return Err(PromoRejection::BelowMinimum { minimum });
            }
        }

        Ok(PromoApplication {
            discount_amount: promo.discount_for(order_total),
            descriptor: promo.descriptor(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn promo(discount_type: DiscountType, value: i64) -> PromoCode {
        PromoCode {
            id: Uuid::new_v4(),
            code: "SUMMER10".to_string(),
            discount_type,
            discount_value: Decimal::from(value),
            min_order_value: None,
            usage_cap: None,
            usage_count: 0,
            is_active: true,
            starts_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(PromoCode::normalize("  summer10 "), "SUMMER10");
    }

    #[test]
    fn test_percentage_discount() {
        let code = promo(DiscountType::Percentage, 10);
        let applied = PromoValidator::validate(Some(&code), Decimal::from(7000), Utc::now()).unwrap();

        assert_eq!(applied.discount_amount, Decimal::from(700));
        assert_eq!(applied.descriptor.code, "SUMMER10");
    }

    #[test]
    fn test_fixed_discount_capped_at_order_total() {
        let code = promo(DiscountType::Fixed, 1000);
        let applied = PromoValidator::validate(Some(&code), Decimal::from(500), Utc::now()).unwrap();

        assert_eq!(applied.discount_amount, Decimal::from(500));
    }

    #[test]
    fn test_rejections() {
        let now = Utc::now();
        let order = Decimal::from(1000);

        assert_eq!(
            PromoValidator::validate(None, order, now),
            Err(PromoRejection::NotFound)
        );

        let mut inactive = promo(DiscountType::Fixed, 100);
        inactive.is_active = false;
        assert_eq!(
            PromoValidator::validate(Some(&inactive), order, now),
            Err(PromoRejection::Inactive)
        );

        let mut not_started = promo(DiscountType::Fixed, 100);
        not_started.starts_at = Some(now + Duration::days(1));
        assert_eq!(
            PromoValidator::validate(Some(&not_started), order, now),
            Err(PromoRejection::Inactive)
        );

        let mut expired = promo(DiscountType::Fixed, 100);
        expired.expires_at = Some(now - Duration::seconds(1));
        assert_eq!(
            PromoValidator::validate(Some(&expired), order, now),
            Err(PromoRejection::Expired)
        );

        let mut exhausted = promo(DiscountType::Fixed, 100);
        exhausted.usage_cap = Some(5);
        exhausted.usage_count = 5;
        assert_eq!(
            PromoValidator::validate(Some(&exhausted), order, now),
            Err(PromoRejection::CapReached)
        );

        let mut minimum = promo(DiscountType::Fixed, 100);
        minimum.min_order_value = Some(Decimal::from(2000));
        assert_eq!(
            PromoValidator::validate(Some(&minimum), order, now),
            Err(PromoRejection::BelowMinimum { minimum: Decimal::from(2000) })
        );
    }

    #[test]
    fn test_rejection_codes_are_stable() {
        assert_eq!(PromoRejection::NotFound.code(), "promo_not_found");
        assert_eq!(PromoRejection::CapReached.code(), "promo_cap_reached");
        assert_eq!(
            PromoRejection::BelowMinimum { minimum: Decimal::ONE }.code(),
            "promo_below_minimum"
        );
    }

    #[test]
    fn test_validation_does_not_touch_usage() {
        let mut code = promo(DiscountType::Percentage, 5);
        code.usage_cap = Some(1);
        for _ in 0..10 {
            PromoValidator::validate(Some(&code), Decimal::from(100), Utc::now()).unwrap();
        }
        assert_eq!(code.usage_count, 0);
    }

    proptest! {
        #[test]
        fn prop_fixed_discount_bounded_by_order(value in 0i64..1_000_000, total in 0i64..1_000_000) {
            let code = promo(DiscountType::Fixed, value);
            let applied = PromoValidator::validate(Some(&code), Decimal::from(total), Utc::now()).unwrap();
            prop_assert!(applied.discount_amount <= Decimal::from(total));
        }

        #[test]
        fn prop_percentage_discount_is_exact(value in 0i64..=100, total in 0i64..1_000_000) {
            let code = promo(DiscountType::Percentage, value);
            let applied = PromoValidator::validate(Some(&code), Decimal::from(total), Utc::now()).unwrap();
            prop_assert_eq!(
                applied.discount_amount,
                Decimal::from(total) * Decimal::from(value) / Decimal::ONE_HUNDRED
            );
        }
    }
}
