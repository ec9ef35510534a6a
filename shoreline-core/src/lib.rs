pub mod events;
pub mod payment;
pub mod repository;
pub mod reservation;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shoreline_catalog::PromoRejection;

pub use payment::GatewayError;
pub use repository::StoreError;

/// A single request field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {}", describe_fields(.0))]
    ValidationError(Vec<FieldError>),
    #[error("Promo code rejected: {0}")]
    PromoInvalid(#[from] PromoRejection),
    #[error("Payment gateway error: {0}")]
    PaymentGatewayError(#[from] GatewayError),
    #[error("Persistence error: {0}")]
    PersistenceError(#[from] StoreError),
    #[error("Reconciliation signature rejected: {0}")]
    ReconciliationSignatureError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl CoreError {
    pub fn invalid(field: &str, message: &str) -> Self {
        CoreError::ValidationError(vec![FieldError::new(field, message)])
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Source of "now", injectable so expiry checks are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_field() {
        let err = CoreError::ValidationError(vec![
            FieldError::new("adult_count", "must be at least 1"),
            FieldError::new("customer.email", "is not a valid email"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: adult_count: must be at least 1; customer.email: is not a valid email"
        );
    }

    #[test]
    fn test_promo_rejection_converts() {
        let err: CoreError = PromoRejection::Expired.into();
        assert!(matches!(err, CoreError::PromoInvalid(PromoRejection::Expired)));
    }
}
