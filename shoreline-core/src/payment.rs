use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final result the processor reports for an authorization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationOutcome {
    Succeeded,
    Failed,
    Canceled,
}

impl AuthorizationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationOutcome::Succeeded => "succeeded",
            AuthorizationOutcome::Failed => "failed",
            AuthorizationOutcome::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub reservation_id: Uuid,
    pub amount_minor_units: i64,
    pub currency: String,
    pub reference_code: String,
    /// Shown on the guest's card statement
    pub description: String,
}

/// Hold created with the processor. `client_secret` goes to the browser so it
/// can finish the challenge directly with the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    pub authorization_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway timed out")]
    Timeout,
    #[error("payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
    #[error("unexpected payment gateway response: {0}")]
    InvalidResponse(String),
    #[error("amount cannot be charged: {0}")]
    InvalidAmount(Decimal),
}

/// The only component that talks to the external processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an authorization (hold) for the given amount
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization, GatewayError>;
}

/// Convert a major-unit amount to the processor's minor units (x100).
pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .filter(|units| *units >= 0)
        .ok_or(GatewayError::InvalidAmount(amount))
}
