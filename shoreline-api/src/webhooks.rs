use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use shoreline_core::reservation::ReservationStatus;
use shoreline_order::ReconciliationResult;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "payment-signature";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub reservation_id: Uuid,
    pub status: ReservationStatus,
    /// False when the delivery was a replay for a settled reservation
    pub applied: bool,
}

/// POST /v1/webhooks/payments
/// The raw body is needed for signature verification, so it is not parsed
/// by an extractor. Any 2xx stops the processor redelivering.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let result = state.listener.handle(signature, &body).await?;
    tracing::info!(
        reservation_id = %result.reservation_id(),
        status = %result.status(),
        "Payment webhook processed"
    );

    Ok(Json(WebhookAck {
        received: true,
        reservation_id: result.reservation_id(),
        status: result.status(),
        applied: matches!(result, ReconciliationResult::Applied { .. }),
    }))
}
