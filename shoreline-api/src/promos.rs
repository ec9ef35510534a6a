use axum::{extract::rejection::JsonRejection, extract::State, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use shoreline_order::PromoValidation;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    pub code: String,
    pub order_total: Decimal,
}

/// POST /v1/promos/validate
/// Never consumes a redemption; clients call this on every edit.
pub async fn validate_promo(
    State(state): State<AppState>,
    payload: Result<Json<ValidatePromoRequest>, JsonRejection>,
) -> Result<Json<PromoValidation>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let result = state
        .orchestrator
        .validate_promo(&request.code, request.order_total)
        .await?;
    Ok(Json(result))
}
