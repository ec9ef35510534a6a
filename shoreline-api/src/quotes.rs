use axum::{extract::rejection::JsonRejection, extract::State, Json};
use shoreline_order::{Quote, QuoteRequest};

use crate::error::AppError;
use crate::state::AppState;

/// POST /v1/quotes
/// Price a prospective booking. Read-only and safe to repeat.
pub async fn create_quote(
    State(state): State<AppState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<Quote>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let quote = state.orchestrator.quote(&request).await?;
    Ok(Json(quote))
}
