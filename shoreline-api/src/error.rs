use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shoreline_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),
    /// Body or path that could not be read at all
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let core = match self {
            AppError::BadRequest(msg) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response();
            }
            AppError::Core(err) => err,
        };

        let (status, body) = match core {
            CoreError::ValidationError(fields) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "fields": fields }),
            ),
            CoreError::PromoInvalid(rejection) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": rejection.to_string(), "code": rejection.code() }),
            ),
            CoreError::PaymentGatewayError(e) => {
                tracing::warn!("Payment gateway error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "Payment provider unavailable, please retry" }),
                )
            }
            CoreError::PersistenceError(e) => {
                tracing::error!("Internal Server Error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal Server Error" }))
            }
            CoreError::ReconciliationSignatureError(msg) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": msg }))
            }
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}
