use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shoreline_catalog::TransportType;
use shoreline_core::reservation::{Reservation, ReservationStatus, TimeSlot};
use shoreline_order::{CreateReservationRequest, ReservationReceipt};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AddonLineResponse {
    pub addon_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// What the confirmation page shows. Contact details stay server side.
#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub reference_code: String,
    pub status: ReservationStatus,
    pub catalog_item_id: Uuid,
    pub activity_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub adult_count: u32,
    pub child_count: u32,
    pub customer_name: String,
    pub transport_type: TransportType,
    pub hotel_name: Option<String>,
    pub addons: Vec<AddonLineResponse>,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub notice: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        let header = r.header;
        Self {
            id: header.id,
            reference_code: header.reference_code,
            status: header.status,
            catalog_item_id: header.catalog_item_id,
            activity_date: header.activity_date,
            time_slot: header.time_slot,
            adult_count: header.adult_count,
            child_count: header.child_count,
            customer_name: r.customer.name,
            transport_type: r.transport.transport_type,
            hotel_name: r.transport.hotel_name,
            addons: r
                .addons
                .into_iter()
                .map(|a| AddonLineResponse {
                    addon_id: a.addon_id,
                    quantity: a.quantity,
                    unit_price: a.unit_price,
                })
                .collect(),
            discount_amount: header.discount_amount,
            total_amount: header.total_amount,
            currency: header.currency,
            notice: header.notice,
            created_at: header.created_at,
        }
    }
}

/// POST /v1/reservations
pub async fn create_reservation(
    State(state): State<AppState>,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationReceipt>), AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let receipt = state.orchestrator.create_reservation(&request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /v1/reservations/{id}
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state.orchestrator.get_reservation(id).await?;
    Ok(Json(ReservationResponse::from(reservation)))
}
