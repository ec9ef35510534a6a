use rust_decimal::Decimal;
use uuid::Uuid;

/// Topic names for reservation lifecycle events.
pub mod topics {
    pub const RESERVATION_CREATED: &str = "reservation.created";
    pub const RESERVATION_CONFIRMED: &str = "reservation.confirmed";
    pub const RESERVATION_FAILED: &str = "reservation.failed";
    pub const RESERVATION_CANCELLED: &str = "reservation.cancelled";
    pub const PROMO_REDEEMED: &str = "promo.redeemed";
    pub const PROMO_LIMIT_REACHED: &str = "promo.limit_reached";
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationCreatedEvent {
    pub reservation_id: Uuid,
    pub reference_code: String,
    pub catalog_item_id: Uuid,
    pub total_amount: Decimal,
    pub currency: String,
    pub timestamp: i64,
}

/// Emitted for every terminal transition (confirmed, failed, cancelled).
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationSettledEvent {
    pub reservation_id: Uuid,
    pub reference_code: String,
    pub authorization_id: String,
    pub status: String,
    pub total_amount: Decimal,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PromoUsageEvent {
    pub promo_code_id: Uuid,
    pub reservation_id: Uuid,
    pub code: String,
    pub timestamp: i64,
}
