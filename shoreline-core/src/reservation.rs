use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shoreline_catalog::TransportType;
use shoreline_shared::Masked;
use uuid::Uuid;

use crate::payment::AuthorizationOutcome;

/// Reservation status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Failed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Failed => "failed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(ReservationStatus::Pending),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "failed" => Some(ReservationStatus::Failed),
            "cancelled" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }

    /// Transition: Pending → Confirmed | Failed | Cancelled, driven by the
    /// processor's outcome. Terminal states never move again.
    pub fn settle(self, outcome: AuthorizationOutcome) -> Result<ReservationStatus, TransitionError> {
        let target = match outcome {
            AuthorizationOutcome::Succeeded => ReservationStatus::Confirmed,
            AuthorizationOutcome::Failed => ReservationStatus::Failed,
            AuthorizationOutcome::Canceled => ReservationStatus::Cancelled,
        };

        if self != ReservationStatus::Pending {
            return Err(TransitionError {
                from: self,
                to: target,
            });
        }

        Ok(target)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid state transition from {from} to {to}")]
pub struct TransitionError {
    pub from: ReservationStatus,
    pub to: ReservationStatus,
}

/// Activity start time, or "flexible" when the guest has not picked one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSlot {
    Flexible,
    At(NaiveTime),
}

impl TimeSlot {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("flexible") {
            return Some(TimeSlot::Flexible);
        }
        NaiveTime::parse_from_str(raw, "%H:%M").ok().map(TimeSlot::At)
    }
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeSlot::Flexible => f.write_str("flexible"),
            TimeSlot::At(time) => write!(f, "{}", time.format("%H:%M")),
        }
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeSlot::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time slot: {}", raw)))
    }
}

/// Header record of the reservation aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservationHeader {
    pub id: Uuid,
    pub reference_code: String,
    pub catalog_item_id: Uuid,
    pub activity_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub adult_count: u32,
    pub child_count: u32,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub promo_code_id: Option<Uuid>,
    pub currency: String,
    pub status: ReservationStatus,
    pub authorization_id: Option<String>,
    /// Operational annotation, e.g. a promo that ran out after payment
    pub notice: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Masked<String>,
    /// Including country code
    pub phone: Masked<String>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportDetails {
    pub transport_type: TransportType,
    pub hotel_name: Option<String>,
    pub room_number: Option<String>,
    pub non_player_count: u32,
    pub private_passengers: u32,
    pub transport_cost: Decimal,
}

/// Add-on line with the unit price snapshotted at booking time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddonLine {
    pub addon_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// The aggregate: header plus the child records it exclusively owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub header: ReservationHeader,
    pub customer: CustomerDetails,
    pub transport: TransportDetails,
    pub addons: Vec<AddonLine>,
}

impl Reservation {
    pub fn id(&self) -> Uuid {
        self.header.id
    }

    pub fn status(&self) -> ReservationStatus {
        self.header.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_from_pending() {
        let pending = ReservationStatus::Pending;
        assert_eq!(
            pending.settle(AuthorizationOutcome::Succeeded),
            Ok(ReservationStatus::Confirmed)
        );
        assert_eq!(
            pending.settle(AuthorizationOutcome::Failed),
            Ok(ReservationStatus::Failed)
        );
        assert_eq!(
            pending.settle(AuthorizationOutcome::Canceled),
            Ok(ReservationStatus::Cancelled)
        );
    }

    #[test]
    fn test_terminal_states_do_not_move() {
        for status in [
            ReservationStatus::Confirmed,
            ReservationStatus::Failed,
            ReservationStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
            assert!(status.settle(AuthorizationOutcome::Succeeded).is_err());
        }
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Failed,
            ReservationStatus::Cancelled,
        ] {
            assert_eq!(ReservationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReservationStatus::parse("paid"), None);
    }

    #[test]
    fn test_time_slot_parse() {
        assert_eq!(TimeSlot::parse("Flexible"), Some(TimeSlot::Flexible));
        assert_eq!(
            TimeSlot::parse("09:30"),
            Some(TimeSlot::At(NaiveTime::from_hms_opt(9, 30, 0).unwrap()))
        );
        assert_eq!(TimeSlot::parse("half past nine"), None);

        let json = serde_json::to_string(&TimeSlot::parse("14:00").unwrap()).unwrap();
        assert_eq!(json, "\"14:00\"");
    }
}
