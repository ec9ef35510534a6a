use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shoreline_catalog::{
    PriceBreakdown, PromoApplication, PromoDescriptor, PromoRejection, TransportType,
};
use shoreline_core::reservation::TimeSlot;
use shoreline_core::FieldError;
use uuid::Uuid;

/// Upper bound for any guest, passenger or add-on count in one booking
pub const MAX_COUNT: i64 = 1_000;

fn check_count(errors: &mut Vec<FieldError>, field: impl Into<String>, value: i64, min: i64) {
    if value < min {
        errors.push(FieldError::new(field, format!("must be at least {}", min)));
    } else if value > MAX_COUNT {
        errors.push(FieldError::new(field, format!("must be at most {}", MAX_COUNT)));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonSelection {
    /// Add-on id or slug
    pub addon_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportRequest {
    pub kind: TransportType,
    #[serde(default)]
    pub non_player_count: i64,
    #[serde(default)]
    pub private_passengers: i64,
    #[serde(default)]
    pub hotel_name: Option<String>,
    #[serde(default)]
    pub room_number: Option<String>,
}

/// The priced part of a booking: what to buy and how many.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Package id or slug
    pub catalog_item_id: String,
    pub adult_count: i64,
    #[serde(default)]
    pub child_count: i64,
    #[serde(default)]
    pub addon_selections: Vec<AddonSelection>,
    pub transport: TransportRequest,
    #[serde(default)]
    pub promo_code: Option<String>,
}

impl QuoteRequest {
    /// Trimmed promo code, `None` when absent or blank
    pub fn promo_code(&self) -> Option<&str> {
        self.promo_code.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    pub(crate) fn collect_errors(&self, errors: &mut Vec<FieldError>) {
        if self.catalog_item_id.trim().is_empty() {
            errors.push(FieldError::new("catalog_item_id", "is required"));
        }
        check_count(errors, "adult_count", self.adult_count, 1);
        check_count(errors, "child_count", self.child_count, 0);
        for (i, selection) in self.addon_selections.iter().enumerate() {
            if selection.addon_id.trim().is_empty() {
                errors.push(FieldError::new(format!("addon_selections[{}].addon_id", i), "is required"));
            }
            check_count(errors, format!("addon_selections[{}].quantity", i), selection.quantity, 0);
        }
        check_count(errors, "transport.non_player_count", self.transport.non_player_count, 0);
        check_count(errors, "transport.private_passengers", self.transport.private_passengers, 0);
    }

    pub(crate) fn collect_booking_errors(&self, errors: &mut Vec<FieldError>) {
        if self.transport.kind == TransportType::HotelPickup
            && self.transport.hotel_name.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            errors.push(FieldError::new("transport.hotel_name", "is required for hotel pickup"));
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRequest {
    pub name: String,
    pub email: String,
    /// With country code, e.g. +66 81 234 5678
    pub phone: String,
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl CustomerRequest {
    fn collect_errors(&self, errors: &mut Vec<FieldError>) {
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("customer.name", "is required"));
        }
        if !looks_like_email(self.email.trim()) {
            errors.push(FieldError::new("customer.email", "is not a valid email"));
        }
        let digits = self.phone.chars().filter(char::is_ascii_digit).count();
        if !self.phone.trim().starts_with('+') || digits < 7 {
            errors.push(FieldError::new("customer.phone", "must include a country code"));
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    #[serde(flatten)]
    pub quote: QuoteRequest,
    /// YYYY-MM-DD
    pub activity_date: String,
    /// "HH:MM" or "flexible"; absent means flexible
    #[serde(default)]
    pub time_slot: Option<String>,
    pub customer: CustomerRequest,
    /// What the client displayed. Logged when it disagrees, never used.
    #[serde(default)]
    pub client_total: Option<Decimal>,
}

/// Booking fields parsed out of a structurally valid request
pub(crate) struct Schedule {
    pub activity_date: NaiveDate,
    pub time_slot: TimeSlot,
}

impl CreateReservationRequest {
    pub(crate) fn validate(&self, today: NaiveDate) -> Result<Schedule, Vec<FieldError>> {
        let mut errors = Vec::new();
        self.quote.collect_errors(&mut errors);
        self.quote.collect_booking_errors(&mut errors);
        self.customer.collect_errors(&mut errors);

        let activity_date = match NaiveDate::parse_from_str(self.activity_date.trim(), "%Y-%m-%d") {
            Ok(date) if date < today => {
                errors.push(FieldError::new("activity_date", "must not be in the past"));
                None
            }
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(FieldError::new("activity_date", "must be a date formatted YYYY-MM-DD"));
                None
            }
        };

        let time_slot = match self.time_slot.as_deref() {
            None => Some(TimeSlot::Flexible),
            Some(raw) => {
                let parsed = TimeSlot::parse(raw);
                if parsed.is_none() {
                    errors.push(FieldError::new("time_slot", "must be HH:MM or \"flexible\""));
                }
                parsed
            }
        };

        match (activity_date, time_slot) {
            (Some(activity_date), Some(time_slot)) if errors.is_empty() => Ok(Schedule {
                activity_date,
                time_slot,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoRejectionView {
    pub code: String,
    pub message: String,
}

impl From<&PromoRejection> for PromoRejectionView {
    fn from(rejection: &PromoRejection) -> Self {
        Self {
            code: rejection.code().to_string(),
            message: rejection.to_string(),
        }
    }
}

/// Answer to a standalone promo check. Carries either the discount or the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoValidation {
    pub valid: bool,
    pub discount_amount: Option<Decimal>,
    pub promo: Option<PromoDescriptor>,
    pub reason: Option<PromoRejectionView>,
}

impl From<Result<PromoApplication, PromoRejection>> for PromoValidation {
    fn from(result: Result<PromoApplication, PromoRejection>) -> Self {
        match result {
            Ok(applied) => Self {
                valid: true,
                discount_amount: Some(applied.discount_amount),
                promo: Some(applied.descriptor),
                reason: None,
            },
            Err(rejection) => Self {
                valid: false,
                discount_amount: None,
                promo: None,
                reason: Some(PromoRejectionView::from(&rejection)),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub catalog_item_id: Uuid,
    pub breakdown: PriceBreakdown,
    pub total: Decimal,
    pub currency: String,
    pub promo: Option<PromoDescriptor>,
    /// Set when a promo was supplied but could not be applied
    pub promo_rejection: Option<PromoRejectionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationReceipt {
    pub reservation_id: Uuid,
    pub reference_code: String,
    /// Handed to the browser to complete the payment challenge
    pub client_authorization_token: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub breakdown: PriceBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> QuoteRequest {
        QuoteRequest {
            catalog_item_id: "island-day".to_string(),
            adult_count: 2,
            child_count: 0,
            addon_selections: vec![],
            transport: TransportRequest {
                kind: TransportType::SelfArrange,
                non_player_count: 0,
                private_passengers: 0,
                hotel_name: None,
                room_number: None,
            },
            promo_code: None,
        }
    }

    fn booking() -> CreateReservationRequest {
        CreateReservationRequest {
            quote: quote(),
            activity_date: "2030-06-01".to_string(),
            time_slot: Some("10:00".to_string()),
            customer: CustomerRequest {
                name: "Ada Guest".to_string(),
                email: "ada@example.com".to_string(),
                phone: "+66 81 234 5678".to_string(),
                special_requests: None,
            },
            client_total: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    }

    #[test]
    fn test_valid_booking() {
        let schedule = booking().validate(today()).unwrap();
        assert_eq!(schedule.activity_date, NaiveDate::from_ymd_opt(2030, 6, 1).unwrap());
    }

    #[test]
    fn test_every_bad_field_is_reported() {
        let mut req = booking();
        req.quote.adult_count = 0;
        req.quote.child_count = -1;
        req.quote.addon_selections.push(AddonSelection {
            addon_id: "jet-ski".to_string(),
            quantity: -2,
        });
        req.customer.email = "not-an-email".to_string();
        req.activity_date = "2029-12-31".to_string();

        let errors = req.validate(today()).err().unwrap();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "adult_count",
                "child_count",
                "addon_selections[0].quantity",
                "customer.email",
                "activity_date"
            ]
        );
    }

    #[test]
    fn test_oversized_counts_are_rejected() {
        let mut req = booking();
        req.quote.adult_count = 3_000_000_000;
        req.quote.child_count = MAX_COUNT + 1;
        req.quote.transport.private_passengers = i64::from(i32::MAX) + 1;
        req.quote.addon_selections.push(AddonSelection {
            addon_id: "jet-ski".to_string(),
            quantity: MAX_COUNT,
        });

        let errors = req.validate(today()).err().unwrap();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["adult_count", "child_count", "transport.private_passengers"]
        );
        assert_eq!(errors[0].message, "must be at most 1000");
    }

    #[test]
    fn test_hotel_pickup_needs_hotel() {
        let mut req = booking();
        req.quote.transport.kind = TransportType::HotelPickup;
        let errors = req.validate(today()).err().unwrap();
        assert_eq!(errors[0].field, "transport.hotel_name");
    }

    #[test]
    fn test_phone_needs_country_code() {
        let mut req = booking();
        req.customer.phone = "081 234 5678".to_string();
        let errors = req.validate(today()).err().unwrap();
        assert_eq!(errors[0].field, "customer.phone");
    }

    #[test]
    fn test_blank_promo_is_none() {
        let mut q = quote();
        q.promo_code = Some("   ".to_string());
        assert_eq!(q.promo_code(), None);
        q.promo_code = Some(" summer ".to_string());
        assert_eq!(q.promo_code(), Some("summer"));
    }

    #[test]
    fn test_booking_request_flattens_quote_fields() {
        let json = serde_json::json!({
            "catalog_item_id": "island-day",
            "adult_count": 2,
            "transport": { "kind": "hotel_pickup", "hotel_name": "Beach Resort" },
            "activity_date": "2030-06-01",
            "customer": { "name": "Ada", "email": "ada@example.com", "phone": "+6681234567" }
        });
        let req: CreateReservationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.quote.adult_count, 2);
        assert_eq!(req.quote.transport.kind, TransportType::HotelPickup);
        assert!(req.time_slot.is_none());
    }
}
