use rust_decimal::Decimal;
use shoreline_catalog::{
    CatalogItem, CatalogRef, GuestCounts, PriceBreakdown, PricedAddon, PricingEngine,
    PromoApplication, PromoRejection, PromoValidator, TransportChoice,
};
use shoreline_core::events::{publish_json, EventPublisher};
use shoreline_core::payment::{to_minor_units, AuthorizationRequest, GatewayError, PaymentGateway};
use shoreline_core::repository::{
    CatalogRepository, PromoRepository, ReservationRepository, StoreError,
};
use shoreline_core::reservation::{
    AddonLine, CustomerDetails, Reservation, ReservationHeader, ReservationStatus,
    TransportDetails,
};
use shoreline_core::{Clock, CoreError, CoreResult};
use shoreline_shared::models::events::{topics, ReservationCreatedEvent};
use shoreline_shared::Masked;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::reference;
use crate::requests::{
    CreateReservationRequest, PromoRejectionView, PromoValidation, Quote, QuoteRequest,
    ReservationReceipt,
};

/// Collaborators the orchestrator talks to. All of them are shared, none
/// hold per-request state.
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub catalog: Arc<dyn CatalogRepository>,
    pub promos: Arc<dyn PromoRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub events: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub currency: String,
    /// Upper bound on a single authorization call
    pub gateway_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            currency: "THB".to_string(),
            gateway_timeout: Duration::from_millis(10_000),
        }
    }
}

/// Everything the server resolved and computed for one request
struct Priced {
    item: CatalogItem,
    addons: Vec<PricedAddon>,
    transport: TransportChoice,
    breakdown: PriceBreakdown,
    promo: Option<PromoApplication>,
    rejection: Option<PromoRejection>,
}

fn count(value: i64) -> u32 {
    // Callers have already rejected negative and oversized counts
    u32::try_from(value).unwrap_or(0)
}

pub struct ReservationOrchestrator {
    deps: OrchestratorDeps,
    pricing: PricingEngine,
    settings: OrchestratorSettings,
}

impl ReservationOrchestrator {
    pub fn new(deps: OrchestratorDeps, pricing: PricingEngine, settings: OrchestratorSettings) -> Self {
        Self {
            deps,
            pricing,
            settings,
        }
    }

    pub fn currency(&self) -> &str {
        &self.settings.currency
    }

    /// Price a prospective booking. Read-only; an unusable promo is reported
    /// in the quote rather than failing it.
    pub async fn quote(&self, request: &QuoteRequest) -> CoreResult<Quote> {
        let mut errors = Vec::new();
        request.collect_errors(&mut errors);
        if !errors.is_empty() {
            return Err(CoreError::ValidationError(errors));
        }

        let priced = self.price(request).await?;

        Ok(Quote {
            catalog_item_id: priced.item.id,
            total: priced.breakdown.total,
            breakdown: priced.breakdown,
            currency: self.settings.currency.clone(),
            promo: priced.promo.map(|p| p.descriptor),
            promo_rejection: priced.rejection.as_ref().map(PromoRejectionView::from),
        })
    }

    /// Check a code against an order total without touching its usage.
    pub async fn validate_promo(&self, code: &str, order_total: Decimal) -> CoreResult<PromoValidation> {
        let mut errors = Vec::new();
        if code.trim().is_empty() {
            errors.push(shoreline_core::FieldError::new("code", "is required"));
        }
        if order_total.is_sign_negative() {
            errors.push(shoreline_core::FieldError::new("order_total", "must not be negative"));
        }
        if !errors.is_empty() {
            return Err(CoreError::ValidationError(errors));
        }

        let promo = self.deps.promos.find_by_code(code).await?;
        let result = PromoValidator::validate(promo.as_ref(), order_total, self.deps.clock.now());
        if let Err(rejection) = &result {
            debug!(code = %code.trim(), reason = rejection.code(), "Promo code rejected");
        }

        Ok(PromoValidation::from(result))
    }

    /// Validate, re-price, persist the pending aggregate and open a payment
    /// authorization for it.
    pub async fn create_reservation(&self, request: &CreateReservationRequest) -> CoreResult<ReservationReceipt> {
        let now = self.deps.clock.now();
        let today = now.date_naive();
        let schedule = request.validate(today).map_err(CoreError::ValidationError)?;

        let priced = self.price(&request.quote).await?;
        if let Some(rejection) = priced.rejection {
            return Err(CoreError::PromoInvalid(rejection));
        }

        let breakdown = priced.breakdown;
        if let Some(client_total) = request.client_total {
            if client_total != breakdown.total {
                debug!(%client_total, server_total = %breakdown.total, "Client total differs; using server total");
            }
        }

        // Reject unchargeable amounts before anything is written
        let amount_minor_units = to_minor_units(breakdown.total)?;

        let reservation_id = Uuid::new_v4();
        let reference_code = reference::generate();
        let transport = priced.transport;
        let customer = &request.customer;

        let reservation = Reservation {
            header: ReservationHeader {
                id: reservation_id,
                reference_code: reference_code.clone(),
                catalog_item_id: priced.item.id,
                activity_date: schedule.activity_date,
                time_slot: schedule.time_slot,
                adult_count: count(request.quote.adult_count),
                child_count: count(request.quote.child_count),
                total_amount: breakdown.total,
                discount_amount: breakdown.discount_amount,
                promo_code_id: priced.promo.as_ref().map(|p| p.descriptor.promo_code_id),
                currency: self.settings.currency.clone(),
                status: ReservationStatus::Pending,
                authorization_id: None,
                notice: None,
                created_at: now,
                updated_at: now,
            },
            customer: CustomerDetails {
                name: customer.name.trim().to_string(),
                email: Masked::new(customer.email.trim().to_lowercase()),
                phone: Masked::new(customer.phone.trim().to_string()),
                special_requests: customer
                    .special_requests
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            },
            transport: TransportDetails {
                transport_type: transport.kind,
                hotel_name: transport.hotel_name.clone(),
                room_number: transport.room_number.clone(),
                non_player_count: transport.non_player_count,
                private_passengers: transport.private_passengers,
                transport_cost: breakdown.transport_cost,
            },
            addons: priced
                .addons
                .iter()
                .map(|a| AddonLine {
                    addon_id: a.addon_id,
                    quantity: a.quantity,
                    unit_price: a.unit_price,
                })
                .collect(),
        };

        self.deps.reservations.create_aggregate(&reservation).await?;
        info!(%reservation_id, %reference_code, total = %breakdown.total, "Reservation created in pending");

        publish_json(
            self.deps.events.as_ref(),
            topics::RESERVATION_CREATED,
            &reservation_id.to_string(),
            &ReservationCreatedEvent {
                reservation_id,
                reference_code: reference_code.clone(),
                catalog_item_id: priced.item.id,
                total_amount: breakdown.total,
                currency: self.settings.currency.clone(),
                timestamp: now.timestamp(),
            },
        )
        .await;

        let auth_request = AuthorizationRequest {
            reservation_id,
            amount_minor_units,
            currency: self.settings.currency.clone(),
            reference_code: reference_code.clone(),
            description: format!("{} ({})", priced.item.name, reference_code),
        };

        let authorization = match tokio::time::timeout(
            self.settings.gateway_timeout,
            self.deps.gateway.authorize(&auth_request),
        )
        .await
        {
            Ok(Ok(authorization)) => authorization,
            Ok(Err(e)) => {
                warn!(%reservation_id, "Payment authorization failed, reservation left pending: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                warn!(%reservation_id, "Payment authorization timed out, reservation left pending");
                return Err(GatewayError::Timeout.into());
            }
        };

        let attached = self
            .deps
            .reservations
            .attach_authorization(reservation_id, &authorization.authorization_id)
            .await?;
        if !attached {
            return Err(StoreError::WriteFailed("reservations").into());
        }

        info!(
            %reservation_id,
            authorization_id = %authorization.authorization_id,
            "Payment authorization attached"
        );

        Ok(ReservationReceipt {
            reservation_id,
            reference_code,
            client_authorization_token: authorization.client_secret,
            total_amount: breakdown.total,
            currency: self.settings.currency.clone(),
            breakdown,
        })
    }

    pub async fn get_reservation(&self, id: Uuid) -> CoreResult<Reservation> {
        self.deps
            .reservations
            .find(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("reservation {}", id)))
    }

    async fn price(&self, request: &QuoteRequest) -> CoreResult<Priced> {
        let item_ref = CatalogRef::parse(&request.catalog_item_id);
        let item = match self.deps.catalog.find_item(&item_ref).await? {
            Some(item) if item.is_active => item,
            _ => {
                return Err(CoreError::invalid(
                    "catalog_item_id",
                    &format!("unknown catalog item {}", item_ref),
                ))
            }
        };

        let addons = self.resolve_addons(request).await?;

        let transport = TransportChoice {
            kind: request.transport.kind,
            non_player_count: count(request.transport.non_player_count),
            private_passengers: count(request.transport.private_passengers),
            hotel_name: request.transport.hotel_name.clone(),
            room_number: request.transport.room_number.clone(),
        };
        let guests = GuestCounts {
            adults: count(request.adult_count),
            children: count(request.child_count),
        };

        let breakdown = self
            .pricing
            .compute_total(&item, guests, &addons, &transport, None);

        let (breakdown, promo, rejection) = match request.promo_code() {
            None => (breakdown, None, None),
            Some(code) => {
                let found = self.deps.promos.find_by_code(code).await?;
                match PromoValidator::validate(found.as_ref(), breakdown.subtotal, self.deps.clock.now()) {
                    Ok(applied) => (
                        breakdown.with_discount(applied.discount_amount),
                        Some(applied),
                        None,
                    ),
                    Err(rejection) => {
                        debug!(code, reason = rejection.code(), "Promo not applied");
                        (breakdown, None, Some(rejection))
                    }
                }
            }
        };

        Ok(Priced {
            breakdown: breakdown.rounded_to_cents(),
            item,
            addons,
            transport,
            promo,
            rejection,
        })
    }

    /// Resolve selections against the catalog. Unknown or retired add-ons are
    /// dropped with a warning; repeated references are merged.
    async fn resolve_addons(&self, request: &QuoteRequest) -> CoreResult<Vec<PricedAddon>> {
        let selections: Vec<(CatalogRef, u32)> = request
            .addon_selections
            .iter()
            .map(|s| (CatalogRef::parse(&s.addon_id), count(s.quantity)))
            .filter(|(_, quantity)| *quantity > 0)
            .collect();
        if selections.is_empty() {
            return Ok(Vec::new());
        }

        let refs: Vec<CatalogRef> = selections.iter().map(|(r, _)| r.clone()).collect();
        let known = self.deps.catalog.find_addons(&refs).await?;

        let mut priced: Vec<PricedAddon> = Vec::new();
        for (addon_ref, quantity) in selections {
            let Some(addon) = known.iter().find(|a| addon_ref.matches_addon(a) && a.is_active) else {
                warn!(addon = %addon_ref, "Ignoring unknown add-on selection");
                continue;
            };

            match priced.iter_mut().find(|p| p.addon_id == addon.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(quantity),
                None => priced.push(PricedAddon {
                    addon_id: addon.id,
                    unit_price: addon.unit_price,
                    quantity,
                }),
            }
        }

        Ok(priced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockPaymentGateway;
    use crate::requests::{AddonSelection, CustomerRequest, TransportRequest};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use shoreline_catalog::{DiscountType, PromoCode, TransportType};
    use shoreline_core::FixedClock;
    use shoreline_store::{FailurePoint, InMemoryStore};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(
            &self,
            topic: &str,
            key: &str,
            _payload: &str,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.sent.lock().await.push((topic.to_string(), key.to_string()));
            Ok(())
        }
    }

    struct Harness {
        store: Arc<InMemoryStore>,
        gateway: Arc<MockPaymentGateway>,
        events: Arc<RecordingPublisher>,
        orchestrator: ReservationOrchestrator,
    }

    async fn harness_with(gateway: MockPaymentGateway, gateway_timeout: Duration) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        store.seed_demo().await;
        let gateway = Arc::new(gateway);
        let events = Arc::new(RecordingPublisher::default());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap()));

        let deps = OrchestratorDeps {
            catalog: store.clone(),
            promos: store.clone(),
            reservations: store.clone(),
            gateway: gateway.clone(),
            events: events.clone(),
            clock,
        };
        let settings = OrchestratorSettings {
            currency: "THB".to_string(),
            gateway_timeout,
        };

        Harness {
            store,
            gateway,
            events,
            orchestrator: ReservationOrchestrator::new(deps, PricingEngine::default(), settings),
        }
    }

    async fn harness() -> Harness {
        harness_with(MockPaymentGateway::new(), Duration::from_secs(5)).await
    }

    fn quote_request(item: &str, adults: i64, kind: TransportType) -> QuoteRequest {
        QuoteRequest {
            catalog_item_id: item.to_string(),
            adult_count: adults,
            child_count: 0,
            addon_selections: vec![],
            transport: TransportRequest {
                kind,
                non_player_count: 0,
                private_passengers: 0,
                hotel_name: Some("Beach Resort".to_string()),
                room_number: Some("204".to_string()),
            },
            promo_code: None,
        }
    }

    fn booking(quote: QuoteRequest) -> CreateReservationRequest {
        CreateReservationRequest {
            quote,
            activity_date: "2030-02-14".to_string(),
            time_slot: Some("09:30".to_string()),
            customer: CustomerRequest {
                name: "Ada Guest".to_string(),
                email: "Ada@Example.com".to_string(),
                phone: "+66 81 234 5678".to_string(),
                special_requests: Some("  ".to_string()),
            },
            client_total: None,
        }
    }

    #[tokio::test]
    async fn test_quote_hotel_pickup() {
        let h = harness().await;
        let quote = h
            .orchestrator
            .quote(&quote_request("island-day", 2, TransportType::HotelPickup))
            .await
            .unwrap();

        assert_eq!(quote.total, Decimal::from(3800));
        assert_eq!(quote.breakdown.transport_cost, Decimal::ZERO);
        assert_eq!(quote.currency, "THB");
    }

    #[tokio::test]
    async fn test_quote_addon_and_percentage_promo() {
        let h = harness().await;
        let mut req = quote_request("sunset-club", 2, TransportType::SelfArrange);
        req.addon_selections.push(AddonSelection {
            addon_id: "jet-ski".to_string(),
            quantity: 2,
        });
        req.promo_code = Some("welcome10".to_string());

        let quote = h.orchestrator.quote(&req).await.unwrap();

        assert_eq!(quote.breakdown.base, Decimal::from(6400));
        assert_eq!(quote.breakdown.addons_total, Decimal::from(600));
        assert_eq!(quote.breakdown.subtotal, Decimal::from(7000));
        assert_eq!(quote.breakdown.discount_amount, Decimal::from(700));
        assert_eq!(quote.total, Decimal::from(6300));
        assert_eq!(quote.promo.unwrap().code, "WELCOME10");
        assert!(quote.promo_rejection.is_none());
    }

    #[tokio::test]
    async fn test_quote_private_transport() {
        let h = harness().await;
        let quote = h
            .orchestrator
            .quote(&quote_request("island-day", 1, TransportType::Private))
            .await
            .unwrap();

        assert_eq!(quote.total, Decimal::from(4400));
    }

    #[tokio::test]
    async fn test_quote_reports_unusable_promo() {
        let h = harness().await;
        let mut req = quote_request("island-day", 2, TransportType::SelfArrange);
        req.promo_code = Some("NOPE".to_string());

        let quote = h.orchestrator.quote(&req).await.unwrap();

        assert_eq!(quote.total, Decimal::from(3800));
        assert_eq!(quote.promo_rejection.unwrap().code, "promo_not_found");
    }

    #[tokio::test]
    async fn test_unknown_addon_ignored_and_duplicates_merged() {
        let h = harness().await;
        let mut req = quote_request("island-day", 1, TransportType::SelfArrange);
        req.addon_selections = vec![
            AddonSelection { addon_id: "jet-ski".to_string(), quantity: 1 },
            AddonSelection { addon_id: "parasail".to_string(), quantity: 3 },
            AddonSelection { addon_id: "JET-SKI".to_string(), quantity: 2 },
            AddonSelection { addon_id: "jet-ski".to_string(), quantity: 0 },
        ];

        let quote = h.orchestrator.quote(&req).await.unwrap();

        assert_eq!(quote.breakdown.addons_total, Decimal::from(900));
        assert_eq!(quote.total, Decimal::from(2800));
    }

    #[tokio::test]
    async fn test_unknown_catalog_item_is_validation_error() {
        let h = harness().await;
        let err = h
            .orchestrator
            .quote(&quote_request("moon-landing", 1, TransportType::SelfArrange))
            .await
            .unwrap_err();

        match err {
            CoreError::ValidationError(fields) => assert_eq!(fields[0].field, "catalog_item_id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_validate_promo_has_no_side_effects() {
        let h = harness().await;
        let first = h.orchestrator.validate_promo("welcome10", Decimal::from(1000)).await.unwrap();
        let second = h.orchestrator.validate_promo("WELCOME10", Decimal::from(1000)).await.unwrap();

        assert!(first.valid);
        assert_eq!(first.discount_amount, Some(Decimal::from(100)));
        assert_eq!(second.discount_amount, first.discount_amount);

        let promo_id = first.promo.unwrap().promo_code_id;
        assert_eq!(h.store.promo_usage(promo_id).await, Some(0));

        let missing = h.orchestrator.validate_promo("NOPE", Decimal::from(1000)).await.unwrap();
        assert!(!missing.valid);
        assert_eq!(missing.reason.unwrap().code, "promo_not_found");
    }

    #[tokio::test]
    async fn test_create_reservation_happy_path() {
        let h = harness().await;
        let mut req = booking(quote_request("island-day", 2, TransportType::HotelPickup));
        req.client_total = Some(Decimal::ONE);

        let receipt = h.orchestrator.create_reservation(&req).await.unwrap();

        assert_eq!(receipt.total_amount, Decimal::from(3800));
        assert!(receipt.reference_code.starts_with("SL-"));
        assert!(!receipt.client_authorization_token.is_empty());

        let stored = h.orchestrator.get_reservation(receipt.reservation_id).await.unwrap();
        assert_eq!(stored.status(), ReservationStatus::Pending);
        assert_eq!(
            stored.header.authorization_id,
            Some(MockPaymentGateway::authorization_id_for(receipt.reservation_id))
        );
        assert_eq!(stored.customer.email.expose(), "ada@example.com");
        assert_eq!(stored.customer.special_requests, None);
        assert_eq!(stored.transport.hotel_name.as_deref(), Some("Beach Resort"));

        let sent = h.events.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, topics::RESERVATION_CREATED);
    }

    #[tokio::test]
    async fn test_create_does_not_consume_promo() {
        let h = harness().await;
        let mut quote = quote_request("sunset-club", 2, TransportType::SelfArrange);
        quote.promo_code = Some("WELCOME10".to_string());

        let receipt = h.orchestrator.create_reservation(&booking(quote)).await.unwrap();
        let stored = h.orchestrator.get_reservation(receipt.reservation_id).await.unwrap();

        assert_eq!(stored.header.discount_amount, Decimal::from(640));
        let promo_id = stored.header.promo_code_id.unwrap();
        assert_eq!(h.store.promo_usage(promo_id).await, Some(0));
    }

    #[tokio::test]
    async fn test_create_with_exhausted_promo_aborts() {
        let h = harness().await;
        h.store
            .insert_promo(PromoCode {
                id: Uuid::new_v4(),
                code: "GONE".to_string(),
                discount_type: DiscountType::Fixed,
                discount_value: Decimal::from(100),
                min_order_value: None,
                usage_cap: Some(3),
                usage_count: 3,
                is_active: true,
                starts_at: None,
                expires_at: None,
            })
            .await;
        let mut quote = quote_request("island-day", 2, TransportType::SelfArrange);
        quote.promo_code = Some("gone".to_string());

        let err = h.orchestrator.create_reservation(&booking(quote)).await.unwrap_err();

        assert!(matches!(err, CoreError::PromoInvalid(PromoRejection::CapReached)));
        assert_eq!(h.store.reservation_count().await, 0);
        assert_eq!(h.gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_partial_write_leaves_nothing() {
        let h = harness().await;
        h.store.fail_at(Some(FailurePoint::Transport)).await;

        let err = h
            .orchestrator
            .create_reservation(&booking(quote_request("island-day", 2, TransportType::SelfArrange)))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::PersistenceError(_)));
        assert_eq!(h.store.reservation_count().await, 0);
        assert_eq!(h.gateway.calls(), 0);
        assert!(h.events.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_pending_without_authorization() {
        let h = harness_with(MockPaymentGateway::unavailable(), Duration::from_secs(5)).await;

        let err = h
            .orchestrator
            .create_reservation(&booking(quote_request("island-day", 2, TransportType::SelfArrange)))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::PaymentGatewayError(GatewayError::Transport(_))));
        let headers = h.store.headers().await;
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].status, ReservationStatus::Pending);
        assert_eq!(headers[0].authorization_id, None);
    }

    #[tokio::test]
    async fn test_gateway_timeout() {
        let h = harness_with(
            MockPaymentGateway::new().with_delay(Duration::from_millis(500)),
            Duration::from_millis(20),
        )
        .await;

        let err = h
            .orchestrator
            .create_reservation(&booking(quote_request("island-day", 2, TransportType::SelfArrange)))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::PaymentGatewayError(GatewayError::Timeout)));
        let headers = h.store.headers().await;
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].authorization_id, None);
    }

    #[tokio::test]
    async fn test_create_lists_every_invalid_field() {
        let h = harness().await;
        let mut req = booking(quote_request("island-day", 0, TransportType::HotelPickup));
        req.quote.transport.hotel_name = None;
        req.customer.name = " ".to_string();
        req.activity_date = "2029-12-31".to_string();

        let err = h.orchestrator.create_reservation(&req).await.unwrap_err();

        let CoreError::ValidationError(fields) = err else {
            panic!("expected validation error");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            names,
            vec!["adult_count", "transport.hotel_name", "customer.name", "activity_date"]
        );
        assert_eq!(h.store.reservation_count().await, 0);
    }

    #[tokio::test]
    async fn test_get_unknown_reservation() {
        let h = harness().await;
        let err = h.orchestrator.get_reservation(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_oversized_count_is_rejected_before_booking() {
        let h = harness().await;
        let req = booking(quote_request("island-day", 3_000_000_000, TransportType::SelfArrange));

        let err = h.orchestrator.create_reservation(&req).await.unwrap_err();

        let CoreError::ValidationError(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields[0].field, "adult_count");
        assert_eq!(h.store.reservation_count().await, 0);
        assert_eq!(h.gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_created_at_follows_clock() {
        let h = harness().await;
        let receipt = h
            .orchestrator
            .create_reservation(&booking(quote_request("island-day", 1, TransportType::SelfArrange)))
            .await
            .unwrap();

        let stored = h.orchestrator.get_reservation(receipt.reservation_id).await.unwrap();
        let expected = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(stored.header.created_at, expected);
        assert_eq!(stored.header.updated_at, expected);
    }

    #[tokio::test]
    async fn test_fractional_discount_is_stored_as_charged() {
        let h = harness().await;
        h.store
            .insert_catalog_item(CatalogItem {
                id: Uuid::new_v4(),
                slug: "lagoon-half-day".to_string(),
                name: "Lagoon Half Day".to_string(),
                adult_price: Decimal::from(1999),
                child_price: None,
                includes_meal: false,
                includes_transfer: false,
                is_active: true,
            })
            .await;
        h.store
            .insert_promo(PromoCode {
                id: Uuid::new_v4(),
                code: "EIGHTH".to_string(),
                discount_type: DiscountType::Percentage,
                discount_value: Decimal::new(125, 1),
                min_order_value: None,
                usage_cap: None,
                usage_count: 0,
                is_active: true,
                starts_at: None,
                expires_at: None,
            })
            .await;
        let mut quote = quote_request("lagoon-half-day", 1, TransportType::SelfArrange);
        quote.promo_code = Some("eighth".to_string());

        let receipt = h.orchestrator.create_reservation(&booking(quote)).await.unwrap();
        let stored = h.orchestrator.get_reservation(receipt.reservation_id).await.unwrap();

        assert_eq!(receipt.total_amount, Decimal::new(174912, 2));
        assert_eq!(receipt.breakdown.discount_amount, Decimal::new(24988, 2));
        assert_eq!(stored.header.total_amount, receipt.total_amount);
        assert_eq!(stored.header.discount_amount, receipt.breakdown.discount_amount);
        assert_eq!(
            stored.header.total_amount + stored.header.discount_amount,
            Decimal::from(1999)
        );
    }
}
