use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shoreline_catalog::{AddonItem, CatalogItem, CatalogRef, DiscountType, PromoCode};
use shoreline_core::repository::{
    CatalogRepository, PromoRepository, Redemption, ReservationRepository, StoreError, StoreResult,
};
use shoreline_core::reservation::{
    AddonLine, CustomerDetails, Reservation, ReservationHeader, ReservationStatus, TransportDetails,
};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Write step at which `create_aggregate` should fail, for exercising the
/// all-or-nothing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Customer,
    Transport,
    AddonLines,
}

#[derive(Default)]
struct State {
    catalog: Vec<CatalogItem>,
    addons: Vec<AddonItem>,
    promos: HashMap<Uuid, PromoCode>,
    /// reservation id -> promo id
    redemptions: HashMap<Uuid, Uuid>,
    headers: HashMap<Uuid, ReservationHeader>,
    customers: HashMap<Uuid, CustomerDetails>,
    transports: HashMap<Uuid, TransportDetails>,
    addon_lines: HashMap<Uuid, Vec<AddonLine>>,
    failure: Option<FailurePoint>,
}

impl State {
    fn remove_reservation(&mut self, id: Uuid) {
        self.headers.remove(&id);
        self.customers.remove(&id);
        self.transports.remove(&id);
        self.addon_lines.remove(&id);
    }

    fn assemble(&self, header: &ReservationHeader) -> StoreResult<Reservation> {
        let customer = self.customers.get(&header.id).cloned().ok_or_else(|| StoreError::Corrupt {
            table: "reservation_customers",
            detail: format!("missing customer for {}", header.id),
        })?;
        let transport = self.transports.get(&header.id).cloned().ok_or_else(|| StoreError::Corrupt {
            table: "reservation_transports",
            detail: format!("missing transport for {}", header.id),
        })?;

        Ok(Reservation {
            header: header.clone(),
            customer,
            transport,
            addons: self.addon_lines.get(&header.id).cloned().unwrap_or_default(),
        })
    }
}

/// Process-local store implementing every repository trait. Each child table
/// is written separately and a failed step triggers a compensating delete, so
/// it honors the same all-or-nothing contract as the Postgres store.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small catalog for local development runs
    pub async fn seed_demo(&self) {
        self.insert_catalog_item(CatalogItem {
            id: Uuid::new_v4(),
            slug: "island-day".to_string(),
            name: "Island Beach Day".to_string(),
            adult_price: Decimal::from(1900),
            child_price: Some(Decimal::from(1200)),
            includes_meal: true,
            includes_transfer: false,
            is_active: true,
        })
        .await;
        self.insert_catalog_item(CatalogItem {
            id: Uuid::new_v4(),
            slug: "sunset-club".to_string(),
            name: "Sunset Beach Club".to_string(),
            adult_price: Decimal::from(3200),
            child_price: None,
            includes_meal: true,
            includes_transfer: true,
            is_active: true,
        })
        .await;
        self.insert_addon(AddonItem {
            id: Uuid::new_v4(),
            slug: "jet-ski".to_string(),
            name: "Jet Ski (30 min)".to_string(),
            unit_price: Decimal::from(300),
            unit_label: "session".to_string(),
            is_active: true,
        })
        .await;
        self.insert_promo(PromoCode {
            id: Uuid::new_v4(),
            code: "WELCOME10".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
            min_order_value: None,
            usage_cap: Some(100),
            usage_count: 0,
            is_active: true,
            starts_at: None,
            expires_at: None,
        })
        .await;
    }

    pub async fn insert_catalog_item(&self, item: CatalogItem) {
        self.state.lock().await.catalog.push(item);
    }

    pub async fn insert_addon(&self, addon: AddonItem) {
        self.state.lock().await.addons.push(addon);
    }

    pub async fn insert_promo(&self, mut promo: PromoCode) {
        promo.code = PromoCode::normalize(&promo.code);
        self.state.lock().await.promos.insert(promo.id, promo);
    }

    pub async fn promo_usage(&self, promo_id: Uuid) -> Option<i32> {
        self.state.lock().await.promos.get(&promo_id).map(|p| p.usage_count)
    }

    pub async fn fail_at(&self, point: Option<FailurePoint>) {
        self.state.lock().await.failure = point;
    }

    pub async fn reservation_count(&self) -> usize {
        self.state.lock().await.headers.len()
    }

    /// Snapshot of every stored header
    pub async fn headers(&self) -> Vec<ReservationHeader> {
        self.state.lock().await.headers.values().cloned().collect()
    }

    /// True when any child record for `id` survived
    pub async fn has_child_records(&self, id: Uuid) -> bool {
        let state = self.state.lock().await;
        state.customers.contains_key(&id)
            || state.transports.contains_key(&id)
            || state.addon_lines.contains_key(&id)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn find_item(&self, item_ref: &CatalogRef) -> StoreResult<Option<CatalogItem>> {
        let state = self.state.lock().await;
        Ok(state.catalog.iter().find(|item| item_ref.matches_item(item)).cloned())
    }

    async fn find_addons(&self, refs: &[CatalogRef]) -> StoreResult<Vec<AddonItem>> {
        let state = self.state.lock().await;
        Ok(state
            .addons
            .iter()
            .filter(|addon| refs.iter().any(|r| r.matches_addon(addon)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PromoRepository for InMemoryStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<PromoCode>> {
        let wanted = PromoCode::normalize(code);
        let state = self.state.lock().await;
        let mut matches: Vec<&PromoCode> = state.promos.values().filter(|p| p.code == wanted).collect();
        matches.sort_by_key(|p| !p.is_active);
        Ok(matches.first().map(|p| (*p).clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<PromoCode>> {
        Ok(self.state.lock().await.promos.get(&id).cloned())
    }

    async fn redeem(&self, promo_id: Uuid, reservation_id: Uuid) -> StoreResult<Redemption> {
        let mut state = self.state.lock().await;

        if state.redemptions.contains_key(&reservation_id) {
            return Ok(Redemption::AlreadyRedeemed);
        }

        let promo = state.promos.get_mut(&promo_id).ok_or_else(|| StoreError::Corrupt {
            table: "promo_codes",
            detail: format!("unknown promo {}", promo_id),
        })?;

        if promo.is_exhausted() {
            warn!(%promo_id, %reservation_id, "Promo usage cap reached at redemption");
            return Ok(Redemption::CapReached);
        }

        promo.usage_count += 1;
        state.redemptions.insert(reservation_id, promo_id);
        Ok(Redemption::Redeemed)
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn create_aggregate(&self, reservation: &Reservation) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let id = reservation.id();
        let failure = state.failure;

        state.headers.insert(id, reservation.header.clone());

        let steps: [(FailurePoint, &'static str); 3] = [
            (FailurePoint::Customer, "reservation_customers"),
            (FailurePoint::Transport, "reservation_transports"),
            (FailurePoint::AddonLines, "reservation_addons"),
        ];

        for (point, table) in steps {
            if failure == Some(point) {
                warn!(reservation_id = %id, table, "Child write failed, removing partial reservation");
                state.remove_reservation(id);
                return Err(StoreError::WriteFailed(table));
            }

            match point {
                FailurePoint::Customer => {
                    state.customers.insert(id, reservation.customer.clone());
                }
                FailurePoint::Transport => {
                    state.transports.insert(id, reservation.transport.clone());
                }
                FailurePoint::AddonLines => {
                    state.addon_lines.insert(id, reservation.addons.clone());
                }
            }
        }

        Ok(())
    }

    async fn attach_authorization(&self, id: Uuid, authorization_id: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.headers.get_mut(&id) {
            Some(header)
                if header.status == ReservationStatus::Pending && header.authorization_id.is_none() =>
            {
                header.authorization_id = Some(authorization_id.to_string());
                header.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Reservation>> {
        let state = self.state.lock().await;
        state.headers.get(&id).map(|h| state.assemble(h)).transpose()
    }

    async fn find_by_authorization(&self, authorization_id: &str) -> StoreResult<Option<Reservation>> {
        let state = self.state.lock().await;
        state
            .headers
            .values()
            .find(|h| h.authorization_id.as_deref() == Some(authorization_id))
            .map(|h| state.assemble(h))
            .transpose()
    }

    async fn settle(
        &self,
        id: Uuid,
        authorization_id: &str,
        status: ReservationStatus,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.headers.get_mut(&id) {
            Some(header)
                if header.status == ReservationStatus::Pending
                    && header.authorization_id.as_deref() == Some(authorization_id) =>
            {
                header.status = status;
                header.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn annotate(&self, id: Uuid, notice: &str) -> StoreResult<()> {
        if let Some(header) = self.state.lock().await.headers.get_mut(&id) {
            header.notice = Some(notice.to_string());
            header.updated_at = Utc::now();
        }
        Ok(())
    }
}
