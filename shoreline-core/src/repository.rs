use async_trait::async_trait;
use shoreline_catalog::{AddonItem, CatalogItem, CatalogRef, PromoCode};
use uuid::Uuid;

use crate::reservation::{Reservation, ReservationStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("write to {0} failed")]
    WriteFailed(&'static str),
    #[error("corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError::Backend(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only access to packages and add-ons
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_item(&self, item_ref: &CatalogRef) -> StoreResult<Option<CatalogItem>>;

    /// Resolve the refs that exist; unknown refs are simply absent from the result
    async fn find_addons(&self, refs: &[CatalogRef]) -> StoreResult<Vec<AddonItem>>;
}

/// Result of trying to consume one promo redemption for a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    Redeemed,
    /// This reservation already holds a redemption
    AlreadyRedeemed,
    /// The atomic increment found the cap already reached
    CapReached,
}

#[async_trait]
pub trait PromoRepository: Send + Sync {
    /// Case-insensitive lookup
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<PromoCode>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<PromoCode>>;

    /// Atomically increment usage if below cap, keyed by reservation so a
    /// second call for the same reservation never counts twice.
    async fn redeem(&self, promo_id: Uuid, reservation_id: Uuid) -> StoreResult<Redemption>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Write header, customer, transport and add-on lines together or not at all
    async fn create_aggregate(&self, reservation: &Reservation) -> StoreResult<()>;

    /// Record the processor's authorization id on a pending reservation.
    /// Returns false when the reservation is not pending or already has one.
    async fn attach_authorization(&self, id: Uuid, authorization_id: &str) -> StoreResult<bool>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Reservation>>;

    async fn find_by_authorization(&self, authorization_id: &str) -> StoreResult<Option<Reservation>>;

    /// Conditional terminal transition: applies only while the row is still
    /// pending and carries this authorization id. Returns whether it applied.
    async fn settle(
        &self,
        id: Uuid,
        authorization_id: &str,
        status: ReservationStatus,
    ) -> StoreResult<bool>;

    async fn annotate(&self, id: Uuid, notice: &str) -> StoreResult<()>;
}
