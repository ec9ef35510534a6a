pub mod gateway;
pub mod orchestrator;
pub mod reconciliation;
pub mod reference;
pub mod requests;

pub use gateway::{HttpPaymentGateway, MockPaymentGateway};
pub use orchestrator::{OrchestratorDeps, OrchestratorSettings, ReservationOrchestrator};
pub use reconciliation::{
    PaymentEvent, ReconciliationListener, ReconciliationResult, SignatureError, WebhookVerifier,
    PROMO_LIMIT_NOTICE,
};
pub use requests::{
    AddonSelection, CreateReservationRequest, CustomerRequest, PromoRejectionView, PromoValidation,
    Quote, QuoteRequest, ReservationReceipt, TransportRequest,
};
