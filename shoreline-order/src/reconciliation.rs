use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use shoreline_core::events::{publish_json, EventPublisher};
use shoreline_core::payment::AuthorizationOutcome;
use shoreline_core::repository::{PromoRepository, Redemption, ReservationRepository};
use shoreline_core::reservation::{Reservation, ReservationStatus};
use shoreline_core::{Clock, CoreError, CoreResult};
use shoreline_shared::models::events::{topics, PromoUsageEvent, ReservationSettledEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Notice stored on a confirmed reservation whose promo ran out while the
/// guest was paying.
pub const PROMO_LIMIT_NOTICE: &str = "promo code just reached its limit";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance ({age_seconds}s)")]
    Stale { age_seconds: i64 },
    #[error("signature mismatch")]
    Mismatch,
    #[error("unusable webhook secret")]
    InvalidKey,
}

/// Verifies `t=<unix>,v1=<hex>` signatures: HMAC-SHA256 over `"{t}.{body}"`.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    tolerance_seconds: i64,
}

impl WebhookVerifier {
    pub fn new(secret: &str, tolerance_seconds: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            tolerance_seconds,
        }
    }

    fn mac(&self, timestamp: i64, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::InvalidKey)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    pub fn sign(&self, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        Ok(hex::encode(self.mac(timestamp, body)?.finalize().into_bytes()))
    }

    /// Full header value as the processor would send it
    pub fn header_value(&self, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        Ok(format!("t={},v1={}", timestamp, self.sign(timestamp, body)?))
    }

    pub fn verify(&self, header: Option<&str>, body: &[u8], now: DateTime<Utc>) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::Missing)?;

        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::Malformed)?)
                }
                Some(("v1", value)) => signatures.push(value),
                // Unknown schemes are ignored so the processor can roll new ones
                Some(_) => {}
                None => return Err(SignatureError::Malformed),
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
        if signatures.is_empty() {
            return Err(SignatureError::Malformed);
        }

        let age_seconds = now.timestamp() - timestamp;
        if age_seconds.abs() > self.tolerance_seconds {
            return Err(SignatureError::Stale { age_seconds });
        }

        let mac = self.mac(timestamp, body)?;
        for signature in signatures {
            let Ok(expected) = hex::decode(signature) else {
                continue;
            };
            // verify_slice compares in constant time
            if mac.clone().verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }

        Err(SignatureError::Mismatch)
    }
}

/// Processor notification about one authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub authorization_id: String,
    pub outcome: AuthorizationOutcome,
    /// Processor's delivery id, logged for correlation
    #[serde(default)]
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationResult {
    /// This delivery moved the reservation out of pending
    Applied {
        reservation_id: Uuid,
        status: ReservationStatus,
        promo: Option<Redemption>,
    },
    /// Already terminal; acknowledged without a transition
    AlreadySettled {
        reservation_id: Uuid,
        status: ReservationStatus,
    },
}

impl ReconciliationResult {
    pub fn reservation_id(&self) -> Uuid {
        match self {
            ReconciliationResult::Applied { reservation_id, .. }
            | ReconciliationResult::AlreadySettled { reservation_id, .. } => *reservation_id,
        }
    }

    pub fn status(&self) -> ReservationStatus {
        match self {
            ReconciliationResult::Applied { status, .. }
            | ReconciliationResult::AlreadySettled { status, .. } => *status,
        }
    }
}

fn settled_topic(status: ReservationStatus) -> Option<&'static str> {
    match status {
        ReservationStatus::Confirmed => Some(topics::RESERVATION_CONFIRMED),
        ReservationStatus::Failed => Some(topics::RESERVATION_FAILED),
        ReservationStatus::Cancelled => Some(topics::RESERVATION_CANCELLED),
        ReservationStatus::Pending => None,
    }
}

/// Applies processor outcomes to reservations. Safe under redelivery and
/// under concurrent copies of the same event: the store's conditional
/// transition lets exactly one delivery win.
pub struct ReconciliationListener {
    reservations: Arc<dyn ReservationRepository>,
    promos: Arc<dyn PromoRepository>,
    events: Arc<dyn EventPublisher>,
    verifier: WebhookVerifier,
    clock: Arc<dyn Clock>,
}

impl ReconciliationListener {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        promos: Arc<dyn PromoRepository>,
        events: Arc<dyn EventPublisher>,
        verifier: WebhookVerifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reservations,
            promos,
            events,
            verifier,
            clock,
        }
    }

    /// Verify and apply a raw webhook delivery. Nothing is read or written
    /// before the signature checks out.
    pub async fn handle(&self, signature: Option<&str>, body: &[u8]) -> CoreResult<ReconciliationResult> {
        if let Err(e) = self.verifier.verify(signature, body, self.clock.now()) {
            warn!("Rejected payment webhook: {}", e);
            return Err(CoreError::ReconciliationSignatureError(e.to_string()));
        }

        let event: PaymentEvent = serde_json::from_slice(body)
            .map_err(|e| CoreError::invalid("body", &format!("unreadable payment event: {}", e)))?;

        self.apply(event).await
    }

    pub async fn apply(&self, event: PaymentEvent) -> CoreResult<ReconciliationResult> {
        let authorization_id = event.authorization_id.as_str();
        let reservation = self
            .reservations
            .find_by_authorization(authorization_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("authorization {}", authorization_id)))?;
        let reservation_id = reservation.id();

        debug!(
            %reservation_id,
            authorization_id,
            event_id = event.event_id.as_deref().unwrap_or("-"),
            outcome = event.outcome.as_str(),
            "Payment event received"
        );

        let target = match reservation.status().settle(event.outcome) {
            Ok(target) => target,
            Err(_) => return self.acknowledge_settled(&reservation, event.outcome).await,
        };

        let applied = self
            .reservations
            .settle(reservation_id, authorization_id, target)
            .await?;
        if !applied {
            // A concurrent copy of this event won the transition
            let latest = self
                .reservations
                .find(reservation_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("reservation {}", reservation_id)))?;
            return self.acknowledge_settled(&latest, event.outcome).await;
        }

        info!(%reservation_id, authorization_id, status = %target, "Reservation settled");

        if let Some(topic) = settled_topic(target) {
            publish_json(
                self.events.as_ref(),
                topic,
                &reservation_id.to_string(),
                &ReservationSettledEvent {
                    reservation_id,
                    reference_code: reservation.header.reference_code.clone(),
                    authorization_id: authorization_id.to_string(),
                    status: target.as_str().to_string(),
                    total_amount: reservation.header.total_amount,
                    timestamp: self.clock.now().timestamp(),
                },
            )
            .await;
        }

        let promo = if target == ReservationStatus::Confirmed {
            self.commit_promo(&reservation).await?
        } else {
            None
        };

        Ok(ReconciliationResult::Applied {
            reservation_id,
            status: target,
            promo,
        })
    }

    /// No transition for terminal reservations. A repeated success still
    /// re-runs the keyed redemption, which heals a crash between the
    /// transition and the usage commit without double counting.
    async fn acknowledge_settled(
        &self,
        reservation: &Reservation,
        outcome: AuthorizationOutcome,
    ) -> CoreResult<ReconciliationResult> {
        let status = reservation.status();
        if status == ReservationStatus::Confirmed && outcome == AuthorizationOutcome::Succeeded {
            self.commit_promo(reservation).await?;
        }

        info!(
            reservation_id = %reservation.id(),
            %status,
            outcome = outcome.as_str(),
            "Payment event for settled reservation acknowledged"
        );

        Ok(ReconciliationResult::AlreadySettled {
            reservation_id: reservation.id(),
            status,
        })
    }

    async fn commit_promo(&self, reservation: &Reservation) -> CoreResult<Option<Redemption>> {
        let Some(promo_id) = reservation.header.promo_code_id else {
            return Ok(None);
        };
        let reservation_id = reservation.id();

        let redemption = self.promos.redeem(promo_id, reservation_id).await?;
        let code = self
            .promos
            .find_by_id(promo_id)
            .await?
            .map(|p| p.code)
            .unwrap_or_default();
        let usage = PromoUsageEvent {
            promo_code_id: promo_id,
            reservation_id,
            code,
            timestamp: self.clock.now().timestamp(),
        };

        match redemption {
            Redemption::Redeemed => {
                info!(%reservation_id, %promo_id, "Promo usage committed");
                publish_json(self.events.as_ref(), topics::PROMO_REDEEMED, &promo_id.to_string(), &usage).await;
            }
            Redemption::AlreadyRedeemed => {
                debug!(%reservation_id, %promo_id, "Promo usage already committed");
            }
            Redemption::CapReached => {
                warn!(%reservation_id, %promo_id, "Promo cap reached after payment");
                if reservation.header.notice.is_none() {
                    self.reservations.annotate(reservation_id, PROMO_LIMIT_NOTICE).await?;
                    publish_json(self.events.as_ref(), topics::PROMO_LIMIT_REACHED, &promo_id.to_string(), &usage)
                        .await;
                }
            }
        }

        Ok(Some(redemption))
    }
}
