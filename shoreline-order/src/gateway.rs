use async_trait::async_trait;
use serde::Deserialize;
use shoreline_core::payment::{Authorization, AuthorizationRequest, GatewayError, PaymentGateway};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// In-process gateway for local runs and tests. Authorizations are always
/// granted unless the gateway was built `unavailable`.
pub struct MockPaymentGateway {
    delay: Option<Duration>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            delay: None,
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails as if the processor could not be reached
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    /// Sleep before answering, for exercising caller timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Authorization id the mock hands out for a reservation
    pub fn authorization_id_for(reservation_id: uuid::Uuid) -> String {
        format!("mock_auth_{}", reservation_id.simple())
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.unavailable {
            return Err(GatewayError::Transport("mock gateway unavailable".to_string()));
        }

        let authorization_id = Self::authorization_id_for(request.reservation_id);
        Ok(Authorization {
            client_secret: format!("{}_secret", authorization_id),
            authorization_id,
        })
    }
}

/// Manual-capture payment intents over the processor's REST API.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

#[derive(Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(api_base: &str, api_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

fn map_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization, GatewayError> {
        let reservation_id = request.reservation_id.to_string();
        let amount = request.amount_minor_units.to_string();
        let currency = request.currency.to_lowercase();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency.as_str()),
            ("capture_method", "manual"),
            ("description", request.description.as_str()),
            ("metadata[reservation_id]", reservation_id.as_str()),
            ("metadata[reference_code]", request.reference_code.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.api_key)
            // Retries of the same reservation must not open a second hold
            .header("Idempotency-Key", reservation_id.as_str())
            .form(&form)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ErrorBody>().await {
                Ok(body) => body
                    .error
                    .message
                    .or(body.error.code)
                    .unwrap_or_else(|| status.to_string()),
                Err(_) => status.to_string(),
            };
            warn!(%reservation_id, %status, "Payment authorization refused: {}", detail);
            return Err(if status.is_server_error() {
                GatewayError::Transport(detail)
            } else {
                GatewayError::Rejected(detail)
            });
        }

        let intent: IntentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| GatewayError::InvalidResponse("missing client_secret".to_string()))?;

        info!(%reservation_id, authorization_id = %intent.id, "Payment authorization created");
        Ok(Authorization {
            authorization_id: intent.id,
            client_secret,
        })
    }
}
