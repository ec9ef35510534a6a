use anyhow::Context;
use shoreline_api::{app, AppState};
use shoreline_core::events::EventPublisher;
use shoreline_core::repository::{CatalogRepository, PromoRepository, ReservationRepository};
use shoreline_core::{payment::PaymentGateway, Clock, SystemClock};
use shoreline_order::{
    HttpPaymentGateway, MockPaymentGateway, OrchestratorDeps, OrchestratorSettings,
    ReconciliationListener, ReservationOrchestrator, WebhookVerifier,
};
use shoreline_catalog::PricingEngine;
use shoreline_store::app_config::{Config, GatewayMode, StorageBackend};
use shoreline_store::{
    DbClient, InMemoryStore, LogEventPublisher, PgCatalogRepository, PgPromoRepository,
    PgReservationRepository, RedisClient,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Repositories = (
    Arc<dyn CatalogRepository>,
    Arc<dyn PromoRepository>,
    Arc<dyn ReservationRepository>,
);

async fn repositories(config: &Config) -> anyhow::Result<Repositories> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;

            let repos: Repositories = (
                Arc::new(PgCatalogRepository::new(db.pool.clone())),
                Arc::new(PgPromoRepository::new(db.pool.clone())),
                Arc::new(PgReservationRepository::new(db.pool)),
            );
            Ok(repos)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage with demo catalog; data is lost on restart");
            let store = Arc::new(InMemoryStore::new());
            store.seed_demo().await;
            let repos: Repositories = (store.clone(), store.clone(), store);
            Ok(repos)
        }
    }
}

fn gateway(config: &Config) -> anyhow::Result<Arc<dyn PaymentGateway>> {
    let payment = &config.payment;
    match payment.mode {
        GatewayMode::Mock => {
            tracing::warn!("Payment gateway in mock mode; authorizations are simulated");
            Ok(Arc::new(MockPaymentGateway::new()))
        }
        GatewayMode::Http => {
            let api_base = payment.api_base.as_deref().context("payment.api_base is required in http mode")?;
            let api_key = payment.api_key.as_deref().context("payment.api_key is required in http mode")?;
            let gateway = HttpPaymentGateway::new(api_base, api_key, Duration::from_millis(payment.timeout_ms))?;
            Ok(Arc::new(gateway))
        }
    }
}

#[cfg(feature = "kafka")]
fn publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisher>> {
    match &config.kafka {
        Some(kafka) => Ok(Arc::new(
            shoreline_store::EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?,
        )),
        None => Ok(Arc::new(LogEventPublisher)),
    }
}

#[cfg(not(feature = "kafka"))]
fn publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisher>> {
    if config.kafka.is_some() {
        tracing::warn!("kafka section ignored: built without the `kafka` feature");
    }
    Ok(Arc::new(LogEventPublisher))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shoreline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Shoreline API on port {}", config.server.port);

    let (catalog, promos, reservations) = repositories(&config).await?;
    let events = publisher(&config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let orchestrator = ReservationOrchestrator::new(
        OrchestratorDeps {
            catalog,
            promos: promos.clone(),
            reservations: reservations.clone(),
            gateway: gateway(&config)?,
            events: events.clone(),
            clock: clock.clone(),
        },
        PricingEngine::new(config.pricing.clone()),
        OrchestratorSettings {
            currency: config.payment.currency.clone(),
            gateway_timeout: Duration::from_millis(config.payment.timeout_ms),
        },
    );

    let listener = ReconciliationListener::new(
        reservations,
        promos,
        events,
        WebhookVerifier::new(&config.payment.webhook_secret, config.payment.webhook_tolerance_seconds),
        clock,
    );

    let mut state = AppState::new(Arc::new(orchestrator), Arc::new(listener));
    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url)
            .await
            .context("Failed to create Redis client")?;
        state = state.with_rate_limit(Arc::new(client), redis.rate_limit_per_minute);
    }

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
