use shoreline_order::{ReconciliationListener, ReservationOrchestrator};
use shoreline_store::RedisClient;
use std::sync::Arc;

use crate::middleware::ResiliencyState;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ReservationOrchestrator>,
    pub listener: Arc<ReconciliationListener>,
    /// Rate limiting is off without it
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit_per_minute: i64,
    pub resiliency: Arc<ResiliencyState>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ReservationOrchestrator>, listener: Arc<ReconciliationListener>) -> Self {
        Self {
            orchestrator,
            listener,
            redis: None,
            rate_limit_per_minute: 100,
            resiliency: Arc::new(ResiliencyState::default()),
        }
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, per_minute: i64) -> Self {
        self.redis = Some(redis);
        self.rate_limit_per_minute = per_minute;
        self
    }

    pub fn with_resiliency(mut self, resiliency: ResiliencyState) -> Self {
        self.resiliency = Arc::new(resiliency);
        self
    }
}
