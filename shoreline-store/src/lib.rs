pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod events;
pub mod memory;
pub mod promo_repo;
pub mod redis_repo;
pub mod reservation_repo;

pub use catalog_repo::PgCatalogRepository;
pub use database::DbClient;
pub use events::LogEventPublisher;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use memory::{FailurePoint, InMemoryStore};
pub use promo_repo::PgPromoRepository;
pub use redis_repo::RedisClient;
pub use reservation_repo::PgReservationRepository;
