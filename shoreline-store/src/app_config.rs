use serde::Deserialize;
use shoreline_catalog::PricingConfig;
use std::env;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    #[serde(default)]
    pub pricing: PricingConfig,
    pub payment: PaymentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Postgres,
    #[default]
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_rate_limit() -> i64 { 100 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    Mock,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    pub mode: GatewayMode,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub webhook_secret: String,
    #[serde(default = "default_tolerance")]
    pub webhook_tolerance_seconds: i64,
}

fn default_currency() -> String { "THB".to_string() }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_tolerance() -> i64 { 300 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let file = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let s = config::Config::builder()
            .add_source(config::File::with_name(&file("default")))
            .add_source(config::File::with_name(&file(&run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&file("local")).required(false))
            // Eg. `SHORELINE__PAYMENT__WEBHOOK_SECRET=...`
            .add_source(config::Environment::with_prefix("SHORELINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[server]
port = 9090

[database]
url = "postgres://localhost/test"

[pricing]
private_transport_surcharge = 3000
non_player_fee = 150

[payment]
mode = "mock"
webhook_secret = "whsec_test"
"#,
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.redis.is_none());
        assert_eq!(config.pricing.private_transport_surcharge, Decimal::from(3000));
        assert_eq!(config.pricing.non_player_fee, Decimal::from(150));
        assert_eq!(config.payment.mode, GatewayMode::Mock);
        assert_eq!(config.payment.currency, "THB");
        assert_eq!(config.payment.timeout_ms, 10_000);
        assert_eq!(config.payment.webhook_tolerance_seconds, 300);
    }
}
