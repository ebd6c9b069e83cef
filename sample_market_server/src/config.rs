use std::{env, time::Duration};

use log::*;
use market_common::{env_or_default, parse_boolean_flag, Secret, DEFAULT_CURRENCY_CODE};
use sample_market_engine::{PaymentFlowConfig, DEFAULT_TOKENS_PER_MAJOR_UNIT};

const DEFAULT_SM_HOST: &str = "127.0.0.1";
const DEFAULT_SM_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/sample_market.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 1000;
const DEFAULT_GATEWAY_URL: &str = "https://api.yookassa.ru";
const DEFAULT_STORAGE_PUBLIC_URL: &str = "http://localhost:9000";
const DEFAULT_STORAGE_BUCKET: &str = "samples";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// The time between the starts of two reconciliation rounds
    pub reconcile_interval: Duration,
    pub payment_flow: PaymentFlowConfig,
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SM_HOST.to_string(),
            port: DEFAULT_SM_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            reconcile_interval: Duration::from_millis(DEFAULT_RECONCILE_INTERVAL_MS),
            payment_flow: PaymentFlowConfig::default(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env_or_default("SM_HOST", DEFAULT_SM_HOST.to_string());
        let port = env_or_default("SM_PORT", DEFAULT_SM_PORT);
        let database_url = env_or_default("SM_DATABASE_URL", DEFAULT_DATABASE_URL.to_string());
        let db_max_connections = match env_or_default("SM_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS) {
            0 => {
                warn!("🪛️ SM_DB_MAX_CONNECTIONS must be at least 1. Using {DEFAULT_DB_MAX_CONNECTIONS}.");
                DEFAULT_DB_MAX_CONNECTIONS
            },
            n => n,
        };
        let reconcile_interval = configure_reconcile_interval();
        let payment_flow = configure_payment_flow();
        let gateway = GatewayConfig::from_env_or_default();
        let storage = StorageConfig::from_env_or_default();
        Self { host, port, database_url, db_max_connections, reconcile_interval, payment_flow, gateway, storage }
    }
}

fn configure_reconcile_interval() -> Duration {
    let ms = match env_or_default("SM_RECONCILE_INTERVAL_MS", DEFAULT_RECONCILE_INTERVAL_MS) {
        0 => {
            warn!("🪛️ SM_RECONCILE_INTERVAL_MS cannot be zero. Using {DEFAULT_RECONCILE_INTERVAL_MS} ms.");
            DEFAULT_RECONCILE_INTERVAL_MS
        },
        ms => ms,
    };
    Duration::from_millis(ms)
}

fn configure_payment_flow() -> PaymentFlowConfig {
    let tokens_per_major_unit = match env_or_default("SM_TOKENS_PER_MAJOR_UNIT", DEFAULT_TOKENS_PER_MAJOR_UNIT) {
        n if n <= 0 => {
            warn!("🪛️ SM_TOKENS_PER_MAJOR_UNIT must be positive. Using {DEFAULT_TOKENS_PER_MAJOR_UNIT}.");
            DEFAULT_TOKENS_PER_MAJOR_UNIT
        },
        n => n,
    };
    let defaults = PaymentFlowConfig::default();
    let currency = env_or_default("SM_PAYMENT_CURRENCY", DEFAULT_CURRENCY_CODE.to_string()).to_uppercase();
    let description = env_or_default("SM_PAYMENT_DESCRIPTION", defaults.description);
    PaymentFlowConfig { tokens_per_major_unit, currency, description }
}

/// Credentials and endpoint of the payment gateway
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub url: String,
    pub account_id: String,
    pub secret_key: Secret<String>,
    /// Marks every payment as a test payment. No real money moves.
    pub test_mode: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            account_id: String::default(),
            secret_key: Secret::default(),
            test_mode: false,
        }
    }
}

impl GatewayConfig {
    pub fn from_env_or_default() -> Self {
        let url = env_or_default("SM_GATEWAY_URL", DEFAULT_GATEWAY_URL.to_string());
        let account_id = env::var("SM_GATEWAY_ACCOUNT_ID").unwrap_or_else(|_| {
            warn!("🪛️ SM_GATEWAY_ACCOUNT_ID is not set. Payment gateway requests will be rejected.");
            String::default()
        });
        let secret_key = Secret::new(env::var("SM_GATEWAY_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ SM_GATEWAY_SECRET_KEY is not set. Payment gateway requests will be rejected.");
            String::default()
        }));
        let test_mode = parse_boolean_flag(env::var("SM_GATEWAY_TEST_MODE").ok(), false);
        if test_mode {
            info!("🪛️ The payment gateway is in test mode");
        }
        Self { url, account_id, secret_key, test_mode }
    }
}

/// Where sample audio files are published
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub public_url: String,
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { public_url: DEFAULT_STORAGE_PUBLIC_URL.to_string(), bucket: DEFAULT_STORAGE_BUCKET.to_string() }
    }
}

impl StorageConfig {
    pub fn from_env_or_default() -> Self {
        let public_url = env_or_default("SM_STORAGE_PUBLIC_URL", DEFAULT_STORAGE_PUBLIC_URL.to_string());
        let bucket = env_or_default("SM_STORAGE_BUCKET", DEFAULT_STORAGE_BUCKET.to_string());
        Self { public_url, bucket }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_from_env() {
        env::set_var("SM_PORT", "9100");
        env::set_var("SM_RECONCILE_INTERVAL_MS", "0");
        env::set_var("SM_TOKENS_PER_MAJOR_UNIT", "25");
        env::set_var("SM_PAYMENT_CURRENCY", "usd");
        env::set_var("SM_GATEWAY_SECRET_KEY", "live_secret");
        env::set_var("SM_GATEWAY_TEST_MODE", "yes");
        env::remove_var("SM_DB_MAX_CONNECTIONS");
        let config = ServerConfig::from_env_or_default();
        assert_eq!(config.port, 9100);
        assert_eq!(config.reconcile_interval, Duration::from_millis(1000));
        assert_eq!(config.db_max_connections, 25);
        assert_eq!(config.payment_flow.tokens_per_major_unit, 25);
        assert_eq!(config.payment_flow.currency, "USD");
        assert_eq!(config.gateway.secret_key.reveal(), "live_secret");
        assert!(config.gateway.test_mode);
        assert!(!format!("{config:?}").contains("live_secret"));

        env::set_var("SM_TOKENS_PER_MAJOR_UNIT", "-3");
        assert_eq!(configure_payment_flow().tokens_per_major_unit, 10);
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::new("0.0.0.0", 80);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.storage.bucket, "samples");
        assert_eq!(config.gateway.url, "https://api.yookassa.ru");
        assert!(!config.gateway.test_mode);
    }
}
