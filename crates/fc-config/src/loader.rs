//! Configuration loader: TOML file discovery plus environment variable overrides.

use crate::{ConfigError, ConnectorConfig, Environment};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths, checked in order.
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "connector.toml",
    "./config/connector.toml",
    "/etc/connector/config.toml",
];

pub struct ConfigLoader {
    connector_prefix: String,
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(connector_prefix: impl Into<String>) -> Self {
        Self {
            connector_prefix: connector_prefix.into(),
            config_path: None,
        }
    }

    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConnectorConfig, ConfigError> {
        let mut config = ConnectorConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = ConnectorConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("CONNECTOR_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn apply_env_overrides(&self, config: &mut ConnectorConfig) {
        if let Ok(val) = env::var("NODE_ENV") {
            if let Some(env) = Environment::parse(&val) {
                config.environment = env;
            }
        }

        if let Ok(val) = env::var("CONNECTOR_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http.port = port;
            }
        }
        if let Ok(val) = env::var("CONNECTOR_HTTP_HOST") {
            config.http.host = val;
        }

        if let Ok(val) = env::var("REDIS_URL") {
            config.dedupe.redis_url = Some(val);
        }
        if let Ok(val) = env::var("CONNECTOR_DEDUPE_TTL_MS") {
            if let Ok(ttl) = val.parse() {
                config.dedupe.ttl_ms = ttl;
            }
        }
        if let Ok(val) = env::var("CONNECTOR_DEDUPE_BOOT_PING_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                config.dedupe.boot_ping_timeout_ms = timeout;
            }
        }

        if let Ok(val) = env::var("CONNECTOR_RATE_LIMIT_PER_MINUTE") {
            if let Ok(rpm) = val.parse() {
                config.rate_limit.per_minute = Some(rpm);
            }
        }

        if let Ok(val) = env::var(format!("{}_VERIFY_TOKEN", self.connector_prefix)) {
            config.verify_token = Some(val);
        }
        if let Ok(val) = env::var(format!("{}_WEBHOOK_SECRET", self.connector_prefix)) {
            config.webhook_secret = Some(val);
        }

        if let Ok(val) = env::var("STAGING_OUTBOUND_TOKEN") {
            config.staging_outbound_token = Some(val);
        }
    }
}
