//! Connector runtime configuration: TOML defaults layered with environment
//! variable overrides, the same two-step shape as an `AppConfig`/
//! `ConfigLoader` pair, re-keyed to the settings a connector process needs
//! instead of a full platform server.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Deployment environment. Gates fail-closed dedupe boot validation per
/// the runtime's startup contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Only `development` may fall back to an in-memory dedupe store on an
    /// unreachable boot ping; `staging`/`production` must abort.
    pub fn requires_reachable_dedupe(&self) -> bool {
        !matches!(self, Environment::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "staging" => Some(Environment::Staging),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    /// `REDIS_URL`. Absent in development falls back to the in-memory store.
    pub redis_url: Option<String>,
    /// Key prefix namespacing this connector's dedupe entries, e.g. `whatsapp:dedupe:`.
    pub key_prefix: String,
    pub ttl_ms: u64,
    pub boot_ping_timeout_ms: u64,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "connector:dedupe:".to_string(),
            ttl_ms: 300_000,
            boot_ping_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Absent disables rate limiting entirely.
    pub per_minute: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { per_minute: None }
    }
}

/// Root connector configuration. One process serves exactly one connector
/// (e.g. `whatsapp`), so the verify token / webhook secret are scalar
/// fields rather than a map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub environment: Environment,
    pub http: HttpConfig,
    pub dedupe: DedupeConfig,
    pub rate_limit: RateLimitConfig,
    /// `<CONNECTOR>_VERIFY_TOKEN`. Required for the GET handshake to succeed;
    /// absent means every handshake attempt is rejected `SERVICE_UNAVAILABLE`.
    pub verify_token: Option<String>,
    /// `<CONNECTOR>_WEBHOOK_SECRET`. Absent disables signature verification.
    pub webhook_secret: Option<String>,
    /// `STAGING_OUTBOUND_TOKEN`. Absent disables the staging outbound endpoint
    /// entirely, independent of `environment`.
    pub staging_outbound_token: Option<String>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            http: HttpConfig::default(),
            dedupe: DedupeConfig::default(),
            rate_limit: RateLimitConfig::default(),
            verify_token: None,
            webhook_secret: None,
            staging_outbound_token: None,
        }
    }
}

impl ConnectorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ConnectorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    /// `connector_prefix` names the connector-specific env var family, e.g.
    /// `"WHATSAPP"` for `WHATSAPP_VERIFY_TOKEN` / `WHATSAPP_WEBHOOK_SECRET`.
    pub fn load(connector_prefix: &str) -> Result<Self, ConfigError> {
        ConfigLoader::new(connector_prefix).load()
    }

    pub fn example_toml() -> String {
        r#"# Connector runtime configuration
# Environment variables override these settings

environment = "development"

[http]
port = 8080
host = "0.0.0.0"

[dedupe]
key_prefix = "whatsapp:dedupe:"
ttl_ms = 300000
boot_ping_timeout_ms = 5000

[rate_limit]
# per_minute = 600
"#
        .to_string()
    }
}
