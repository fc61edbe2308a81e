//! Server configuration loading from file and environment variables.

use deppo_auth::{TokenSettings, DEFAULT_ACCESS_TOKEN_LIFETIME_HOURS};
use deppo_db::{DbSettings, ProcedureCatalog, DEFAULT_BUSY_TIMEOUT_MS};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Access token settings.
    #[serde(default)]
    pub token: TokenConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named SQL scripts callable as procedures.
    #[serde(default)]
    pub procedures: HashMap<String, String>,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite path or `file:` URI.
    #[serde(default = "default_connection_string")]
    pub connection_string: String,

    /// Busy timeout for each connection, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Access token configuration.
#[derive(Clone, Deserialize)]
pub struct TokenConfig {
    /// Symmetric signing key.
    #[serde(default)]
    pub security_key: String,

    /// Token issuer (`iss`).
    #[serde(default)]
    pub issuer: String,

    /// Token audience (`aud`).
    #[serde(default)]
    pub audience: String,

    /// Access token lifetime in hours.
    #[serde(default = "default_access_token_lifetime_hours")]
    pub access_token_lifetime_hours: i64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "deppo_db=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_connection_string() -> String {
    "deppo.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_access_token_lifetime_hours() -> i64 {
    DEFAULT_ACCESS_TOKEN_LIFETIME_HOURS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: default_connection_string(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            security_key: String::new(),
            issuer: String::new(),
            audience: String::new(),
            access_token_lifetime_hours: default_access_token_lifetime_hours(),
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("security_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_lifetime_hours", &self.access_token_lifetime_hours)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Connection settings for the repository.
    pub fn db_settings(&self) -> DbSettings {
        DbSettings {
            connection_string: self.database.connection_string.clone(),
            busy_timeout_ms: self.database.busy_timeout_ms,
        }
    }

    /// Signing settings for the token handler.
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            security_key: self.token.security_key.clone(),
            issuer: self.token.issuer.clone(),
            audience: self.token.audience.clone(),
            access_token_lifetime_hours: self.token.access_token_lifetime_hours,
        }
    }

    /// The `[procedures]` table as a catalog.
    pub fn procedure_catalog(&self) -> ProcedureCatalog {
        ProcedureCatalog::from(self.procedures.clone())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `DEPPO_HOST` overrides `server.host`
/// - `DEPPO_PORT` overrides `server.port`
/// - `DEPPO_DB_CONNECTION_STRING` overrides `database.connection_string`
/// - `DEPPO_DB_BUSY_TIMEOUT_MS` overrides `database.busy_timeout_ms`
/// - `DEPPO_TOKEN_SECURITY_KEY` overrides `token.security_key`
/// - `DEPPO_TOKEN_ISSUER` overrides `token.issuer`
/// - `DEPPO_TOKEN_AUDIENCE` overrides `token.audience`
/// - `DEPPO_LOG_LEVEL` overrides `logging.level`
/// - `DEPPO_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `DEPPO_*` overrides read through `lookup`.
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("DEPPO_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("DEPPO_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(connection_string) = lookup("DEPPO_DB_CONNECTION_STRING") {
        config.database.connection_string = connection_string;
    }
    if let Some(timeout) = lookup("DEPPO_DB_BUSY_TIMEOUT_MS") {
        if let Ok(parsed) = timeout.parse() {
            config.database.busy_timeout_ms = parsed;
        }
    }
    if let Some(key) = lookup("DEPPO_TOKEN_SECURITY_KEY") {
        config.token.security_key = key;
    }
    if let Some(issuer) = lookup("DEPPO_TOKEN_ISSUER") {
        config.token.issuer = issuer;
    }
    if let Some(audience) = lookup("DEPPO_TOKEN_AUDIENCE") {
        config.token.audience = audience;
    }
    if let Some(level) = lookup("DEPPO_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("DEPPO_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
