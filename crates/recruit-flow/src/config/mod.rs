use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::hiring::fields::FieldVisibility;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub hiring: HiringConfig,
}

impl AppConfig {
    /// Reads `.env` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));
        let server = ServerConfig {
            host: var_or("APP_HOST", "127.0.0.1"),
            port: var_or("APP_PORT", "3000")
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
        };

        Ok(Self {
            environment,
            server,
            telemetry: TelemetryConfig {
                log_level: var_or("APP_LOG_LEVEL", "info"),
            },
            hiring: HiringConfig::from_env()?,
        })
    }
}

fn var_or(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}

/// Parses a strictly positive number, or returns `None` when `key` is unset.
fn positive<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .filter(|value| *value > T::default())
            .map(Some)
            .ok_or(ConfigError::InvalidNumber { key }),
        Err(_) => Ok(None),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the hiring pipeline engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiringConfig {
    /// Visibility applied when a stage has no configuration row for a field.
    pub default_field_visibility: FieldVisibility,
    pub invitation_ttl: chrono::Duration,
    pub outbox_interval: Duration,
    pub outbox_batch: usize,
}

impl Default for HiringConfig {
    fn default() -> Self {
        Self {
            default_field_visibility: FieldVisibility::Visible,
            invitation_ttl: chrono::Duration::hours(168),
            outbox_interval: Duration::from_millis(1000),
            outbox_batch: 100,
        }
    }
}

impl HiringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_field_visibility = match env::var("HIRING_DEFAULT_FIELD_VISIBILITY") {
            Ok(raw) => FieldVisibility::parse(&raw)
                .ok_or(ConfigError::InvalidFieldVisibility { value: raw })?,
            Err(_) => defaults.default_field_visibility,
        };

        Ok(Self {
            default_field_visibility,
            invitation_ttl: positive::<u32>("HIRING_INVITATION_TTL_HOURS")?
                .map(|hours| chrono::Duration::hours(i64::from(hours)))
                .unwrap_or(defaults.invitation_ttl),
            outbox_interval: positive::<u64>("HIRING_OUTBOX_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.outbox_interval),
            outbox_batch: positive::<usize>("HIRING_OUTBOX_BATCH")?
                .unwrap_or(defaults.outbox_batch),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("HIRING_DEFAULT_FIELD_VISIBILITY '{value}' must be one of visible, hidden, read_only, required")]
    InvalidFieldVisibility { value: String },
    #[error("{key} must be a positive integer")]
    InvalidNumber { key: &'static str },
}
