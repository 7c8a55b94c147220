//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;
use std::sync::LazyLock;
use std::time::Duration;

use crate::constants::{
    notification_backends, storage_backends, DEFAULT_DATABASE_MAX_CONNECTIONS,
    DEFAULT_NOTIFICATION_CHANNEL, DEFAULT_NOTIFICATION_TIMEOUT_MS, DEFAULT_REPOSITORY_TIMEOUT_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
};

/// Global application configuration (lazily initialized)
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub engine: EngineConfig,
    pub notifications: NotificationConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    /// Emit JSON log lines instead of the human-readable format
    pub json_logs: bool,
    pub request_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `postgres` or `memory`
    pub backend: String,
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// JWT verification configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

/// Bounds applied to every external call the engine makes
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub repository_timeout_ms: u64,
    pub notification_timeout_ms: u64,
}

/// Notification fan-out configuration
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// `redis` or `log`
    pub backend: String,
    pub channel: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            redis: RedisConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            engine: EngineConfig::from_env()?,
            notifications: NotificationConfig::from_env()?,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            port: parse_var("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend =
            env::var("STORAGE_BACKEND").unwrap_or_else(|_| storage_backends::POSTGRES.to_string());
        if !storage_backends::ALL.contains(&backend.as_str()) {
            return Err(ConfigError::InvalidValue("STORAGE_BACKEND".to_string()));
        }

        let url = env::var("DATABASE_URL").ok();
        if backend == storage_backends::POSTGRES && url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL".to_string()));
        }

        Ok(Self {
            backend,
            url,
            max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            )?,
        })
    }
}

impl RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        })
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET".to_string()))?,
        })
    }
}

impl EngineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            repository_timeout_ms: parse_var(
                "REPOSITORY_TIMEOUT_MS",
                DEFAULT_REPOSITORY_TIMEOUT_MS,
            )?,
            notification_timeout_ms: parse_var(
                "NOTIFICATION_TIMEOUT_MS",
                DEFAULT_NOTIFICATION_TIMEOUT_MS,
            )?,
        })
    }

    pub fn repository_timeout(&self) -> Duration {
        Duration::from_millis(self.repository_timeout_ms)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }
}

impl NotificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = env::var("NOTIFICATION_BACKEND")
            .unwrap_or_else(|_| notification_backends::LOG.to_string());
        if !notification_backends::ALL.contains(&backend.as_str()) {
            return Err(ConfigError::InvalidValue("NOTIFICATION_BACKEND".to_string()));
        }

        Ok(Self {
            backend,
            channel: env::var("NOTIFICATION_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_NOTIFICATION_CHANNEL.to_string()),
        })
    }
}

fn parse_var<T: std::str::FromStr + ToString>(name: &str, default: T) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
