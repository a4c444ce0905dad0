use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::jobs::ProcessorSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Allowed CORS origins; empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Pool settings for the persistence layer.
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Export pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Start the export processor together with the HTTP server.
    #[serde(default = "default_export_enabled")]
    pub enabled: bool,

    /// Directory rendered files are written to. Created if absent.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Pending jobs claimed per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    #[serde(default = "default_collection_timeout")]
    pub collection_timeout_secs: u64,

    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Per-attempt connection acquisition timeout.
    #[serde(default = "default_export_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Backoff before retry `n` is `backoff_base_secs * 2^(n-1)`.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    #[serde(default = "default_drain_check_interval")]
    pub drain_check_interval_ms: u64,

    /// Hours until a job's `expires_at`.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: default_export_enabled(),
            output_dir: default_output_dir(),
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            collection_timeout_secs: default_collection_timeout(),
            connect_attempts: default_connect_attempts(),
            connect_timeout_secs: default_export_connect_timeout(),
            backoff_base_secs: default_backoff_base(),
            drain_check_interval_ms: default_drain_check_interval(),
            retention_hours: default_retention_hours(),
        }
    }
}

impl ExportConfig {
    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            batch_size: self.batch_size,
            collection_timeout: Duration::from_secs(self.collection_timeout_secs),
            connect_attempts: self.connect_attempts,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            backoff_base: Duration::from_secs(self.backoff_base_secs),
            drain_check_interval: Duration::from_millis(self.drain_check_interval_ms),
            output_dir: self.output_dir.clone(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_export_enabled() -> bool {
    true
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}
fn default_poll_interval() -> u64 {
    30
}
fn default_batch_size() -> i64 {
    5
}
fn default_collection_timeout() -> u64 {
    300
}
fn default_connect_attempts() -> u32 {
    3
}
fn default_export_connect_timeout() -> u64 {
    5
}
fn default_backoff_base() -> u64 {
    2
}
fn default_drain_check_interval() -> u64 {
    1000
}
fn default_retention_hours() -> i64 {
    domain::models::EXPORT_JOB_RETENTION_HOURS
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with TP__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("TP").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults and overrides only, without
    /// touching the config directory.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            cors_origins = []

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [export]
            enabled = true
            output_dir = "exports"
            poll_interval_secs = 30
            batch_size = 5
            collection_timeout_secs = 300
            connect_attempts = 3
            connect_timeout_secs = 5
            backoff_base_secs = 2
            drain_check_interval_ms = 1000
            retention_hours = 168
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "TP__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.export.batch_size < 1 {
            return Err(ConfigValidationError::InvalidValue(
                "export.batch_size must be at least 1".to_string(),
            ));
        }

        if self.export.connect_attempts < 1 {
            return Err(ConfigValidationError::InvalidValue(
                "export.connect_attempts must be at least 1".to_string(),
            ));
        }

        if self.export.poll_interval_secs < 1 {
            return Err(ConfigValidationError::InvalidValue(
                "export.poll_interval_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
