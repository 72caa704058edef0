//! Configuration module for feedy.

use serde::Deserialize;
use std::path::Path;

use crate::{FeedyError, Result};

/// Application identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Display name used for system notices and unnamed subscriptions.
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Shared secret used to issue messaging API credentials.
    #[serde(default)]
    pub secret: String,
}

fn default_app_name() -> String {
    "Feedy".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            secret: String::new(),
        }
    }
}

/// Webhook server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://...` or `postgres://...`).
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_url() -> String {
    "sqlite://data/feedy.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Messaging API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelTalkConfig {
    /// Base URL of the app store API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Timeout for a single outbound call in seconds.
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://app-store-api.channel.io".to_string()
}

fn default_client_timeout() -> u64 {
    5
}

impl Default for ChannelTalkConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_client_timeout(),
        }
    }
}

/// Feed fetcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Allow feeds on loopback and private network addresses.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            allow_private_hosts: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, written in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            json: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Application identity.
    #[serde(default)]
    pub app: AppConfig,
    /// Webhook server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Messaging API configuration.
    #[serde(default)]
    pub channeltalk: ChannelTalkConfig,
    /// Feed fetcher configuration.
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedyError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedyError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Empty values are ignored.
    /// - `FEEDY_APP_SECRET` overrides `app.secret`
    /// - `FEEDY_DATABASE_URL` overrides `database.url`
    /// - `FEEDY_LOG_LEVEL` overrides `logging.level`
    pub fn apply_env_overrides(&mut self) {
        if let Some(secret) = non_empty_env("FEEDY_APP_SECRET") {
            self.app.secret = secret;
        }
        if let Some(url) = non_empty_env("FEEDY_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(level) = non_empty_env("FEEDY_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the messaging API secret is not set.
    pub fn validate(&self) -> Result<()> {
        if self.app.secret.is_empty() {
            return Err(FeedyError::Config(
                "app.secret is not set. \
                 Set it in config.toml or via FEEDY_APP_SECRET environment variable."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
