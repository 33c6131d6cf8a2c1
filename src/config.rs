//! Configuration loading and management.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity and listen address.
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session token configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Content limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name used in logs (e.g., "circled.example.net").
    pub name: String,
    /// Address the HTTP API listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. `:memory:` for an in-memory
    /// database (used by tests).
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign access tokens. The server refuses to start
    /// with the placeholder value unless explicitly overridden.
    #[serde(default = "default_session_secret")]
    pub session_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: default_session_secret(),
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_days: default_refresh_ttl_days(),
        }
    }
}

impl AuthConfig {
    /// Whether the configured secret is the insecure placeholder.
    pub fn is_default_secret(&self) -> bool {
        self.session_secret == default_session_secret() || self.session_secret.len() < 16
    }
}

/// Content limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum length of a group's rules text.
    #[serde(default = "default_rules_max_len")]
    pub rules_max_len: usize,
    /// Default page size for the post feed.
    #[serde(default = "default_feed_limit")]
    pub feed_limit: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rules_max_len: default_rules_max_len(),
            feed_limit: default_feed_limit(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_db_path() -> String {
    "circled.db".to_string()
}

fn default_session_secret() -> String {
    "change-me".to_string()
}

fn default_access_ttl_secs() -> u64 {
    3600
}

fn default_refresh_ttl_days() -> u32 {
    60
}

fn default_rules_max_len() -> usize {
    1500
}

fn default_feed_limit() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_applies_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "circled.test"
            "#,
        )
        .expect("minimal config should parse");

        assert_eq!(config.database.path, "circled.db");
        assert_eq!(config.auth.access_ttl_secs, 3600);
        assert_eq!(config.auth.refresh_ttl_days, 60);
        assert_eq!(config.limits.rules_max_len, 1500);
        assert!(config.auth.is_default_secret());
    }

    #[test]
    fn test_short_secret_is_insecure() {
        let auth = AuthConfig {
            session_secret: "abc".into(),
            ..AuthConfig::default()
        };
        assert!(auth.is_default_secret());

        let auth = AuthConfig {
            session_secret: "a-long-enough-random-secret".into(),
            ..AuthConfig::default()
        };
        assert!(!auth.is_default_secret());
    }
}
