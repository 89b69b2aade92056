//! Server configuration.
//!
//! Values are layered, later layers winning: built-in defaults, an optional
//! YAML file, environment variables, then command-line flags (applied by the
//! daemon binary).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_TOKEN_TTL_DAYS;

/// Environment variable naming the PostgreSQL connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Environment variable holding the token signing secret.
pub const JWT_SECRET_ENV: &str = "PLANTCARE_JWT_SECRET";

/// Errors loading or validating a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_yml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for the `plantcared` daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL URL; without one the daemon keeps everything in memory.
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub sweep_interval_secs: u64,
    pub token_ttl_days: u64,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            database_url: None,
            jwt_secret: None,
            sweep_interval_secs: 60,
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS as u64,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parses a YAML document; missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(ServerConfig::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Reads and parses a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Overlays values found through `lookup`, typically `std::env::var`.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = lookup(DATABASE_URL_ENV) {
            self.database_url = Some(url);
        }
        if let Some(secret) = lookup(JWT_SECRET_ENV) {
            self.jwt_secret = Some(secret);
        }
    }

    /// Rejects settings the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep interval must be at least one second".to_string(),
            ));
        }
        if self.token_ttl_days == 0 || self.token_ttl_days > 365 {
            return Err(ConfigError::Invalid(
                "token lifetime must be between 1 and 365 days".to_string(),
            ));
        }
        if matches!(&self.jwt_secret, Some(secret) if secret.len() < 16) {
            return Err(ConfigError::Invalid(
                "jwt secret must be at least 16 bytes".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.token_ttl_days as i64)
    }

    /// The configured signing secret, or a random one that lasts for this
    /// process only (tokens will not survive a restart).
    pub fn signing_secret(&self) -> Vec<u8> {
        match &self.jwt_secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                tracing::warn!(
                    "no {} configured; using an ephemeral signing secret",
                    JWT_SECRET_ENV
                );
                let mut secret = uuid::Uuid::new_v4().as_bytes().to_vec();
                secret.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
                secret
            }
        }
    }
}
