//! PostgreSQL pool settings

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const POOL_CEILING: u32 = 100;

/// `VECHE__DATABASE__*` settings.
///
/// The URL is shared by the pool and the notification listener. It holds
/// credentials and is redacted in `Debug` output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    /// Apply the embedded migrations before the worker starts.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: SecretString::new(String::new()),
            min_connections: 2,
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            run_migrations: false,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> &str {
        self.url.expose_secret()
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.connection_url();
        if url.is_empty() {
            return Err(ValidationError::MissingRequired("VECHE__DATABASE__URL"));
        }
        if !["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        match (self.min_connections, self.max_connections) {
            (min, max) if min > max => Err(ValidationError::InvalidPoolSize),
            (_, max) if max > POOL_CEILING => Err(ValidationError::PoolSizeTooLarge),
            _ => Ok(()),
        }
    }
}
