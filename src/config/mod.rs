//! Worker configuration.
//!
//! Everything is read from the environment (plus an optional `.env` file)
//! through the `config` crate. Keys take the `VECHE__` prefix and nest with
//! `__`:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `VECHE__DATABASE__URL` | `database.url` (required) |
//! | `VECHE__RUNTIME__ENVIRONMENT` | `runtime.environment` |
//! | `VECHE__SCHEDULER__RETRY_DELAY_SECS` | `scheduler.retry_delay_secs` |
//! | `VECHE__OUTBOX__BATCH_SIZE` | `outbox.batch_size` |
//!
//! ```no_run
//! use veche_governance::config::AppConfig;
//!
//! let config = AppConfig::load().expect("configuration");
//! config.validate().expect("valid configuration");
//! ```

mod database;
mod error;
mod outbox;
mod runtime;
mod scheduler;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use outbox::OutboxConfig;
pub use runtime::{Environment, RuntimeConfig};
pub use scheduler::SchedulerConfig;

use serde::Deserialize;

/// Root configuration. Only `database` has no usable default.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub outbox: OutboxConfig,
}

impl AppConfig {
    /// Read `.env` if present, then the `VECHE__` environment.
    ///
    /// # Errors
    ///
    /// `LoadError` when the database section is absent or a value does not
    /// parse into its field type.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let source = config::Environment::default()
            .prefix("VECHE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true);

        Ok(config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.scheduler.validate()?;
        self.outbox.validate()
    }

    pub fn is_production(&self) -> bool {
        self.runtime.is_production()
    }
}
