//! Runtime environment and log output

use serde::Deserialize;

const DEFAULT_LOG_FILTER: &str = "info,veche_governance=debug,sqlx=warn";

/// Deployment environment the worker runs in.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// `VECHE__RUNTIME__*` settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub environment: Environment,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Production emits JSON lines; everything else gets the human format.
    pub fn json_logs(&self) -> bool {
        self.is_production()
    }
}
