//! Outbox relay configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::OutboxPublisherConfig;

/// Polling behaviour of the outbox relay.
#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    /// Delay between relay passes, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum rows fetched per pass
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl OutboxConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Relay settings for [`crate::adapters::OutboxPublisher`].
    pub fn publisher(&self) -> OutboxPublisherConfig {
        OutboxPublisherConfig::default()
            .with_poll_interval(self.poll_interval())
            .with_batch_size(self.batch_size)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::ZeroDuration("OUTBOX__POLL_INTERVAL_MS"));
        }
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ValidationError::InvalidBatchSize);
        }
        Ok(())
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_poll_interval() -> u64 {
    100
}

fn default_batch_size() -> u32 {
    100
}
