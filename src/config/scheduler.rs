//! Session phase scheduler configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::SchedulerConfig as ListenerConfig;

/// Timing of the LISTEN loop that drives voting session phases.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// How long a single wait for a notification may block, in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Pause before reconnecting after a connection failure, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// How long shutdown waits for background tasks, in seconds
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl SchedulerConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Listener timing for [`crate::application::SessionPhaseScheduler`].
    pub fn listener(&self) -> ListenerConfig {
        ListenerConfig::default()
            .with_poll_timeout(self.poll_timeout())
            .with_retry_delay(self.retry_delay())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_timeout_secs == 0 {
            return Err(ValidationError::ZeroDuration("SCHEDULER__POLL_TIMEOUT_SECS"));
        }
        if self.retry_delay_secs == 0 {
            return Err(ValidationError::ZeroDuration("SCHEDULER__RETRY_DELAY_SECS"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_timeout_secs: default_poll_timeout(),
            retry_delay_secs: default_retry_delay(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

fn default_poll_timeout() -> u64 {
    10
}

fn default_retry_delay() -> u64 {
    10
}

fn default_shutdown_grace() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.poll_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_delay(), Duration::from_secs(10));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_listener_config_carries_timing() {
        let config = SchedulerConfig {
            poll_timeout_secs: 3,
            retry_delay_secs: 7,
            ..Default::default()
        };
        let listener = config.listener();
        assert_eq!(listener.poll_timeout, Duration::from_secs(3));
        assert_eq!(listener.retry_delay, Duration::from_secs(7));
    }

    #[test]
    fn test_zero_retry_delay_is_rejected() {
        let config = SchedulerConfig {
            retry_delay_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::ZeroDuration("SCHEDULER__RETRY_DELAY_SECS"))
        );
    }
}
