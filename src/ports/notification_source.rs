//! NotificationSource port - a listener connection delivering channel
//! notifications (Postgres `LISTEN`/`NOTIFY` in production).

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::DomainError;

/// A single notification received on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: String,
    pub payload: String,
}

impl Notification {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Port for a reconnectable notification listener.
///
/// The scheduler drives it through connect, subscribe and bounded receive
/// calls; any error makes it drop the connection and start over.
#[async_trait]
pub trait NotificationSource: Send {
    /// Open a fresh connection, discarding any previous one.
    async fn connect(&mut self) -> Result<(), DomainError>;

    /// Start listening on the given channels.
    async fn subscribe(&mut self, channels: &[&str]) -> Result<(), DomainError>;

    /// Wait at most `timeout` for the next notification.
    ///
    /// Returns `Ok(None)` when the wait timed out with nothing received.
    async fn recv(&mut self, timeout: Duration) -> Result<Option<Notification>, DomainError>;
}
