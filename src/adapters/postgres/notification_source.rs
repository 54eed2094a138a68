//! PostgreSQL LISTEN connection feeding the session phase scheduler.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgListener;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{Notification, NotificationSource};

/// Dedicated listener connection, opened outside the request pool.
///
/// A lost connection is reported as an error and the listener is dropped;
/// reconnecting is the scheduler's decision.
pub struct PostgresNotificationSource {
    url: SecretString,
    listener: Option<PgListener>,
}

impl PostgresNotificationSource {
    pub fn new(url: SecretString) -> Self {
        Self {
            url,
            listener: None,
        }
    }

    fn listener(&mut self) -> Result<&mut PgListener, DomainError> {
        self.listener
            .as_mut()
            .ok_or_else(|| DomainError::new(ErrorCode::DatabaseError, "Listener is not connected"))
    }
}

#[async_trait]
impl NotificationSource for PostgresNotificationSource {
    async fn connect(&mut self) -> Result<(), DomainError> {
        self.listener = None;
        let listener = PgListener::connect(self.url.expose_secret())
            .await
            .map_err(|e| DomainError::database("Failed to open listener connection", e))?;
        self.listener = Some(listener);
        Ok(())
    }

    async fn subscribe(&mut self, channels: &[&str]) -> Result<(), DomainError> {
        self.listener()?
            .listen_all(channels.iter().copied())
            .await
            .map_err(|e| DomainError::database("Failed to LISTEN", e))
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<Notification>, DomainError> {
        let received = tokio::time::timeout(timeout, self.listener()?.try_recv()).await;

        match received {
            // Nothing arrived within the poll window.
            Err(_) => Ok(None),
            Ok(Ok(Some(notification))) => Ok(Some(Notification::new(
                notification.channel(),
                notification.payload(),
            ))),
            Ok(Ok(None)) => {
                self.listener = None;
                Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "Listener connection lost",
                ))
            }
            Ok(Err(e)) => {
                self.listener = None;
                Err(DomainError::database("Listener receive failed", e))
            }
        }
    }
}
