//! Outbox relay.
//!
//! Polls the outbox for rows that are not yet published and hands each
//! envelope to the event bus. Rows are only visible here after the write
//! that produced them committed, so `discussion.resolved.v1` reaches the
//! action executor strictly after RESOLVED is durable.
//!
//! A row whose delivery fails is marked failed and picked up again on the
//! next pass; the relay itself never gives up on a row.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::domain::foundation::DomainError;
use crate::ports::{EventPublisher, OutboxEntry, OutboxWriter};

#[derive(Debug, Clone)]
pub struct OutboxPublisherConfig {
    pub poll_interval: Duration,
    /// Rows fetched per pass.
    pub batch_size: u32,
}

impl Default for OutboxPublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 100,
        }
    }
}

impl OutboxPublisherConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

pub struct OutboxPublisher {
    outbox: Arc<dyn OutboxWriter>,
    bus: Arc<dyn EventPublisher>,
    config: OutboxPublisherConfig,
}

impl OutboxPublisher {
    pub fn new(outbox: Arc<dyn OutboxWriter>, bus: Arc<dyn EventPublisher>) -> Self {
        Self::with_config(outbox, bus, OutboxPublisherConfig::default())
    }

    pub fn with_config(
        outbox: Arc<dyn OutboxWriter>,
        bus: Arc<dyn EventPublisher>,
        config: OutboxPublisherConfig,
    ) -> Self {
        Self { outbox, bus, config }
    }

    /// Poll until `shutdown` turns `true` (or its sender goes away), then
    /// drain one last batch.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Outbox relay started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.pass("Outbox batch failed").await,
                changed = shutdown.changed() => {
                    if changed.is_ok() && !*shutdown.borrow() {
                        continue;
                    }
                    self.pass("Final outbox batch failed").await;
                    break;
                }
            }
        }
        tracing::info!("Outbox relay stopped");
    }

    async fn pass(&self, failure: &'static str) {
        if let Err(e) = self.process_batch().await {
            tracing::error!(error = %e, "{}", failure);
        }
    }

    /// Deliver up to `batch_size` rows. Returns how many were published.
    ///
    /// # Errors
    ///
    /// Only outbox reads and status writes fail the batch; a rejected
    /// delivery is recorded on its row instead.
    pub async fn process_batch(&self) -> Result<usize, DomainError> {
        let mut published = 0;
        for entry in self.outbox.get_pending(self.config.batch_size).await? {
            if self.deliver(&entry).await? {
                published += 1;
            }
        }

        if published > 0 {
            tracing::debug!(published, "Outbox batch published");
        }
        Ok(published)
    }

    async fn deliver(&self, entry: &OutboxEntry) -> Result<bool, DomainError> {
        match self.bus.publish(entry.event.clone()).await {
            Ok(()) => {
                self.outbox.mark_published(entry.id).await?;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(
                    event_id = %entry.event.event_id,
                    event_type = %entry.event.event_type,
                    attempt = entry.attempts + 1,
                    error = %e,
                    "Outbox delivery failed"
                );
                self.outbox.mark_failed(entry.id, &e.to_string()).await?;
                Ok(false)
            }
        }
    }
}
