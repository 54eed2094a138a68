//! Veche governance worker.
//!
//! Runs the outbox relay (which delivers resolution events to the action
//! executor) and the session phase scheduler until Ctrl-C.

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use veche_governance::adapters::{
    IdempotentHandler, InMemoryEventBus, OutboxPublisher, PostgresDiscussionRepository,
    PostgresNotificationSource, PostgresOutboxWriter, PostgresPendingActionStore,
    PostgresProcessedEventStore, PostgresVotingSessionRepository, MIGRATOR,
};
use veche_governance::application::{
    ActionExecutor, AdvanceSessionPhaseHandler, SessionPhaseScheduler,
};
use veche_governance::config::AppConfig;
use veche_governance::domain::discussion::DISCUSSION_RESOLVED;
use veche_governance::ports::EventSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(config.database.connection_url())
        .await?;

    if config.database.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let discussions = Arc::new(PostgresDiscussionRepository::new(pool.clone()));
    let sessions = Arc::new(PostgresVotingSessionRepository::new(pool.clone()));
    let actions = Arc::new(PostgresPendingActionStore::new(pool.clone()));
    let processed = Arc::new(PostgresProcessedEventStore::new(pool.clone()));
    let outbox = Arc::new(PostgresOutboxWriter::new(pool.clone()));

    // Resolution events reach the executor only through the relay.
    let bus = Arc::new(InMemoryEventBus::new());
    bus.subscribe(
        DISCUSSION_RESOLVED,
        Arc::new(IdempotentHandler::new(ActionExecutor::new(actions), processed)),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let relay = OutboxPublisher::with_config(outbox, bus, config.outbox.publisher());
    let relay_shutdown = shutdown_rx.clone();
    let relay_task = tokio::spawn(async move { relay.run(relay_shutdown).await });

    let scheduler = SessionPhaseScheduler::new(
        PostgresNotificationSource::new(config.database.url.clone()),
        Arc::new(AdvanceSessionPhaseHandler::new(discussions, sessions)),
        config.scheduler.listener(),
    );
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    tracing::info!(environment = ?config.runtime.environment, "Governance worker started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    // Receivers may already be gone if a task ended early.
    let _ = shutdown_tx.send(true);

    let grace = config.scheduler.shutdown_grace();
    let joined = tokio::time::timeout(grace, async {
        let stats = scheduler_task.await;
        let relay = relay_task.await;
        (stats, relay)
    })
    .await;

    match joined {
        Ok((Ok(stats), Ok(()))) => {
            tracing::info!(
                connects = stats.connects,
                backoffs = stats.backoffs,
                dispatched = stats.dispatched,
                skipped = stats.skipped,
                "Background tasks stopped"
            );
        }
        Ok(_) => tracing::error!("A background task panicked during shutdown"),
        Err(_) => tracing::warn!(
            grace_secs = grace.as_secs(),
            "Background tasks did not stop in time"
        ),
    }

    pool.close().await;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.runtime.log_filter));

    if config.runtime.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
