//! tasklist-bot - task lists and reminders over Telegram
//!
//! A per-user conversation state machine drives list and task management;
//! a background scheduler delivers due reminders.

mod config;
mod db;
mod runtime;
mod scheduler;
mod state_machine;
mod telegram;

use config::BotConfig;
use db::Database;
use runtime::{ConversationRuntime, DatabaseStore, InMemorySessionStore, SystemClock};
use scheduler::ReminderScheduler;
use std::sync::Arc;
use telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasklist_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let store = Arc::new(DatabaseStore::new(db));
    let client = Arc::new(TelegramClient::new(
        &config.api_url,
        &config.token,
        config.poll_timeout,
    )?);
    let clock = Arc::new(SystemClock);

    let runtime: runtime::ProductionRuntime = ConversationRuntime::new(
        store.clone(),
        client.clone(),
        Arc::new(InMemorySessionStore::new()),
        clock.clone(),
    );

    let scheduler = ReminderScheduler::new(store, client.clone(), clock, config.scheduler);
    scheduler.start();

    // Stop polling on Ctrl-C
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown requested");
        shutdown.cancel();
    });

    telegram::run_polling(&client, &runtime, cancel).await;
    scheduler.stop().await;

    Ok(())
}
