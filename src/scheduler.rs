//! Reminder scheduler
//!
//! A single background task polls the store for due reminders on a fixed
//! interval, delivers them through the notifier and deletes them. Ticks never
//! overlap; cancellation is observed between ticks only.

use crate::db::{DbResult, Item, Reminder, TaskList, User};
use crate::runtime::render;
use crate::runtime::{Clock, Notifier, OutboundMessage, ReminderStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default polling period
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default half-width of the due window
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(30);

/// Widest half-width that keeps the time-of-day window below a full day
pub const MAX_TOLERANCE: Duration = Duration::from_secs(12 * 60 * 60 - 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub tolerance: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl SchedulerConfig {
    /// Replace values the loop cannot run with
    ///
    /// A zero interval falls back to the default; the tolerance is capped at
    /// [`MAX_TOLERANCE`].
    #[must_use]
    pub fn sanitized(self) -> Self {
        let interval = if self.interval.is_zero() {
            tracing::warn!("Reminder interval must be non-zero, using the default");
            DEFAULT_INTERVAL
        } else {
            self.interval
        };
        let tolerance = if self.tolerance > MAX_TOLERANCE {
            tracing::warn!(
                tolerance_secs = self.tolerance.as_secs(),
                "Reminder tolerance too wide, capping"
            );
            MAX_TOLERANCE
        } else {
            self.tolerance
        };
        Self {
            interval,
            tolerance,
        }
    }
}

/// Outcome counts of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

struct Dispatcher<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    tolerance: chrono::Duration,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic delivery of due reminders
pub struct ReminderScheduler<S, N>
where
    S: ReminderStore + 'static,
    N: Notifier + 'static,
{
    dispatcher: Arc<Dispatcher<S, N>>,
    interval: Duration,
    running: Mutex<Option<Running>>,
}

impl<S, N> ReminderScheduler<S, N>
where
    S: ReminderStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let config = config.sanitized();
        let tolerance =
            chrono::Duration::from_std(config.tolerance).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            dispatcher: Arc::new(Dispatcher {
                store,
                notifier,
                clock,
                tolerance,
            }),
            interval: config.interval,
            running: Mutex::new(None),
        }
    }

    /// Spawn the polling loop; the first tick runs immediately
    ///
    /// Does nothing if the loop is already running.
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            tracing::debug!("Reminder scheduler already running");
            return;
        }

        let cancel = CancellationToken::new();
        let dispatcher = self.dispatcher.clone();
        let period = self.interval;
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            run_loop(dispatcher, period, token).await;
        });

        tracing::info!(interval_secs = period.as_secs(), "Reminder scheduler started");
        *running = Some(Running { cancel, handle });
    }

    /// Cancel future ticks and wait for an in-flight tick to finish
    ///
    /// Safe to call repeatedly or before `start`.
    pub async fn stop(&self) {
        let running = self.running.lock().unwrap().take();
        let Some(running) = running else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            tracing::error!(error = %e, "Reminder scheduler task failed");
        }
        tracing::info!("Reminder scheduler stopped");
    }

    /// Run one tick inline
    #[cfg(test)]
    pub async fn run_tick(&self) -> TickReport {
        self.dispatcher.run_tick().await
    }
}

async fn run_loop<S, N>(dispatcher: Arc<Dispatcher<S, N>>, period: Duration, cancel: CancellationToken)
where
    S: ReminderStore + 'static,
    N: Notifier + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Not raced against cancellation: a started tick completes
                let report = dispatcher.run_tick().await;
                if report.due > 0 {
                    tracing::info!(
                        due = report.due,
                        delivered = report.delivered,
                        failed = report.failed,
                        skipped = report.skipped,
                        "Reminder tick finished"
                    );
                }
            }
        }
    }
}

impl<S, N> Dispatcher<S, N>
where
    S: ReminderStore,
    N: Notifier,
{
    async fn run_tick(&self) -> TickReport {
        let now = self.clock.now();
        let due = match self.store.due_reminders(now, self.tolerance).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "Failed to query due reminders");
                return TickReport::default();
            }
        };

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };
        tracing::debug!(due = report.due, %now, "Reminder tick");

        for reminder in &due {
            match self.resolve(reminder).await {
                Ok((item, list, user)) => {
                    let text = render::reminder_notification(&list, &item, reminder);
                    match self.notifier.send(user.id, OutboundMessage::text(text)).await {
                        Ok(()) => {
                            tracing::info!(reminder_id = reminder.id, user_id = user.id, "Reminder delivered");
                            report.delivered += 1;
                        }
                        Err(e) => {
                            tracing::error!(reminder_id = reminder.id, user_id = user.id, error = %e, "Reminder delivery failed");
                            report.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(reminder_id = reminder.id, item_id = reminder.item_id, error = %e, "Skipping reminder with missing owner");
                    report.skipped += 1;
                }
            }

            // Removed after every attempt, delivered or not
            if let Err(e) = self.store.remove_reminder(reminder.id).await {
                tracing::error!(reminder_id = reminder.id, error = %e, "Failed to remove reminder");
            }
        }

        report
    }

    /// Follow reminder -> item -> list -> user
    async fn resolve(&self, reminder: &Reminder) -> DbResult<(Item, TaskList, User)> {
        let item = self.store.get_item_by_id(reminder.item_id).await?;
        let list = self.store.get_list(item.list_id).await?;
        let user = self.store.get_user(list.user_id).await?;
        Ok((item, list, user))
    }
}
