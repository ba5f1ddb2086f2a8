//! Trait abstractions for runtime I/O
//!
//! These traits let the conversation runtime and the reminder scheduler run
//! against mock implementations in tests.

use crate::db::{
    Database, DbResult, Item, ItemStatus, ItemUpdate, Reminder, TaskList, User,
};
use crate::state_machine::SessionContext;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Messages
// ============================================================================

/// Reply keyboard: rows of button labels
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<String>>,
}

impl Keyboard {
    pub fn new<R, L>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }
}

/// Text sent to a chat, optionally replacing its reply keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Text received from a chat user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: i64,
    pub display_name: String,
    pub text: String,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
}

// ============================================================================
// Traits
// ============================================================================

/// Delivers messages to external recipients
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: i64, message: OutboundMessage) -> Result<(), NotifyError>;
}

/// Source of the current local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Per-user session storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the default session for unknown users
    async fn get(&self, user_id: i64) -> SessionContext;
    async fn set(&self, user_id: i64, session: SessionContext);
    async fn clear(&self, user_id: i64);
}

/// The slice of task storage the reminder scheduler needs
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn due_reminders(&self, now: NaiveDateTime, tolerance: Duration)
        -> DbResult<Vec<Reminder>>;
    async fn get_item_by_id(&self, item_id: i64) -> DbResult<Item>;
    async fn get_list(&self, list_id: i64) -> DbResult<TaskList>;
    async fn get_user(&self, user_id: i64) -> DbResult<User>;
    async fn remove_reminder(&self, reminder_id: i64) -> DbResult<()>;
}

/// Persistent storage for users, lists, items and reminders
#[async_trait]
pub trait TaskStore: ReminderStore {
    async fn get_or_create_user(&self, user_id: i64, name: &str) -> DbResult<User>;

    async fn create_list(&self, user_id: i64, title: &str) -> DbResult<TaskList>;
    async fn rename_list(&self, list_id: i64, title: &str) -> DbResult<TaskList>;
    async fn delete_list(&self, list_id: i64) -> DbResult<()>;
    async fn get_user_lists(&self, user_id: i64) -> DbResult<Vec<TaskList>>;
    async fn get_user_lists_count(&self, user_id: i64) -> DbResult<i64>;
    async fn is_list_owner(&self, list_id: i64, user_id: i64) -> DbResult<bool>;

    async fn add_item(
        &self,
        list_id: i64,
        title: &str,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
    ) -> DbResult<Item>;
    async fn update_item(&self, item_id: i64, update: &ItemUpdate) -> DbResult<Item>;
    async fn change_item_status(&self, item_id: i64, status_id: i64) -> DbResult<Item>;
    async fn delete_item(&self, item_id: i64) -> DbResult<()>;
    async fn get_today_and_future_items(&self, list_id: i64, today: NaiveDate)
        -> DbResult<Vec<Item>>;
    async fn get_list_items_count(&self, list_id: i64) -> DbResult<i64>;

    async fn add_reminder(
        &self,
        item_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        now: NaiveDateTime,
    ) -> DbResult<Reminder>;
    async fn add_reminder_in_minutes(
        &self,
        item_id: i64,
        minutes: i64,
        now: NaiveDateTime,
    ) -> DbResult<Reminder>;
    async fn add_reminder_in_hours(
        &self,
        item_id: i64,
        hours: i64,
        now: NaiveDateTime,
    ) -> DbResult<Reminder>;
    async fn add_reminder_before_task(
        &self,
        item_id: i64,
        before: Duration,
        now: NaiveDateTime,
    ) -> DbResult<Reminder>;
    async fn get_reminder(&self, reminder_id: i64) -> DbResult<Reminder>;
    async fn get_item_reminders(&self, item_id: i64) -> DbResult<Vec<Reminder>>;

    async fn get_statuses(&self) -> DbResult<Vec<ItemStatus>>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send(&self, recipient: i64, message: OutboundMessage) -> Result<(), NotifyError> {
        (**self).send(recipient, message).await
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Adapter to use Database as TaskStore
///
/// The rusqlite calls are short and synchronous, so they run inline on the
/// calling task.
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReminderStore for DatabaseStore {
    async fn due_reminders(
        &self,
        now: NaiveDateTime,
        tolerance: Duration,
    ) -> DbResult<Vec<Reminder>> {
        self.db.due_reminders(now, tolerance)
    }

    async fn get_item_by_id(&self, item_id: i64) -> DbResult<Item> {
        self.db.get_item(item_id)
    }

    async fn get_list(&self, list_id: i64) -> DbResult<TaskList> {
        self.db.get_list(list_id)
    }

    async fn get_user(&self, user_id: i64) -> DbResult<User> {
        self.db.get_user(user_id)
    }

    async fn remove_reminder(&self, reminder_id: i64) -> DbResult<()> {
        self.db.remove_reminder(reminder_id)
    }
}

#[async_trait]
impl TaskStore for DatabaseStore {
    async fn get_or_create_user(&self, user_id: i64, name: &str) -> DbResult<User> {
        self.db.get_or_create_user(user_id, name)
    }

    async fn create_list(&self, user_id: i64, title: &str) -> DbResult<TaskList> {
        self.db.create_list(user_id, title)
    }

    async fn rename_list(&self, list_id: i64, title: &str) -> DbResult<TaskList> {
        self.db.rename_list(list_id, title)
    }

    async fn delete_list(&self, list_id: i64) -> DbResult<()> {
        self.db.delete_list(list_id)
    }

    async fn get_user_lists(&self, user_id: i64) -> DbResult<Vec<TaskList>> {
        self.db.get_user_lists(user_id)
    }

    async fn get_user_lists_count(&self, user_id: i64) -> DbResult<i64> {
        self.db.get_user_lists_count(user_id)
    }

    async fn is_list_owner(&self, list_id: i64, user_id: i64) -> DbResult<bool> {
        self.db.is_list_owner(list_id, user_id)
    }

    async fn add_item(
        &self,
        list_id: i64,
        title: &str,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
    ) -> DbResult<Item> {
        self.db.add_item(list_id, title, date, time)
    }

    async fn update_item(&self, item_id: i64, update: &ItemUpdate) -> DbResult<Item> {
        self.db.update_item(item_id, update)
    }

    async fn change_item_status(&self, item_id: i64, status_id: i64) -> DbResult<Item> {
        self.db.change_item_status(item_id, status_id)
    }

    async fn delete_item(&self, item_id: i64) -> DbResult<()> {
        self.db.delete_item(item_id)
    }

    async fn get_today_and_future_items(
        &self,
        list_id: i64,
        today: NaiveDate,
    ) -> DbResult<Vec<Item>> {
        self.db.get_today_and_future_items(list_id, today)
    }

    async fn get_list_items_count(&self, list_id: i64) -> DbResult<i64> {
        self.db.get_list_items_count(list_id)
    }

    async fn add_reminder(
        &self,
        item_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        now: NaiveDateTime,
    ) -> DbResult<Reminder> {
        self.db.add_reminder(item_id, date, time, now)
    }

    async fn add_reminder_in_minutes(
        &self,
        item_id: i64,
        minutes: i64,
        now: NaiveDateTime,
    ) -> DbResult<Reminder> {
        self.db.add_reminder_in_minutes(item_id, minutes, now)
    }

    async fn add_reminder_in_hours(
        &self,
        item_id: i64,
        hours: i64,
        now: NaiveDateTime,
    ) -> DbResult<Reminder> {
        self.db.add_reminder_in_hours(item_id, hours, now)
    }

    async fn add_reminder_before_task(
        &self,
        item_id: i64,
        before: Duration,
        now: NaiveDateTime,
    ) -> DbResult<Reminder> {
        self.db.add_reminder_before_task(item_id, before, now)
    }

    async fn get_reminder(&self, reminder_id: i64) -> DbResult<Reminder> {
        self.db.get_reminder(reminder_id)
    }

    async fn get_item_reminders(&self, item_id: i64) -> DbResult<Vec<Reminder>> {
        self.db.get_item_reminders(item_id)
    }

    async fn get_statuses(&self) -> DbResult<Vec<ItemStatus>> {
        self.db.get_statuses()
    }
}
