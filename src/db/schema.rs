//! Database schema and record types

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id_user INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lists (
    id_list INTEGER PRIMARY KEY AUTOINCREMENT,
    title_list TEXT NOT NULL,
    user_list INTEGER NOT NULL,

    FOREIGN KEY (user_list) REFERENCES users(id_user) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_lists_user ON lists(user_list);

CREATE TABLE IF NOT EXISTS item_statuses (
    id_status INTEGER PRIMARY KEY,
    title_status TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS items (
    id_item INTEGER PRIMARY KEY AUTOINCREMENT,
    title_item TEXT NOT NULL,
    status_item INTEGER NOT NULL,
    list_item INTEGER NOT NULL,
    date_item TEXT,
    time_item TEXT,

    FOREIGN KEY (status_item) REFERENCES item_statuses(id_status),
    FOREIGN KEY (list_item) REFERENCES lists(id_list) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_items_list ON items(list_item, date_item, time_item);

CREATE TABLE IF NOT EXISTS reminders (
    id_reminder INTEGER PRIMARY KEY AUTOINCREMENT,
    item_reminder INTEGER NOT NULL,
    date_reminder TEXT NOT NULL,
    time_reminder TEXT NOT NULL,

    FOREIGN KEY (item_reminder) REFERENCES items(id_item) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_reminders_due ON reminders(date_reminder, time_reminder);
";

/// Reference statuses, seeded idempotently at startup
pub const SEED_STATUSES: &str = r"
INSERT OR IGNORE INTO item_statuses (id_status, title_status) VALUES
    (1, 'Planned'),
    (2, 'In progress'),
    (3, 'Done'),
    (4, 'Cancelled');
";

/// Status assigned to newly created items
pub const DEFAULT_STATUS_ID: i64 = 1;

/// Storage format for dates (`date_item`, `date_reminder`)
pub const DATE_STORAGE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for times (`time_item`, `time_reminder`)
pub const TIME_STORAGE_FORMAT: &str = "%H:%M:%S";

/// Chat user, keyed by the external chat identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}

/// Named collection of tasks owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
}

/// Read-only status lookup row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatus {
    pub id: i64,
    pub title: String,
}

/// A task inside a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub status_id: i64,
    pub list_id: i64,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl Item {
    /// Target instant, available only when both date and time are set
    pub fn due_at(&self) -> Option<NaiveDateTime> {
        Some(self.date?.and_time(self.time?))
    }
}

/// One-shot notification tied to an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub item_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl Reminder {
    pub fn fire_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Polling-with-tolerance due check.
    ///
    /// The fire date must be today or earlier. Due when the fire instant lies
    /// within `now ± tolerance`; a reminder from an earlier day that was
    /// missed is also due once its time-of-day comes back into the window,
    /// which wraps at midnight.
    pub fn is_due(&self, now: NaiveDateTime, tolerance: chrono::Duration) -> bool {
        if self.date > now.date() {
            return false;
        }
        let earliest = now - tolerance;
        let latest = now + tolerance;
        let fire_at = self.fire_at();
        if earliest <= fire_at && fire_at <= latest {
            return true;
        }
        if fire_at >= earliest {
            return false;
        }
        let (lo, hi) = (earliest.time(), latest.time());
        if lo <= hi {
            lo <= self.time && self.time <= hi
        } else {
            self.time >= lo || self.time <= hi
        }
    }
}

/// Entity kinds used in not-found reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    List,
    Item,
    Reminder,
    Status,
    User,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Entity::List => "List",
            Entity::Item => "Task",
            Entity::Reminder => "Reminder",
            Entity::Status => "Status",
            Entity::User => "User",
        };
        f.write_str(name)
    }
}
