//! Database module for the task bot
//!
//! Provides persistence for users, lists, items and reminders.

mod schema;

pub use schema::*;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Accepted range for "remind me in N minutes"
pub const MINUTE_OFFSET_RANGE: RangeInclusive<i64> = 1..=60;

/// Accepted range for "remind me in N hours"
pub const HOUR_OFFSET_RANGE: RangeInclusive<i64> = 1..=24;

/// User-facing date format (`dd.mm.yyyy`)
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";

/// User-facing time format (`HH:mm`)
pub const DISPLAY_TIME_FORMAT: &str = "%H:%M";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{0} not found: {1}")]
    NotFound(Entity, i64),
    #[error("{0}")]
    Validation(String),
    #[error("Reminder cannot be set in the past ({})", .fire_at.format("%d.%m.%Y %H:%M"))]
    PastReminder { fire_at: NaiveDateTime },
}

impl DbError {
    /// Whether the error is caused by the caller's input rather than storage
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, DbError::Sqlite(_))
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Optional field changes for an item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(SEED_STATUSES)?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Fetch a user, creating it on first contact
    pub fn get_or_create_user(&self, id: i64, name: &str) -> DbResult<User> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO users (id_user, name) VALUES (?1, ?2)",
            params![id, name.trim()],
        )?;
        conn.query_row(
            "SELECT id_user, name FROM users WHERE id_user = ?1",
            params![id],
            parse_user_row,
        )
        .map_err(DbError::from)
    }

    pub fn get_user(&self, id: i64) -> DbResult<User> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id_user, name FROM users WHERE id_user = ?1",
            params![id],
            parse_user_row,
        )
        .optional()?
        .ok_or(DbError::NotFound(Entity::User, id))
    }

    // ==================== List Operations ====================

    pub fn create_list(&self, user_id: i64, title: &str) -> DbResult<TaskList> {
        let title = validate_title(title, "List title")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO lists (title_list, user_list) VALUES (?1, ?2)",
            params![title, user_id],
        )?;
        Ok(TaskList {
            id: conn.last_insert_rowid(),
            title,
            user_id,
        })
    }

    pub fn rename_list(&self, list_id: i64, title: &str) -> DbResult<TaskList> {
        let title = validate_title(title, "List title")?;
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE lists SET title_list = ?1 WHERE id_list = ?2",
            params![title, list_id],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound(Entity::List, list_id));
        }
        query_list(&conn, list_id)
    }

    /// Delete a list together with its items and their reminders
    pub fn delete_list(&self, list_id: i64) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM reminders WHERE item_reminder IN
                (SELECT id_item FROM items WHERE list_item = ?1)",
            params![list_id],
        )?;
        tx.execute("DELETE FROM items WHERE list_item = ?1", params![list_id])?;
        let deleted = tx.execute("DELETE FROM lists WHERE id_list = ?1", params![list_id])?;
        if deleted == 0 {
            return Err(DbError::NotFound(Entity::List, list_id));
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_list(&self, list_id: i64) -> DbResult<TaskList> {
        let conn = self.conn.lock().unwrap();
        query_list(&conn, list_id)
    }

    /// Lists owned by a user, oldest first
    pub fn get_user_lists(&self, user_id: i64) -> DbResult<Vec<TaskList>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id_list, title_list, user_list FROM lists
             WHERE user_list = ?1
             ORDER BY id_list",
        )?;
        let rows = stmt.query_map(params![user_id], parse_list_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn get_user_lists_count(&self, user_id: i64) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM lists WHERE user_list = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(DbError::from)
    }

    pub fn is_list_owner(&self, list_id: i64, user_id: i64) -> DbResult<bool> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM lists WHERE id_list = ?1 AND user_list = ?2)",
            params![list_id, user_id],
            |row| row.get(0),
        )
        .map_err(DbError::from)
    }

    // ==================== Item Operations ====================

    pub fn add_item(
        &self,
        list_id: i64,
        title: &str,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
    ) -> DbResult<Item> {
        let title = validate_title(title, "Task title")?;
        let conn = self.conn.lock().unwrap();
        query_list(&conn, list_id)?;
        conn.execute(
            "INSERT INTO items (title_item, status_item, list_item, date_item, time_item)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                title,
                DEFAULT_STATUS_ID,
                list_id,
                date.map(format_storage_date),
                time.map(format_storage_time),
            ],
        )?;
        Ok(Item {
            id: conn.last_insert_rowid(),
            title,
            status_id: DEFAULT_STATUS_ID,
            list_id,
            date,
            time: time.map(truncate_seconds),
        })
    }

    /// Apply the provided fields; absent fields are left unchanged
    pub fn update_item(&self, item_id: i64, update: &ItemUpdate) -> DbResult<Item> {
        let title = update
            .title
            .as_deref()
            .map(|t| validate_title(t, "Task title"))
            .transpose()?;
        let conn = self.conn.lock().unwrap();
        let mut item = query_item(&conn, item_id)?;
        if let Some(title) = title {
            item.title = title;
        }
        if let Some(date) = update.date {
            item.date = Some(date);
        }
        if let Some(time) = update.time {
            item.time = Some(truncate_seconds(time));
        }
        conn.execute(
            "UPDATE items SET title_item = ?1, date_item = ?2, time_item = ?3 WHERE id_item = ?4",
            params![
                item.title,
                item.date.map(format_storage_date),
                item.time.map(format_storage_time),
                item_id,
            ],
        )?;
        Ok(item)
    }

    pub fn change_item_status(&self, item_id: i64, status_id: i64) -> DbResult<Item> {
        let conn = self.conn.lock().unwrap();
        let known: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM item_statuses WHERE id_status = ?1)",
            params![status_id],
            |row| row.get(0),
        )?;
        if !known {
            return Err(DbError::NotFound(Entity::Status, status_id));
        }
        let updated = conn.execute(
            "UPDATE items SET status_item = ?1 WHERE id_item = ?2",
            params![status_id, item_id],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound(Entity::Item, item_id));
        }
        query_item(&conn, item_id)
    }

    /// Delete an item together with its reminders
    pub fn delete_item(&self, item_id: i64) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM reminders WHERE item_reminder = ?1",
            params![item_id],
        )?;
        let deleted = tx.execute("DELETE FROM items WHERE id_item = ?1", params![item_id])?;
        if deleted == 0 {
            return Err(DbError::NotFound(Entity::Item, item_id));
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_item(&self, item_id: i64) -> DbResult<Item> {
        let conn = self.conn.lock().unwrap();
        query_item(&conn, item_id)
    }

    /// Items without a date or dated today or later, ordered by date then time
    ///
    /// Undated items sort first (SQLite orders NULL before any value).
    pub fn get_today_and_future_items(&self, list_id: i64, today: NaiveDate) -> DbResult<Vec<Item>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id_item, title_item, status_item, list_item, date_item, time_item
             FROM items
             WHERE list_item = ?1 AND (date_item IS NULL OR date_item >= ?2)
             ORDER BY date_item, time_item, id_item",
        )?;
        let rows = stmt.query_map(
            params![list_id, format_storage_date(today)],
            parse_item_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn get_list_items_count(&self, list_id: i64) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM items WHERE list_item = ?1",
            params![list_id],
            |row| row.get(0),
        )
        .map_err(DbError::from)
    }

    // ==================== Reminder Operations ====================

    /// Persist a reminder firing at `date`/`time`; the instant must be after `now`
    pub fn add_reminder(
        &self,
        item_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        now: NaiveDateTime,
    ) -> DbResult<Reminder> {
        let fire_at = date.and_time(time);
        if fire_at <= now {
            return Err(DbError::PastReminder { fire_at });
        }
        let conn = self.conn.lock().unwrap();
        query_item(&conn, item_id)?;
        let time = truncate_seconds(time);
        conn.execute(
            "INSERT INTO reminders (item_reminder, date_reminder, time_reminder)
             VALUES (?1, ?2, ?3)",
            params![item_id, format_storage_date(date), format_storage_time(time)],
        )?;
        Ok(Reminder {
            id: conn.last_insert_rowid(),
            item_id,
            date,
            time,
        })
    }

    /// Reminder `minutes` from now, `minutes` in [`MINUTE_OFFSET_RANGE`]
    pub fn add_reminder_in_minutes(
        &self,
        item_id: i64,
        minutes: i64,
        now: NaiveDateTime,
    ) -> DbResult<Reminder> {
        if !MINUTE_OFFSET_RANGE.contains(&minutes) {
            return Err(DbError::Validation(format!(
                "Minutes must be between {} and {}",
                MINUTE_OFFSET_RANGE.start(),
                MINUTE_OFFSET_RANGE.end()
            )));
        }
        let fire_at = now + Duration::minutes(minutes);
        self.add_reminder(item_id, fire_at.date(), fire_at.time(), now)
    }

    /// Reminder `hours` from now, `hours` in [`HOUR_OFFSET_RANGE`]
    pub fn add_reminder_in_hours(
        &self,
        item_id: i64,
        hours: i64,
        now: NaiveDateTime,
    ) -> DbResult<Reminder> {
        if !HOUR_OFFSET_RANGE.contains(&hours) {
            return Err(DbError::Validation(format!(
                "Hours must be between {} and {}",
                HOUR_OFFSET_RANGE.start(),
                HOUR_OFFSET_RANGE.end()
            )));
        }
        let fire_at = now + Duration::hours(hours);
        self.add_reminder(item_id, fire_at.date(), fire_at.time(), now)
    }

    /// Reminder `before` ahead of the item's own date and time
    pub fn add_reminder_before_task(
        &self,
        item_id: i64,
        before: Duration,
        now: NaiveDateTime,
    ) -> DbResult<Reminder> {
        let item = self.get_item(item_id)?;
        let due_at = item.due_at().ok_or_else(|| {
            DbError::Validation("Task has no date and time set".to_string())
        })?;
        let fire_at = due_at - before;
        self.add_reminder(item_id, fire_at.date(), fire_at.time(), now)
    }

    pub fn remove_reminder(&self, reminder_id: i64) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM reminders WHERE id_reminder = ?1",
            params![reminder_id],
        )?;
        if deleted == 0 {
            return Err(DbError::NotFound(Entity::Reminder, reminder_id));
        }
        Ok(())
    }

    pub fn get_reminder(&self, reminder_id: i64) -> DbResult<Reminder> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id_reminder, item_reminder, date_reminder, time_reminder
             FROM reminders WHERE id_reminder = ?1",
            params![reminder_id],
            parse_reminder_row,
        )
        .optional()?
        .ok_or(DbError::NotFound(Entity::Reminder, reminder_id))
    }

    /// Reminders of one item, ordered by date then time
    pub fn get_item_reminders(&self, item_id: i64) -> DbResult<Vec<Reminder>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id_reminder, item_reminder, date_reminder, time_reminder
             FROM reminders
             WHERE item_reminder = ?1
             ORDER BY date_reminder, time_reminder, id_reminder",
        )?;
        let rows = stmt.query_map(params![item_id], parse_reminder_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Reminders dated today or earlier whose time lies within `now ± tolerance`
    pub fn due_reminders(&self, now: NaiveDateTime, tolerance: Duration) -> DbResult<Vec<Reminder>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id_reminder, item_reminder, date_reminder, time_reminder
             FROM reminders
             WHERE date_reminder <= ?1
             ORDER BY date_reminder, time_reminder, id_reminder",
        )?;
        let rows = stmt.query_map(
            params![format_storage_date(now.date())],
            parse_reminder_row,
        )?;
        let candidates = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(candidates
            .into_iter()
            .filter(|r| r.is_due(now, tolerance))
            .collect())
    }

    // ==================== Reference Data ====================

    pub fn get_statuses(&self) -> DbResult<Vec<ItemStatus>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id_status, title_status FROM item_statuses ORDER BY id_status")?;
        let rows = stmt.query_map([], |row| {
            Ok(ItemStatus {
                id: row.get(0)?,
                title: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

// ==================== Input Validation ====================

/// Trim a title, rejecting blank input
pub fn validate_title(title: &str, what: &str) -> DbResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DbError::Validation(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Parse a strict `dd.mm.yyyy` date
pub fn parse_date_input(input: &str) -> DbResult<NaiveDate> {
    let input = input.trim();
    let err = || DbError::Validation("Invalid date format. Use DD.MM.YYYY".to_string());
    if !matches_shape(input, "dd.dd.dddd") {
        return Err(err());
    }
    NaiveDate::parse_from_str(input, DISPLAY_DATE_FORMAT).map_err(|_| err())
}

/// Parse a strict 24-hour `HH:mm` time
pub fn parse_time_input(input: &str) -> DbResult<NaiveTime> {
    let input = input.trim();
    let err = || DbError::Validation("Invalid time format. Use HH:MM".to_string());
    if !matches_shape(input, "dd:dd") {
        return Err(err());
    }
    NaiveTime::parse_from_str(input, DISPLAY_TIME_FORMAT).map_err(|_| err())
}

/// `d` matches an ASCII digit, anything else matches itself
fn matches_shape(input: &str, shape: &str) -> bool {
    input.len() == shape.len()
        && input.bytes().zip(shape.bytes()).all(|(c, s)| match s {
            b'd' => c.is_ascii_digit(),
            other => c == other,
        })
}

fn truncate_seconds(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

// ==================== Row Parsing ====================

fn format_storage_date(date: NaiveDate) -> String {
    date.format(DATE_STORAGE_FORMAT).to_string()
}

fn format_storage_time(time: NaiveTime) -> String {
    time.format(TIME_STORAGE_FORMAT).to_string()
}

fn conversion_error(idx: usize, e: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| NaiveDate::parse_from_str(&s, DATE_STORAGE_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveTime>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| NaiveTime::parse_from_str(&s, TIME_STORAGE_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn parse_list_row(row: &Row<'_>) -> rusqlite::Result<TaskList> {
    Ok(TaskList {
        id: row.get(0)?,
        title: row.get(1)?,
        user_id: row.get(2)?,
    })
}

fn parse_item_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        title: row.get(1)?,
        status_id: row.get(2)?,
        list_id: row.get(3)?,
        date: date_column(row, 4)?,
        time: time_column(row, 5)?,
    })
}

fn parse_reminder_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    let date = date_column(row, 2)?.ok_or(rusqlite::Error::InvalidColumnType(
        2,
        "date_reminder".to_string(),
        rusqlite::types::Type::Null,
    ))?;
    let time = time_column(row, 3)?.ok_or(rusqlite::Error::InvalidColumnType(
        3,
        "time_reminder".to_string(),
        rusqlite::types::Type::Null,
    ))?;
    Ok(Reminder {
        id: row.get(0)?,
        item_id: row.get(1)?,
        date,
        time,
    })
}

fn query_list(conn: &Connection, list_id: i64) -> DbResult<TaskList> {
    conn.query_row(
        "SELECT id_list, title_list, user_list FROM lists WHERE id_list = ?1",
        params![list_id],
        parse_list_row,
    )
    .optional()?
    .ok_or(DbError::NotFound(Entity::List, list_id))
}

fn query_item(conn: &Connection, item_id: i64) -> DbResult<Item> {
    conn.query_row(
        "SELECT id_item, title_item, status_item, list_item, date_item, time_item
         FROM items WHERE id_item = ?1",
        params![item_id],
        parse_item_row,
    )
    .optional()?
    .ok_or(DbError::NotFound(Entity::Item, item_id))
}
