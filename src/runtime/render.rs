//! Reply text and keyboards

use super::traits::{Keyboard, OutboundMessage};
use crate::db::{
    Item, ItemStatus, Reminder, TaskList, DISPLAY_DATE_FORMAT, DISPLAY_TIME_FORMAT,
};
use crate::state_machine::command::labels;

// ============================================================================
// Menus
// ============================================================================

pub fn main_menu() -> OutboundMessage {
    OutboundMessage::with_keyboard(
        "Main menu. Choose an action:",
        Keyboard::new([
            vec![labels::MY_LISTS, labels::CREATE_LIST],
            vec![labels::LISTS_COUNT],
        ]),
    )
}

pub fn list_menu(list: &TaskList) -> OutboundMessage {
    OutboundMessage::with_keyboard(
        format!("List: {}\nChoose an action:", list.title),
        Keyboard::new([
            vec![labels::TASK_LIST, labels::ADD_TASK],
            vec![labels::FIND_TASK, labels::LIST_STATS],
            vec![labels::RENAME_LIST, labels::DELETE_LIST],
            vec![labels::BACK_TO_LISTS],
        ]),
    )
}

pub fn item_menu(item: &Item, statuses: &[ItemStatus]) -> OutboundMessage {
    let text = format!(
        "Task: {}\nStatus: {}\nDate: {}\nTime: {}",
        item.title,
        status_title(statuses, item.status_id),
        item.date
            .map_or_else(|| "not set".to_string(), |d| d.format(DISPLAY_DATE_FORMAT).to_string()),
        item.time
            .map_or_else(|| "not set".to_string(), |t| t.format(DISPLAY_TIME_FORMAT).to_string()),
    );
    OutboundMessage::with_keyboard(
        text,
        Keyboard::new([
            vec![labels::CHANGE_STATUS, labels::EDIT_TITLE],
            vec![labels::EDIT_DATE, labels::EDIT_TIME],
            vec![labels::ADD_REMINDER, labels::MY_REMINDERS],
            vec![labels::DELETE_TASK, labels::BACK_TO_TASKS],
        ]),
    )
}

pub fn reminder_menu() -> OutboundMessage {
    OutboundMessage::with_keyboard(
        "Choose a reminder type:",
        Keyboard::new([
            vec![labels::REMIND_15_MIN, labels::REMIND_1_HOUR],
            vec![labels::REMIND_1_DAY, labels::REMIND_IN_MINUTES],
            vec![labels::REMIND_IN_HOURS, labels::REMOVE_REMINDER],
            vec![labels::BACK_TO_TASK],
        ]),
    )
}

pub fn status_menu(statuses: &[ItemStatus]) -> OutboundMessage {
    let mut rows: Vec<Vec<String>> = statuses
        .iter()
        .map(|s| vec![format!("{}{}", labels::STATUS_PREFIX, s.title)])
        .collect();
    rows.push(vec![labels::BACK_TO_TASK.to_string()]);
    OutboundMessage::with_keyboard("Choose a new status:", Keyboard { rows })
}

// ============================================================================
// Listings
// ============================================================================

pub fn lists_text(lists: &[TaskList]) -> String {
    if lists.is_empty() {
        return "You have no lists yet. Create your first one!".to_string();
    }
    let lines: Vec<String> = lists
        .iter()
        .map(|l| format!("{}{} - {}", labels::LIST_PREFIX, l.id, l.title))
        .collect();
    format!("Your lists:\n{}", lines.join("\n"))
}

pub fn tasks_text(items: &[Item], statuses: &[ItemStatus]) -> String {
    if items.is_empty() {
        return "No tasks for today or later in this list.".to_string();
    }
    let lines: Vec<String> = items.iter().map(|i| item_line(i, statuses)).collect();
    format!("Tasks in the list:\n{}", lines.join("\n"))
}

pub fn search_text(items: &[Item], statuses: &[ItemStatus]) -> String {
    if items.is_empty() {
        return "No tasks found.".to_string();
    }
    let lines: Vec<String> = items
        .iter()
        .map(|i| {
            format!(
                "{}{} - {} [{}]",
                labels::ITEM_PREFIX,
                i.id,
                i.title,
                status_title(statuses, i.status_id)
            )
        })
        .collect();
    format!("Search results:\n{}", lines.join("\n"))
}

pub fn reminders_text(reminders: &[Reminder]) -> String {
    if reminders.is_empty() {
        return "This task has no reminders.".to_string();
    }
    let lines: Vec<String> = reminders
        .iter()
        .map(|r| format!("{} - {}", r.id, format_instant(r)))
        .collect();
    format!("Reminders:\n{}", lines.join("\n"))
}

/// Notification text for a due reminder
pub fn reminder_notification(list: &TaskList, item: &Item, reminder: &Reminder) -> String {
    // The task's own date/time, falling back to the fire instant per field
    let date = item.date.unwrap_or(reminder.date);
    let time = item.time.unwrap_or(reminder.time);
    format!(
        "REMINDER\n\nList - {}\nTask - {}\nTime - {} {}",
        list.title,
        item.title,
        date.format(DISPLAY_DATE_FORMAT),
        time.format(DISPLAY_TIME_FORMAT),
    )
}

pub fn reminder_created(reminder: &Reminder) -> String {
    format!("Reminder set for {}", format_instant(reminder))
}

fn item_line(item: &Item, statuses: &[ItemStatus]) -> String {
    let mut line = format!(
        "{}{} - {} [{}]",
        labels::ITEM_PREFIX,
        item.id,
        item.title,
        status_title(statuses, item.status_id)
    );
    if let Some(date) = item.date {
        line.push_str(&format!(" - {}", date.format(DISPLAY_DATE_FORMAT)));
    }
    if let Some(time) = item.time {
        line.push_str(&format!(" {}", time.format(DISPLAY_TIME_FORMAT)));
    }
    line
}

fn format_instant(reminder: &Reminder) -> String {
    format!(
        "{} {}",
        reminder.date.format(DISPLAY_DATE_FORMAT),
        reminder.time.format(DISPLAY_TIME_FORMAT)
    )
}

fn status_title(statuses: &[ItemStatus], status_id: i64) -> &str {
    statuses
        .iter()
        .find(|s| s.id == status_id)
        .map_or("?", |s| s.title.as_str())
}
