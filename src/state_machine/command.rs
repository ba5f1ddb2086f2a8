//! Inbound command parsing
//!
//! Exact-match labels are checked first, then the dynamic prefixes
//! (`/list_<id>`, `/item_<id>`, `status_<title>`). Anything else is
//! [`Command::Unrecognized`].

use chrono::Duration;

/// Button labels and slash commands understood in the idle state
pub mod labels {
    pub const START: &str = "/start";
    pub const MY_LISTS: &str = "My lists";
    pub const CREATE_LIST: &str = "Create list";
    pub const LISTS_COUNT: &str = "Lists count";
    pub const BACK_TO_LISTS: &str = "Back to lists";
    pub const BACK_TO_TASKS: &str = "Back to tasks";
    pub const TASK_LIST: &str = "Task list";
    pub const ADD_TASK: &str = "Add task";
    pub const FIND_TASK: &str = "Find task";
    pub const RENAME_LIST: &str = "Rename list";
    pub const DELETE_LIST: &str = "Delete list";
    pub const LIST_STATS: &str = "List stats";
    pub const CHANGE_STATUS: &str = "Change status";
    pub const EDIT_TITLE: &str = "Edit title";
    pub const EDIT_DATE: &str = "Edit date";
    pub const EDIT_TIME: &str = "Edit time";
    pub const ADD_REMINDER: &str = "Add reminder";
    pub const MY_REMINDERS: &str = "My reminders";
    pub const DELETE_TASK: &str = "Delete task";
    pub const REMIND_15_MIN: &str = "15 min before";
    pub const REMIND_1_HOUR: &str = "1 hour before";
    pub const REMIND_1_DAY: &str = "1 day before";
    pub const REMIND_IN_MINUTES: &str = "In N minutes";
    pub const REMIND_IN_HOURS: &str = "In N hours";
    pub const REMOVE_REMINDER: &str = "Remove reminder";
    pub const BACK_TO_TASK: &str = "Back to task";

    pub const LIST_PREFIX: &str = "/list_";
    pub const ITEM_PREFIX: &str = "/item_";
    pub const STATUS_PREFIX: &str = "status_";
}

/// How long before a task's own date/time a quick reminder fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderLead {
    FifteenMinutes,
    OneHour,
    OneDay,
}

impl ReminderLead {
    pub fn duration(self) -> Duration {
        match self {
            ReminderLead::FifteenMinutes => Duration::minutes(15),
            ReminderLead::OneHour => Duration::hours(1),
            ReminderLead::OneDay => Duration::days(1),
        }
    }
}

/// A parsed idle-state command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    MyLists,
    CreateList,
    ListsCount,
    BackToLists,
    BackToTasks,
    TaskList,
    AddTask,
    FindTask,
    RenameList,
    DeleteList,
    ListStats,
    ChangeStatus,
    EditTitle,
    EditDate,
    EditTime,
    AddReminder,
    MyReminders,
    DeleteTask,
    RemindBefore(ReminderLead),
    RemindInMinutes,
    RemindInHours,
    RemoveReminder,
    BackToTask,
    SelectList(i64),
    SelectItem(i64),
    SetStatus(String),
    Unrecognized,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        Self::from_label(text)
            .or_else(|| Self::from_prefix(text))
            .unwrap_or(Command::Unrecognized)
    }

    fn from_label(text: &str) -> Option<Self> {
        let command = match text {
            labels::START => Command::Start,
            labels::MY_LISTS => Command::MyLists,
            labels::CREATE_LIST => Command::CreateList,
            labels::LISTS_COUNT => Command::ListsCount,
            labels::BACK_TO_LISTS => Command::BackToLists,
            labels::BACK_TO_TASKS => Command::BackToTasks,
            labels::TASK_LIST => Command::TaskList,
            labels::ADD_TASK => Command::AddTask,
            labels::FIND_TASK => Command::FindTask,
            labels::RENAME_LIST => Command::RenameList,
            labels::DELETE_LIST => Command::DeleteList,
            labels::LIST_STATS => Command::ListStats,
            labels::CHANGE_STATUS => Command::ChangeStatus,
            labels::EDIT_TITLE => Command::EditTitle,
            labels::EDIT_DATE => Command::EditDate,
            labels::EDIT_TIME => Command::EditTime,
            labels::ADD_REMINDER => Command::AddReminder,
            labels::MY_REMINDERS => Command::MyReminders,
            labels::DELETE_TASK => Command::DeleteTask,
            labels::REMIND_15_MIN => Command::RemindBefore(ReminderLead::FifteenMinutes),
            labels::REMIND_1_HOUR => Command::RemindBefore(ReminderLead::OneHour),
            labels::REMIND_1_DAY => Command::RemindBefore(ReminderLead::OneDay),
            labels::REMIND_IN_MINUTES => Command::RemindInMinutes,
            labels::REMIND_IN_HOURS => Command::RemindInHours,
            labels::REMOVE_REMINDER => Command::RemoveReminder,
            labels::BACK_TO_TASK => Command::BackToTask,
            _ => return None,
        };
        Some(command)
    }

    fn from_prefix(text: &str) -> Option<Self> {
        if let Some(id) = text.strip_prefix(labels::LIST_PREFIX).and_then(parse_id) {
            return Some(Command::SelectList(id));
        }
        if let Some(id) = text.strip_prefix(labels::ITEM_PREFIX).and_then(parse_id) {
            return Some(Command::SelectItem(id));
        }
        text.strip_prefix(labels::STATUS_PREFIX)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Command::SetStatus(s.to_string()))
    }
}

/// Digits only; signs, whitespace and overflow are rejected
fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
