//! Effects produced by state transitions

use super::command::ReminderLead;
use super::state::PendingInput;

/// Effects to be executed after a transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send plain text with no keyboard change
    Reply { text: String },

    // Menus and read-only views
    ShowMainMenu,
    ShowListMenu { list_id: i64 },
    ShowItemMenu { item_id: i64 },
    ShowReminderMenu,
    ShowStatusMenu,
    ShowLists,
    ShowListsCount,
    ShowListStats { list_id: i64 },
    ShowTasks { list_id: i64 },
    ShowReminders { item_id: i64 },

    /// Verify ownership, then report [`Event::ListSelected`](super::Event::ListSelected)
    SelectList { list_id: i64 },
    /// Verify ownership, then report [`Event::ItemSelected`](super::Event::ItemSelected)
    SelectItem { item_id: i64 },

    // Immediate domain actions
    DeleteList { list_id: i64 },
    DeleteItem { item_id: i64 },
    ChangeStatus { item_id: i64, status: String },
    QuickReminder { item_id: i64, lead: ReminderLead },

    /// Consume raw text as input for a pending mode
    Submit { input: PendingInput, text: String },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }

    /// Prompt for the given pending mode
    pub fn prompt(input: &PendingInput) -> Self {
        Effect::reply(input.prompt())
    }

    pub fn nothing_selected_list() -> Self {
        Effect::reply(NO_LIST_SELECTED)
    }

    pub fn nothing_selected_item() -> Self {
        Effect::reply(NO_ITEM_SELECTED)
    }
}

pub const NO_LIST_SELECTED: &str = "No list selected.";
pub const NO_ITEM_SELECTED: &str = "No task selected.";
