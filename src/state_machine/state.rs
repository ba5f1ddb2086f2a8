//! Session state types

use serde::{Deserialize, Serialize};

// ============================================================================
// Pending Input - what the next message from the user will be read as
// ============================================================================

/// Pending-input kinds, each carrying the ids captured when the prompt was sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingInput {
    CreateList,
    RenameList { list_id: i64 },
    AddTask { list_id: i64 },
    SearchTask { list_id: i64 },
    UpdateTaskTitle { item_id: i64 },
    UpdateTaskDate { item_id: i64 },
    UpdateTaskTime { item_id: i64 },
    /// Minutes from now
    AddCustomReminder { item_id: i64 },
    /// Hours from now
    AddHourReminder { item_id: i64 },
    RemoveReminder { item_id: i64 },
}

impl PendingInput {
    /// Prompt sent to the user when entering this mode
    pub fn prompt(&self) -> &'static str {
        match self {
            PendingInput::CreateList => "Enter a title for the new list:",
            PendingInput::RenameList { .. } => "Enter a new title for the list:",
            PendingInput::AddTask { .. } => "Enter a title for the new task:",
            PendingInput::SearchTask { .. } => "Enter text to search for:",
            PendingInput::UpdateTaskTitle { .. } => "Enter a new title for the task:",
            PendingInput::UpdateTaskDate { .. } => "Enter a new date in DD.MM.YYYY format:",
            PendingInput::UpdateTaskTime { .. } => "Enter a new time in HH:MM format:",
            PendingInput::AddCustomReminder { .. } => "Enter the number of minutes from now (1 to 60):",
            PendingInput::AddHourReminder { .. } => "Enter the number of hours from now (1 to 24):",
            PendingInput::RemoveReminder { .. } => "Enter the id of the reminder to remove:",
        }
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Navigation mode of one user's conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// No pending input; the next message is a command
    #[default]
    Idle,

    /// The next message is raw input for the carried mode
    AwaitingInput { input: PendingInput },
}

impl ConvState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ConvState::Idle)
    }
}

// ============================================================================
// Session Context
// ============================================================================

/// Transient per-user navigation state
///
/// Selections are only ever written after the acting user's ownership has
/// been confirmed, so they always point at the user's own entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionContext {
    #[serde(default)]
    pub selected_list: Option<i64>,
    #[serde(default)]
    pub selected_item: Option<i64>,
    #[serde(default)]
    pub state: ConvState,
}

impl SessionContext {
    /// True when nothing is worth keeping in a session store
    pub fn is_empty(&self) -> bool {
        self.selected_list.is_none() && self.selected_item.is_none() && self.state.is_idle()
    }

    pub fn pending(&self) -> Option<&PendingInput> {
        match &self.state {
            ConvState::Idle => None,
            ConvState::AwaitingInput { input } => Some(input),
        }
    }

    pub fn awaiting(mut self, input: PendingInput) -> Self {
        self.state = ConvState::AwaitingInput { input };
        self
    }

    pub fn idle(mut self) -> Self {
        self.state = ConvState::Idle;
        self
    }
}
