//! Events that can occur in a conversation

/// Events that trigger session transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Raw text received from the user
    UserText { text: String },

    // Outcomes reported back by the runtime after executing an effect
    /// Ownership of the list was confirmed
    ListSelected { list_id: i64 },
    /// Ownership of the item's list was confirmed
    ItemSelected { item_id: i64, list_id: i64 },
    ListDeleted { list_id: i64 },
    ItemDeleted { item_id: i64 },
}

impl Event {
    pub fn user_text(text: impl Into<String>) -> Self {
        Event::UserText { text: text.into() }
    }
}
