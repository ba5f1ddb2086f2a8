//! Runtime for executing conversations
//!
//! Wires the pure state machine to the task store, the chat notifier and the
//! per-user session store.

mod executor;
pub mod render;
mod session;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use session::InMemorySessionStore;
pub use traits::*;

use crate::telegram::TelegramClient;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = ConversationRuntime<DatabaseStore, TelegramClient, InMemorySessionStore>;
