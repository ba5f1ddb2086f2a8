//! Per-user conversation state machine
//!
//! Follows the Elm Architecture: a pure transition over (session, event)
//! produces the next session and a list of effects for the runtime to run.

pub mod command;
mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{PendingInput, SessionContext};
pub use transition::transition;
