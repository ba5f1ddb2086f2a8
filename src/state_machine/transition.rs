//! Pure session transition function
//!
//! Given the same session and event it always produces the same session and
//! effects; all store and chat I/O happens in the runtime.

use super::command::Command;
use super::effect::Effect;
use super::event::Event;
use super::state::{PendingInput, SessionContext};

/// Result of a session transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: SessionContext,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: SessionContext) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Pure transition function
pub fn transition(session: &SessionContext, event: Event) -> TransitionResult {
    match event {
        Event::UserText { text } => match session.pending() {
            // The pending mode is dropped before the action runs, so a
            // failing action never re-arms the same prompt.
            Some(input) => {
                let input = input.clone();
                TransitionResult::new(session.clone().idle())
                    .with_effect(Effect::Submit { input, text })
            }
            None => handle_command(session, Command::parse(&text)),
        },

        Event::ListSelected { list_id } => TransitionResult::new(SessionContext {
            selected_list: Some(list_id),
            selected_item: None,
            ..session.clone()
        })
        .with_effect(Effect::ShowListMenu { list_id }),

        Event::ItemSelected { item_id, list_id } => TransitionResult::new(SessionContext {
            selected_list: Some(list_id),
            selected_item: Some(item_id),
            ..session.clone()
        })
        .with_effect(Effect::ShowItemMenu { item_id }),

        Event::ListDeleted { list_id } => {
            let mut next = session.clone();
            if next.selected_list == Some(list_id) {
                next.selected_list = None;
                next.selected_item = None;
            }
            TransitionResult::new(next)
                .with_effect(Effect::reply("List deleted."))
                .with_effect(Effect::ShowMainMenu)
        }

        Event::ItemDeleted { item_id } => {
            let mut next = session.clone();
            if next.selected_item == Some(item_id) {
                next.selected_item = None;
            }
            let menu = list_menu_or_main(&next);
            TransitionResult::new(next)
                .with_effect(Effect::reply("Task deleted."))
                .with_effect(menu)
        }
    }
}

/// Idle-state command handling
fn handle_command(session: &SessionContext, command: Command) -> TransitionResult {
    let unchanged = || TransitionResult::new(session.clone());
    let list = session.selected_list;
    let item = session.selected_item;

    match command {
        Command::Start | Command::Unrecognized => unchanged().with_effect(Effect::ShowMainMenu),
        Command::MyLists => unchanged().with_effect(Effect::ShowLists),
        Command::ListsCount => unchanged().with_effect(Effect::ShowListsCount),
        Command::CreateList => await_input(session, PendingInput::CreateList),

        Command::BackToLists => TransitionResult::new(SessionContext {
            selected_list: None,
            selected_item: None,
            ..session.clone()
        })
        .with_effect(Effect::ShowMainMenu),

        Command::BackToTasks => {
            let next = SessionContext {
                selected_item: None,
                ..session.clone()
            };
            let menu = list_menu_or_main(&next);
            TransitionResult::new(next).with_effect(menu)
        }

        Command::BackToTask => {
            let menu = match item {
                Some(item_id) => Effect::ShowItemMenu { item_id },
                None => list_menu_or_main(session),
            };
            unchanged().with_effect(menu)
        }

        // List-scoped commands
        Command::TaskList
        | Command::AddTask
        | Command::FindTask
        | Command::RenameList
        | Command::DeleteList
        | Command::ListStats => {
            let Some(list_id) = list else {
                return unchanged().with_effect(Effect::nothing_selected_list());
            };
            match command {
                Command::TaskList => unchanged().with_effect(Effect::ShowTasks { list_id }),
                Command::AddTask => await_input(session, PendingInput::AddTask { list_id }),
                Command::FindTask => await_input(session, PendingInput::SearchTask { list_id }),
                Command::RenameList => await_input(session, PendingInput::RenameList { list_id }),
                Command::DeleteList => unchanged().with_effect(Effect::DeleteList { list_id }),
                _ => unchanged().with_effect(Effect::ShowListStats { list_id }),
            }
        }

        // Item-scoped commands
        Command::ChangeStatus
        | Command::EditTitle
        | Command::EditDate
        | Command::EditTime
        | Command::AddReminder
        | Command::MyReminders
        | Command::DeleteTask
        | Command::RemindBefore(_)
        | Command::RemindInMinutes
        | Command::RemindInHours
        | Command::RemoveReminder
        | Command::SetStatus(_) => {
            let Some(item_id) = item else {
                return unchanged().with_effect(Effect::nothing_selected_item());
            };
            match command {
                Command::ChangeStatus => unchanged().with_effect(Effect::ShowStatusMenu),
                Command::EditTitle => await_input(session, PendingInput::UpdateTaskTitle { item_id }),
                Command::EditDate => await_input(session, PendingInput::UpdateTaskDate { item_id }),
                Command::EditTime => await_input(session, PendingInput::UpdateTaskTime { item_id }),
                Command::AddReminder => unchanged().with_effect(Effect::ShowReminderMenu),
                Command::MyReminders => unchanged().with_effect(Effect::ShowReminders { item_id }),
                Command::DeleteTask => unchanged().with_effect(Effect::DeleteItem { item_id }),
                Command::RemindBefore(lead) => {
                    unchanged().with_effect(Effect::QuickReminder { item_id, lead })
                }
                Command::RemindInMinutes => {
                    await_input(session, PendingInput::AddCustomReminder { item_id })
                }
                Command::RemindInHours => {
                    await_input(session, PendingInput::AddHourReminder { item_id })
                }
                Command::RemoveReminder => {
                    await_input(session, PendingInput::RemoveReminder { item_id })
                }
                Command::SetStatus(status) => {
                    unchanged().with_effect(Effect::ChangeStatus { item_id, status })
                }
                _ => unchanged().with_effect(Effect::ShowMainMenu),
            }
        }

        // Selection is only written once the runtime confirms ownership
        Command::SelectList(list_id) => unchanged().with_effect(Effect::SelectList { list_id }),
        Command::SelectItem(item_id) => unchanged().with_effect(Effect::SelectItem { item_id }),
    }
}

fn await_input(session: &SessionContext, input: PendingInput) -> TransitionResult {
    let prompt = Effect::prompt(&input);
    TransitionResult::new(session.clone().awaiting(input)).with_effect(prompt)
}

fn list_menu_or_main(session: &SessionContext) -> Effect {
    match session.selected_list {
        Some(list_id) => Effect::ShowListMenu { list_id },
        None => Effect::ShowMainMenu,
    }
}
