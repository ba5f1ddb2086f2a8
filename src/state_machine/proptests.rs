//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary message sequences.

use super::command::labels;
use super::state::ConvState;
use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_id() -> impl Strategy<Value = i64> {
    1i64..1000
}

fn arb_pending() -> impl Strategy<Value = PendingInput> {
    prop_oneof![
        Just(PendingInput::CreateList),
        arb_id().prop_map(|list_id| PendingInput::RenameList { list_id }),
        arb_id().prop_map(|list_id| PendingInput::AddTask { list_id }),
        arb_id().prop_map(|list_id| PendingInput::SearchTask { list_id }),
        arb_id().prop_map(|item_id| PendingInput::UpdateTaskTitle { item_id }),
        arb_id().prop_map(|item_id| PendingInput::UpdateTaskDate { item_id }),
        arb_id().prop_map(|item_id| PendingInput::UpdateTaskTime { item_id }),
        arb_id().prop_map(|item_id| PendingInput::AddCustomReminder { item_id }),
        arb_id().prop_map(|item_id| PendingInput::AddHourReminder { item_id }),
        arb_id().prop_map(|item_id| PendingInput::RemoveReminder { item_id }),
    ]
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::Idle),
        arb_pending().prop_map(|input| ConvState::AwaitingInput { input }),
    ]
}

fn arb_session() -> impl Strategy<Value = SessionContext> {
    (
        proptest::option::of(arb_id()),
        proptest::option::of(arb_id()),
        arb_state(),
    )
        .prop_map(|(selected_list, selected_item, state)| SessionContext {
            // An item is only ever selected inside a selected list
            selected_list: selected_list.or(selected_item.map(|_| 1)),
            selected_item,
            state,
        })
}

fn arb_label() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        labels::START,
        labels::MY_LISTS,
        labels::CREATE_LIST,
        labels::LISTS_COUNT,
        labels::BACK_TO_LISTS,
        labels::BACK_TO_TASKS,
        labels::TASK_LIST,
        labels::ADD_TASK,
        labels::FIND_TASK,
        labels::RENAME_LIST,
        labels::DELETE_LIST,
        labels::LIST_STATS,
        labels::CHANGE_STATUS,
        labels::EDIT_TITLE,
        labels::EDIT_DATE,
        labels::EDIT_TIME,
        labels::ADD_REMINDER,
        labels::MY_REMINDERS,
        labels::DELETE_TASK,
        labels::REMIND_15_MIN,
        labels::REMIND_1_HOUR,
        labels::REMIND_1_DAY,
        labels::REMIND_IN_MINUTES,
        labels::REMIND_IN_HOURS,
        labels::REMOVE_REMINDER,
        labels::BACK_TO_TASK,
    ])
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_label().prop_map(str::to_string),
        arb_id().prop_map(|id| format!("/list_{id}")),
        arb_id().prop_map(|id| format!("/item_{id}")),
        "status_[A-Za-z ]{1,12}",
        "[a-zA-Z0-9 .:_/]{0,30}",
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => arb_text().prop_map(|text| Event::UserText { text }),
        1 => arb_id().prop_map(|list_id| Event::ListSelected { list_id }),
        1 => (arb_id(), arb_id()).prop_map(|(item_id, list_id)| Event::ItemSelected { item_id, list_id }),
        1 => arb_id().prop_map(|list_id| Event::ListDeleted { list_id }),
        1 => arb_id().prop_map(|item_id| Event::ItemDeleted { item_id }),
    ]
}

// ============================================================================
// Invariant Checkers
// ============================================================================

fn selection_is_consistent(session: &SessionContext) -> bool {
    session.selected_item.is_none() || session.selected_list.is_some()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// An item is never selected without its list across any event sequence
    #[test]
    fn prop_transitions_keep_selection_consistent(
        start in arb_session(),
        events in proptest::collection::vec(arb_event(), 0..20)
    ) {
        let mut session = start;
        for event in events {
            session = transition(&session, event).new_session;
            prop_assert!(selection_is_consistent(&session), "Inconsistent: {:?}", session);
        }
    }

    /// Any text in a pending mode submits it and returns to idle
    #[test]
    fn prop_pending_input_always_returns_to_idle(
        session in arb_session(),
        input in arb_pending(),
        text in arb_text()
    ) {
        let pending = session.clone().awaiting(input.clone());
        let result = transition(&pending, Event::UserText { text: text.clone() });

        prop_assert!(result.new_session.state.is_idle());
        prop_assert_eq!(result.new_session.selected_list, session.selected_list);
        prop_assert_eq!(result.new_session.selected_item, session.selected_item);
        prop_assert_eq!(result.effects, vec![Effect::Submit { input, text }]);
    }

    /// User text alone never points a selection at a new entity
    #[test]
    fn prop_user_text_never_selects(session in arb_session(), text in arb_text()) {
        let result = transition(&session, Event::UserText { text });
        let next = result.new_session;

        prop_assert!(next.selected_list.is_none() || next.selected_list == session.selected_list);
        prop_assert!(next.selected_item.is_none() || next.selected_item == session.selected_item);
    }

    /// Every transition produces at least one effect so the user always gets a reply
    #[test]
    fn prop_every_transition_has_effects(session in arb_session(), event in arb_event()) {
        let result = transition(&session, event);
        prop_assert!(!result.effects.is_empty());
    }

    /// Entering a pending mode always prompts, and only one mode is pending at a time
    #[test]
    fn prop_prompts_accompany_pending_modes(
        session in arb_session().prop_map(SessionContext::idle),
        label in arb_label()
    ) {
        let result = transition(&session, Event::user_text(label));
        if let Some(input) = result.new_session.pending() {
            prop_assert_eq!(&result.effects, &vec![Effect::prompt(input)]);
        }
    }
}
