//! Mock implementations for testing
//!
//! These mocks enable runtime and scheduler tests without a chat transport.

use super::traits::*;
use super::{ConversationRuntime, InMemorySessionStore};
use crate::db::{Database, DbError, DbResult, Entity, Item, Reminder, TaskList, User};
use crate::state_machine::SessionContext;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Notifier
// ============================================================================

/// Notifier that records every message, optionally failing each send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, OutboundMessage)>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send is recorded and then reported as failed
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.failing.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn sent(&self) -> Vec<(i64, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_for(&self, recipient: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, m)| m.text.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: i64, message: OutboundMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((recipient, message));
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Api("mock delivery failure".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Manual Clock
// ============================================================================

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

/// Fixed instant used as "now" across tests
pub fn test_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 5, 14)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap()
}

// ============================================================================
// In-Memory Reminder Store
// ============================================================================

/// Reminder store without referential integrity, so dangling links can be
/// represented
#[derive(Default)]
pub struct InMemoryReminderStore {
    reminders: Mutex<Vec<Reminder>>,
    items: Mutex<HashMap<i64, Item>>,
    lists: Mutex<HashMap<i64, TaskList>>,
    users: Mutex<HashMap<i64, User>>,
}

#[allow(dead_code)]
impl InMemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, id: i64) -> Self {
        self.users.lock().unwrap().insert(
            id,
            User {
                id,
                name: format!("user-{id}"),
            },
        );
        self
    }

    pub fn with_list(self, id: i64, user_id: i64, title: &str) -> Self {
        self.lists.lock().unwrap().insert(
            id,
            TaskList {
                id,
                title: title.to_string(),
                user_id,
            },
        );
        self
    }

    pub fn with_item(self, id: i64, list_id: i64, title: &str) -> Self {
        self.items.lock().unwrap().insert(
            id,
            Item {
                id,
                title: title.to_string(),
                status_id: 1,
                list_id,
                date: None,
                time: None,
            },
        );
        self
    }

    pub fn with_reminder(self, id: i64, item_id: i64, at: NaiveDateTime) -> Self {
        self.reminders.lock().unwrap().push(Reminder {
            id,
            item_id,
            date: at.date(),
            time: at.time(),
        });
        self
    }

    pub fn reminder_ids(&self) -> Vec<i64> {
        self.reminders.lock().unwrap().iter().map(|r| r.id).collect()
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn due_reminders(
        &self,
        now: NaiveDateTime,
        tolerance: Duration,
    ) -> DbResult<Vec<Reminder>> {
        Ok(self
            .reminders
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_due(now, tolerance))
            .cloned()
            .collect())
    }

    async fn get_item_by_id(&self, item_id: i64) -> DbResult<Item> {
        self.items
            .lock()
            .unwrap()
            .get(&item_id)
            .cloned()
            .ok_or(DbError::NotFound(Entity::Item, item_id))
    }

    async fn get_list(&self, list_id: i64) -> DbResult<TaskList> {
        self.lists
            .lock()
            .unwrap()
            .get(&list_id)
            .cloned()
            .ok_or(DbError::NotFound(Entity::List, list_id))
    }

    async fn get_user(&self, user_id: i64) -> DbResult<User> {
        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(DbError::NotFound(Entity::User, user_id))
    }

    async fn remove_reminder(&self, reminder_id: i64) -> DbResult<()> {
        let mut reminders = self.reminders.lock().unwrap();
        let before = reminders.len();
        reminders.retain(|r| r.id != reminder_id);
        if reminders.len() == before {
            return Err(DbError::NotFound(Entity::Reminder, reminder_id));
        }
        Ok(())
    }
}

// ============================================================================
// Test Runtime Harness
// ============================================================================

pub type TestConversationRuntime =
    ConversationRuntime<DatabaseStore, RecordingNotifier, InMemorySessionStore>;

/// Runtime over an in-memory database, a recording notifier and a manual clock
pub struct TestRuntime {
    pub db: Database,
    pub notifier: Arc<RecordingNotifier>,
    pub sessions: Arc<InMemorySessionStore>,
    pub clock: Arc<ManualClock>,
    pub runtime: Arc<TestConversationRuntime>,
}

#[allow(dead_code)]
impl TestRuntime {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let clock = Arc::new(ManualClock::new(test_now()));
        let runtime = Arc::new(ConversationRuntime::new(
            Arc::new(DatabaseStore::new(db.clone())),
            notifier.clone(),
            sessions.clone(),
            clock.clone(),
        ));
        Self {
            db,
            notifier,
            sessions,
            clock,
            runtime,
        }
    }

    /// Send one message and return the texts replied to it
    pub async fn say(&self, user_id: i64, text: &str) -> Vec<String> {
        let before = self.notifier.texts_for(user_id).len();
        self.runtime
            .handle_message(InboundMessage {
                user_id,
                display_name: format!("user-{user_id}"),
                text: text.to_string(),
            })
            .await;
        self.notifier.texts_for(user_id).split_off(before)
    }

    pub async fn session(&self, user_id: i64) -> SessionContext {
        self.sessions.get(user_id).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ItemUpdate;
    use crate::state_machine::command::labels;
    use crate::state_machine::PendingInput;
    use chrono::NaiveTime;

    const ALICE: i64 = 100;
    const BOB: i64 = 200;

    #[tokio::test]
    async fn test_mock_notifier_records_failures() {
        let notifier = RecordingNotifier::failing();
        let result = notifier.send(1, OutboundMessage::text("hi")).await;
        assert!(result.is_err());
        assert_eq!(notifier.texts_for(1), vec!["hi".to_string()]);
    }

    #[tokio::test]
    async fn test_start_shows_main_menu_and_registers_user() {
        let rt = TestRuntime::new();
        let replies = rt.say(ALICE, "/start").await;
        assert_eq!(replies, vec!["Main menu. Choose an action:".to_string()]);
        assert_eq!(rt.db.get_user(ALICE).unwrap().name, "user-100");

        let (_, menu) = rt.notifier.sent().pop().unwrap();
        let keyboard = menu.keyboard.unwrap();
        assert_eq!(keyboard.rows[0], vec![labels::MY_LISTS, labels::CREATE_LIST]);
    }

    #[tokio::test]
    async fn test_create_list_flow() {
        let rt = TestRuntime::new();
        let prompt = rt.say(ALICE, labels::CREATE_LIST).await;
        assert_eq!(prompt, vec![PendingInput::CreateList.prompt().to_string()]);

        let replies = rt.say(ALICE, "  Groceries ").await;
        assert_eq!(replies[0], "List created: Groceries");
        assert!(rt.session(ALICE).await.is_empty());

        let lists = rt.say(ALICE, labels::MY_LISTS).await;
        assert_eq!(lists, vec!["Your lists:\n/list_1 - Groceries".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_list_title_returns_to_idle_without_creating() {
        let rt = TestRuntime::new();
        rt.say(ALICE, labels::CREATE_LIST).await;

        let replies = rt.say(ALICE, "   ").await;
        assert_eq!(replies, vec!["Error: List title cannot be empty".to_string()]);
        assert!(rt.session(ALICE).await.state.is_idle());
        assert_eq!(rt.db.get_user_lists_count(ALICE).unwrap(), 0);

        // Next message is a command again, not list input
        let replies = rt.say(ALICE, labels::LISTS_COUNT).await;
        assert_eq!(replies, vec!["You have 0 list(s)".to_string()]);
    }

    #[tokio::test]
    async fn test_selecting_foreign_list_is_not_found() {
        let rt = TestRuntime::new();
        rt.db.get_or_create_user(BOB, "bob").unwrap();
        let bobs = rt.db.create_list(BOB, "Secret").unwrap();

        let replies = rt.say(ALICE, &format!("/list_{}", bobs.id)).await;
        assert_eq!(replies, vec!["List not found.".to_string()]);
        assert!(rt.session(ALICE).await.is_empty());

        let replies = rt.say(ALICE, "/list_999").await;
        assert_eq!(replies, vec!["List not found.".to_string()]);
    }

    #[tokio::test]
    async fn test_selecting_foreign_item_keeps_own_selection() {
        let rt = TestRuntime::new();
        rt.db.get_or_create_user(ALICE, "alice").unwrap();
        rt.db.get_or_create_user(BOB, "bob").unwrap();
        let mine = rt.db.create_list(ALICE, "Mine").unwrap();
        let theirs = rt.db.create_list(BOB, "Theirs").unwrap();
        let foreign = rt.db.add_item(theirs.id, "Hidden", None, None).unwrap();

        rt.say(ALICE, &format!("/list_{}", mine.id)).await;
        let before = rt.session(ALICE).await;

        let replies = rt.say(ALICE, &format!("/item_{}", foreign.id)).await;
        assert_eq!(replies, vec!["Task not found.".to_string()]);
        assert_eq!(rt.session(ALICE).await, before);
    }

    #[tokio::test]
    async fn test_task_commands_without_selection() {
        let rt = TestRuntime::new();
        assert_eq!(rt.say(ALICE, labels::ADD_TASK).await, vec!["No list selected."]);
        assert_eq!(rt.say(ALICE, labels::EDIT_DATE).await, vec!["No task selected."]);
        assert!(rt.session(ALICE).await.is_empty());
    }

    async fn with_selected_item(rt: &TestRuntime) -> (TaskList, Item) {
        rt.db.get_or_create_user(ALICE, "alice").unwrap();
        let list = rt.db.create_list(ALICE, "Home").unwrap();
        let item = rt.db.add_item(list.id, "Laundry", None, None).unwrap();
        rt.say(ALICE, &format!("/item_{}", item.id)).await;
        (list, item)
    }

    #[tokio::test]
    async fn test_item_selection_sets_both_layers() {
        let rt = TestRuntime::new();
        let (list, item) = with_selected_item(&rt).await;
        let session = rt.session(ALICE).await;
        assert_eq!(session.selected_list, Some(list.id));
        assert_eq!(session.selected_item, Some(item.id));
    }

    #[tokio::test]
    async fn test_bad_date_leaves_task_unchanged() {
        let rt = TestRuntime::new();
        let (_, item) = with_selected_item(&rt).await;

        for bad in ["2030-01-01", "1.1.2030", "31.02.2030", "tomorrow"] {
            rt.say(ALICE, labels::EDIT_DATE).await;
            let replies = rt.say(ALICE, bad).await;
            assert_eq!(replies, vec!["Error: Invalid date format. Use DD.MM.YYYY"], "{bad}");
            assert_eq!(rt.db.get_item(item.id).unwrap().date, None, "{bad}");
            assert!(rt.session(ALICE).await.state.is_idle());
        }

        rt.say(ALICE, labels::EDIT_DATE).await;
        let replies = rt.say(ALICE, "01.06.2030").await;
        assert_eq!(replies[0], "Task date updated.");
        assert_eq!(
            rt.db.get_item(item.id).unwrap().date,
            NaiveDate::from_ymd_opt(2030, 6, 1)
        );
    }

    #[tokio::test]
    async fn test_status_change_by_title() {
        let rt = TestRuntime::new();
        let (_, item) = with_selected_item(&rt).await;

        let replies = rt.say(ALICE, "status_done").await;
        assert_eq!(replies[0], "Status changed to: Done");
        assert_eq!(rt.db.get_item(item.id).unwrap().status_id, 3);

        let replies = rt.say(ALICE, "status_Someday").await;
        assert_eq!(replies, vec!["Error: Unknown status: Someday"]);
    }

    #[tokio::test]
    async fn test_minute_reminder_is_offset_from_now() {
        let rt = TestRuntime::new();
        let (_, item) = with_selected_item(&rt).await;

        rt.say(ALICE, labels::REMIND_IN_MINUTES).await;
        let replies = rt.say(ALICE, "61").await;
        assert_eq!(replies, vec!["Error: Minutes must be between 1 and 60"]);

        rt.say(ALICE, labels::REMIND_IN_MINUTES).await;
        let replies = rt.say(ALICE, "10").await;
        assert_eq!(replies, vec!["Reminder set for 14.05.2030 12:10"]);

        let reminders = rt.db.get_item_reminders(item.id).unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].fire_at(), test_now() + Duration::minutes(10));
    }

    #[tokio::test]
    async fn test_quick_reminder_needs_task_schedule() {
        let rt = TestRuntime::new();
        let (_, item) = with_selected_item(&rt).await;

        let replies = rt.say(ALICE, labels::REMIND_1_HOUR).await;
        assert_eq!(replies, vec!["Error: Task has no date and time set"]);

        rt.db
            .update_item(
                item.id,
                &ItemUpdate {
                    date: NaiveDate::from_ymd_opt(2030, 5, 16),
                    time: NaiveTime::from_hms_opt(9, 0, 0),
                    ..ItemUpdate::default()
                },
            )
            .unwrap();
        let replies = rt.say(ALICE, labels::REMIND_1_DAY).await;
        assert_eq!(replies, vec!["Reminder set for 15.05.2030 09:00"]);

        let replies = rt.say(ALICE, labels::REMIND_15_MIN).await;
        assert_eq!(replies, vec!["Reminder set for 16.05.2030 08:45"]);

        // Same lead once the fire instant has passed
        rt.clock.set(NaiveDate::from_ymd_opt(2030, 5, 16).unwrap().and_hms_opt(8, 50, 0).unwrap());
        let replies = rt.say(ALICE, labels::REMIND_15_MIN).await;
        assert!(replies[0].starts_with("Error: Reminder cannot be set in the past"));
    }

    #[tokio::test]
    async fn test_remove_reminder_must_belong_to_task() {
        let rt = TestRuntime::new();
        let (list, item) = with_selected_item(&rt).await;
        let other = rt.db.add_item(list.id, "Other", None, None).unwrap();
        let foreign = rt.db.add_reminder_in_minutes(other.id, 5, test_now()).unwrap();
        let own = rt.db.add_reminder_in_minutes(item.id, 5, test_now()).unwrap();

        rt.say(ALICE, labels::REMOVE_REMINDER).await;
        let replies = rt.say(ALICE, &foreign.id.to_string()).await;
        assert_eq!(replies, vec![format!("Error: Reminder not found: {}", foreign.id)]);
        assert!(rt.db.get_reminder(foreign.id).is_ok());

        rt.say(ALICE, labels::REMOVE_REMINDER).await;
        let replies = rt.say(ALICE, &own.id.to_string()).await;
        assert_eq!(replies, vec!["Reminder removed."]);
        assert!(rt.db.get_item_reminders(item.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let rt = TestRuntime::new();
        let (list, _) = with_selected_item(&rt).await;
        rt.db.add_item(list.id, "Buy MILK", None, None).unwrap();

        rt.say(ALICE, labels::FIND_TASK).await;
        let replies = rt.say(ALICE, "milk").await;
        assert_eq!(replies, vec!["Search results:\n/item_2 - Buy MILK [Planned]"]);
    }

    #[tokio::test]
    async fn test_deleting_selected_list_clears_selection() {
        let rt = TestRuntime::new();
        let (list, item) = with_selected_item(&rt).await;
        rt.db.add_reminder_in_minutes(item.id, 5, test_now()).unwrap();

        let replies = rt.say(ALICE, labels::DELETE_LIST).await;
        assert_eq!(replies[0], "List deleted.");
        assert!(rt.session(ALICE).await.is_empty());
        assert!(matches!(rt.db.get_list(list.id), Err(DbError::NotFound(Entity::List, _))));
        assert!(matches!(rt.db.get_item(item.id), Err(DbError::NotFound(Entity::Item, _))));
    }

    #[tokio::test]
    async fn test_deleting_task_returns_to_list_menu() {
        let rt = TestRuntime::new();
        let (list, item) = with_selected_item(&rt).await;

        let replies = rt.say(ALICE, labels::DELETE_TASK).await;
        assert_eq!(replies, vec!["Task deleted.".to_string(), "List: Home\nChoose an action:".to_string()]);
        let session = rt.session(ALICE).await;
        assert_eq!(session.selected_list, Some(list.id));
        assert_eq!(session.selected_item, None);
        assert!(rt.db.get_item(item.id).is_err());
    }

    #[tokio::test]
    async fn test_messages_processed_in_arrival_order() {
        let rt = TestRuntime::new();
        for text in [labels::CREATE_LIST, "First", labels::CREATE_LIST, "Second"] {
            rt.say(ALICE, text).await;
        }
        let titles: Vec<_> = rt
            .db
            .get_user_lists(ALICE)
            .unwrap()
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_overlapping_messages_leave_consistent_session() {
        let rt = TestRuntime::new();
        rt.say(ALICE, labels::CREATE_LIST).await;

        let a = rt.runtime.clone();
        let b = rt.runtime.clone();
        let msg = |text: &str| InboundMessage {
            user_id: ALICE,
            display_name: "alice".to_string(),
            text: text.to_string(),
        };
        let (first, second) = (msg("Work"), msg(labels::MY_LISTS));
        tokio::join!(a.handle_message(first), b.handle_message(second));

        // Both messages complete and the session is last-writer-wins; if both
        // observed the prompt each one consumed it as a title
        let session = rt.session(ALICE).await;
        assert!(session.state.is_idle());
        let count = rt.db.get_user_lists_count(ALICE).unwrap();
        assert!((1..=2).contains(&count), "{count}");
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_abort_processing() {
        let db = Database::open_in_memory().unwrap();
        let notifier = Arc::new(RecordingNotifier::failing());
        let sessions = Arc::new(InMemorySessionStore::new());
        let runtime = ConversationRuntime::new(
            Arc::new(DatabaseStore::new(db.clone())),
            notifier.clone(),
            sessions.clone(),
            Arc::new(ManualClock::new(test_now())),
        );
        for text in [labels::CREATE_LIST, "Errands"] {
            runtime
                .handle_message(InboundMessage {
                    user_id: ALICE,
                    display_name: "alice".to_string(),
                    text: text.to_string(),
                })
                .await;
        }
        assert_eq!(db.get_user_lists_count(ALICE).unwrap(), 1);
        assert!(notifier.len() >= 2);
    }
}
