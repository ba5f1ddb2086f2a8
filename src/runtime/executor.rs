//! Conversation runtime executor
//!
//! Loads the user's session, runs the pure transition, saves the session and
//! then executes the effects against the store and the notifier.

use super::render;
use super::traits::{
    Clock, InboundMessage, Notifier, OutboundMessage, ReminderStore, SessionStore, TaskStore,
};

use crate::db::{
    parse_date_input, parse_time_input, DbError, DbResult, Entity, ItemUpdate,
};
use crate::state_machine::{transition, Effect, Event, PendingInput};
use std::sync::Arc;

const GENERIC_ERROR: &str = "Error: something went wrong, please try again later.";
const LIST_NOT_FOUND: &str = "List not found.";
const ITEM_NOT_FOUND: &str = "Task not found.";

/// Runtime for all users' conversations, generic over storage and delivery
pub struct ConversationRuntime<S, N, Ss>
where
    S: TaskStore + 'static,
    N: Notifier + 'static,
    Ss: SessionStore + 'static,
{
    store: Arc<S>,
    notifier: Arc<N>,
    sessions: Arc<Ss>,
    clock: Arc<dyn Clock>,
}

impl<S, N, Ss> ConversationRuntime<S, N, Ss>
where
    S: TaskStore + 'static,
    N: Notifier + 'static,
    Ss: SessionStore + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, sessions: Arc<Ss>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            sessions,
            clock,
        }
    }

    /// Process one inbound message to completion
    ///
    /// Messages from the same user must be handed in one at a time, in
    /// arrival order; concurrent calls for one user are last-writer-wins on
    /// the session.
    pub async fn handle_message(&self, message: InboundMessage) {
        let user_id = message.user_id;
        tracing::debug!(user_id, text = %message.text, "Handling message");

        if let Err(e) = self
            .store
            .get_or_create_user(user_id, &message.display_name)
            .await
        {
            self.report_error(user_id, &e).await;
            return;
        }

        let mut session = self.sessions.get(user_id).await;
        let mut events_to_process = vec![Event::UserText { text: message.text }];

        while let Some(event) = events_to_process.pop() {
            // Pure state transition
            let result = transition(&session, event);
            session = result.new_session;

            // Persist before acting so a failed action never re-arms a prompt
            if session.is_empty() {
                self.sessions.clear(user_id).await;
            } else {
                self.sessions.set(user_id, session.clone()).await;
            }

            for effect in result.effects {
                match self.execute_effect(user_id, effect).await {
                    Ok(Some(generated)) => events_to_process.push(generated),
                    Ok(None) => {}
                    Err(e) => {
                        self.report_error(user_id, &e).await;
                        break;
                    }
                }
            }
        }
    }

    async fn execute_effect(&self, user_id: i64, effect: Effect) -> DbResult<Option<Event>> {
        match effect {
            Effect::Reply { text } => self.send(user_id, OutboundMessage::text(text)).await,
            Effect::ShowMainMenu => self.send(user_id, render::main_menu()).await,
            Effect::ShowListMenu { list_id } => self.show_list_menu(user_id, list_id).await?,
            Effect::ShowItemMenu { item_id } => self.show_item_menu(user_id, item_id).await?,
            Effect::ShowReminderMenu => self.send(user_id, render::reminder_menu()).await,
            Effect::ShowStatusMenu => {
                let statuses = self.store.get_statuses().await?;
                self.send(user_id, render::status_menu(&statuses)).await;
            }
            Effect::ShowLists => {
                let lists = self.store.get_user_lists(user_id).await?;
                self.reply(user_id, render::lists_text(&lists)).await;
            }
            Effect::ShowListsCount => {
                let count = self.store.get_user_lists_count(user_id).await?;
                self.reply(user_id, format!("You have {count} list(s)")).await;
            }
            Effect::ShowListStats { list_id } => {
                let count = self.store.get_list_items_count(list_id).await?;
                self.reply(user_id, format!("The list has {count} task(s)")).await;
            }
            Effect::ShowTasks { list_id } => {
                let today = self.clock.now().date();
                let items = self.store.get_today_and_future_items(list_id, today).await?;
                let statuses = self.store.get_statuses().await?;
                self.reply(user_id, render::tasks_text(&items, &statuses)).await;
            }
            Effect::ShowReminders { item_id } => {
                let reminders = self.store.get_item_reminders(item_id).await?;
                self.reply(user_id, render::reminders_text(&reminders)).await;
            }

            Effect::SelectList { list_id } => {
                if self.store.is_list_owner(list_id, user_id).await? {
                    return Ok(Some(Event::ListSelected { list_id }));
                }
                tracing::debug!(user_id, list_id, "List selection refused");
                self.reply(user_id, LIST_NOT_FOUND).await;
            }
            Effect::SelectItem { item_id } => {
                let item = match self.store.get_item_by_id(item_id).await {
                    Ok(item) => Some(item),
                    Err(DbError::NotFound(..)) => None,
                    Err(e) => return Err(e),
                };
                if let Some(item) = item {
                    if self.store.is_list_owner(item.list_id, user_id).await? {
                        return Ok(Some(Event::ItemSelected {
                            item_id,
                            list_id: item.list_id,
                        }));
                    }
                }
                tracing::debug!(user_id, item_id, "Task selection refused");
                self.reply(user_id, ITEM_NOT_FOUND).await;
            }

            Effect::DeleteList { list_id } => {
                self.store.delete_list(list_id).await?;
                tracing::info!(user_id, list_id, "List deleted");
                return Ok(Some(Event::ListDeleted { list_id }));
            }
            Effect::DeleteItem { item_id } => {
                self.store.delete_item(item_id).await?;
                tracing::info!(user_id, item_id, "Task deleted");
                return Ok(Some(Event::ItemDeleted { item_id }));
            }
            Effect::ChangeStatus { item_id, status } => {
                let statuses = self.store.get_statuses().await?;
                let target = statuses
                    .iter()
                    .find(|s| s.title.eq_ignore_ascii_case(&status))
                    .ok_or_else(|| DbError::Validation(format!("Unknown status: {status}")))?;
                self.store.change_item_status(item_id, target.id).await?;
                self.reply(user_id, format!("Status changed to: {}", target.title))
                    .await;
                self.show_item_menu(user_id, item_id).await?;
            }
            Effect::QuickReminder { item_id, lead } => {
                let now = self.clock.now();
                let reminder = self
                    .store
                    .add_reminder_before_task(item_id, lead.duration(), now)
                    .await?;
                tracing::info!(user_id, item_id, reminder_id = reminder.id, "Reminder created");
                self.reply(user_id, render::reminder_created(&reminder)).await;
            }

            Effect::Submit { input, text } => self.submit(user_id, input, &text).await?,
        }
        Ok(None)
    }

    /// Consume raw text for a pending mode
    async fn submit(&self, user_id: i64, input: PendingInput, text: &str) -> DbResult<()> {
        match input {
            PendingInput::CreateList => {
                let list = self.store.create_list(user_id, text).await?;
                tracing::info!(user_id, list_id = list.id, "List created");
                self.reply(user_id, format!("List created: {}", list.title))
                    .await;
                self.send(user_id, render::main_menu()).await;
            }
            PendingInput::RenameList { list_id } => {
                self.store.rename_list(list_id, text).await?;
                self.reply(user_id, "List renamed.").await;
                self.show_list_menu(user_id, list_id).await?;
            }
            PendingInput::AddTask { list_id } => {
                let item = self.store.add_item(list_id, text, None, None).await?;
                tracing::info!(user_id, list_id, item_id = item.id, "Task added");
                self.reply(user_id, format!("Task added: {}", item.title))
                    .await;
                self.show_list_menu(user_id, list_id).await?;
            }
            PendingInput::SearchTask { list_id } => {
                let needle = text.trim().to_lowercase();
                let today = self.clock.now().date();
                let found: Vec<_> = self
                    .store
                    .get_today_and_future_items(list_id, today)
                    .await?
                    .into_iter()
                    .filter(|i| i.title.to_lowercase().contains(&needle))
                    .collect();
                let statuses = self.store.get_statuses().await?;
                self.reply(user_id, render::search_text(&found, &statuses))
                    .await;
            }
            PendingInput::UpdateTaskTitle { item_id } => {
                let update = ItemUpdate {
                    title: Some(text.to_string()),
                    ..ItemUpdate::default()
                };
                self.update_item(user_id, item_id, &update, "Task title updated.")
                    .await?;
            }
            PendingInput::UpdateTaskDate { item_id } => {
                let update = ItemUpdate {
                    date: Some(parse_date_input(text)?),
                    ..ItemUpdate::default()
                };
                self.update_item(user_id, item_id, &update, "Task date updated.")
                    .await?;
            }
            PendingInput::UpdateTaskTime { item_id } => {
                let update = ItemUpdate {
                    time: Some(parse_time_input(text)?),
                    ..ItemUpdate::default()
                };
                self.update_item(user_id, item_id, &update, "Task time updated.")
                    .await?;
            }
            PendingInput::AddCustomReminder { item_id } => {
                let minutes = parse_number(text)?;
                let now = self.clock.now();
                let reminder = self
                    .store
                    .add_reminder_in_minutes(item_id, minutes, now)
                    .await?;
                tracing::info!(user_id, item_id, reminder_id = reminder.id, "Reminder created");
                self.reply(user_id, render::reminder_created(&reminder)).await;
            }
            PendingInput::AddHourReminder { item_id } => {
                let hours = parse_number(text)?;
                let now = self.clock.now();
                let reminder = self.store.add_reminder_in_hours(item_id, hours, now).await?;
                tracing::info!(user_id, item_id, reminder_id = reminder.id, "Reminder created");
                self.reply(user_id, render::reminder_created(&reminder)).await;
            }
            PendingInput::RemoveReminder { item_id } => {
                let reminder_id = parse_number(text)?;
                let reminder = self.store.get_reminder(reminder_id).await?;
                if reminder.item_id != item_id {
                    return Err(DbError::NotFound(Entity::Reminder, reminder_id));
                }
                self.store.remove_reminder(reminder_id).await?;
                self.reply(user_id, "Reminder removed.").await;
            }
        }
        Ok(())
    }

    async fn update_item(
        &self,
        user_id: i64,
        item_id: i64,
        update: &ItemUpdate,
        confirmation: &str,
    ) -> DbResult<()> {
        self.store.update_item(item_id, update).await?;
        self.reply(user_id, confirmation).await;
        self.show_item_menu(user_id, item_id).await
    }

    async fn show_list_menu(&self, user_id: i64, list_id: i64) -> DbResult<()> {
        let list = self.store.get_list(list_id).await?;
        self.send(user_id, render::list_menu(&list)).await;
        Ok(())
    }

    async fn show_item_menu(&self, user_id: i64, item_id: i64) -> DbResult<()> {
        let item = self.store.get_item_by_id(item_id).await?;
        let statuses = self.store.get_statuses().await?;
        self.send(user_id, render::item_menu(&item, &statuses)).await;
        Ok(())
    }

    async fn report_error(&self, user_id: i64, error: &DbError) {
        if error.is_user_facing() {
            tracing::debug!(user_id, error = %error, "Rejected user input");
            self.reply(user_id, format!("Error: {error}")).await;
        } else {
            tracing::error!(user_id, error = %error, "Storage failure");
            self.reply(user_id, GENERIC_ERROR).await;
        }
    }

    async fn reply(&self, user_id: i64, text: impl Into<String>) {
        self.send(user_id, OutboundMessage::text(text)).await;
    }

    /// Delivery failures are logged and otherwise ignored
    async fn send(&self, user_id: i64, message: OutboundMessage) {
        if let Err(e) = self.notifier.send(user_id, message).await {
            tracing::warn!(user_id, error = %e, "Failed to deliver reply");
        }
    }
}

fn parse_number(text: &str) -> DbResult<i64> {
    text.trim()
        .parse()
        .map_err(|_| DbError::Validation("Please enter a whole number".to_string()))
}
