//! Telegram Bot API transport
//!
//! Outbound replies go through `sendMessage`; inbound text arrives by
//! long-polling `getUpdates`.

use crate::runtime::{
    ConversationRuntime, InboundMessage, Keyboard, Notifier, NotifyError, OutboundMessage,
    SessionStore, TaskStore,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause after a failed poll before trying again
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Slack on top of the long-poll timeout before the HTTP request gives up
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyKeyboardMarkup<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboardMarkup<'a> {
    keyboard: Vec<Vec<KeyboardButton<'a>>>,
    resize_keyboard: bool,
    one_time_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton<'a> {
    text: &'a str,
}

impl<'a> From<&'a Keyboard> for ReplyKeyboardMarkup<'a> {
    fn from(keyboard: &'a Keyboard) -> Self {
        Self {
            keyboard: keyboard
                .rows
                .iter()
                .map(|row| row.iter().map(|text| KeyboardButton { text: text.as_str() }).collect())
                .collect(),
            resize_keyboard: true,
            one_time_keyboard: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    #[serde(default)]
    from: Option<TgUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl TgUser {
    fn display_name(&self) -> String {
        match (&self.last_name, &self.username) {
            (Some(last), _) => format!("{} {last}", self.first_name),
            (None, _) if !self.first_name.is_empty() => self.first_name.clone(),
            (None, Some(username)) => username.clone(),
            (None, None) => String::new(),
        }
    }
}

impl Update {
    /// Text messages only; the chat id identifies the user
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let text = message.text?;
        Some(InboundMessage {
            user_id: message.chat.id,
            display_name: message
                .from
                .as_ref()
                .map(TgUser::display_name)
                .unwrap_or_default(),
            text,
        })
    }
}

// ============================================================================
// Client
// ============================================================================

/// Bot API client
pub struct TelegramClient {
    client: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(poll_timeout + REQUEST_TIMEOUT_SLACK)
            .build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
            poll_timeout,
        })
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, NotifyError> {
        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            NotifyError::Api(format!("HTTP {status}: unparsable response ({e})"))
        })?;

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(NotifyError::Api(format!(
                "{method} failed with HTTP {status}: {}",
                description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, NotifyError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &request).await
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(&self, recipient: i64, message: OutboundMessage) -> Result<(), NotifyError> {
        let request = SendMessageRequest {
            chat_id: recipient,
            text: &message.text,
            reply_markup: message.keyboard.as_ref().map(ReplyKeyboardMarkup::from),
        };
        let _: serde_json::Value = self.call("sendMessage", &request).await?;
        Ok(())
    }
}

/// Feed inbound text messages to the runtime until cancelled
///
/// Messages are handled one at a time in update order.
pub async fn run_polling<S, N, Ss>(
    client: &TelegramClient,
    runtime: &ConversationRuntime<S, N, Ss>,
    cancel: CancellationToken,
) where
    S: TaskStore + 'static,
    N: Notifier + 'static,
    Ss: SessionStore + 'static,
{
    tracing::info!("Polling for updates");
    let mut offset = 0;

    loop {
        let polled = tokio::select! {
            () = cancel.cancelled() => break,
            polled = client.get_updates(offset) => polled,
        };

        match polled {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    if let Some(message) = update.into_inbound() {
                        runtime.handle_message(message).await;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Polling failed, backing off");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(RETRY_BACKOFF) => {}
                }
            }
        }
    }

    tracing::info!("Polling stopped");
}
