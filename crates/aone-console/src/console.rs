//! Assistant console orchestration.
//!
//! Owns the inbox state, the send path and the poll loop. User messages are
//! appended optimistically and never retracted: a failed send appends a
//! synthetic error entry instead of rolling the user's message back, so the
//! transcript reflects what was attempted.

use crate::inbox::Inbox;
use crate::poller::spawn_inbox_poller;
use crate::transcript::TranscriptStore;
use aone_core::error::Result;
use aone_core::message::{AssistantMessage, MessageRole};
use aone_core::notify::Notifier;
use aone_webhook::api::WebhookApi;
use aone_webhook::assistant::AssistantClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Error entry appended when the send path fails.
pub const SEND_ERROR_TEXT: &str = "Ошибка связи с сервером. Проверьте настройки и webhook.";

/// The assistant console: transcript state plus the paths that mutate it.
pub struct AssistantConsole {
    inbox: Arc<RwLock<Inbox>>,
    assistant: AssistantClient,
    api: WebhookApi,
    transcript: Arc<TranscriptStore>,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
}

impl AssistantConsole {
    /// Creates a console seeded from the persisted transcript.
    pub fn new(api: WebhookApi, transcript: TranscriptStore, notifier: Arc<dyn Notifier>) -> Self {
        let log = transcript.load();
        let assistant = AssistantClient::new(api.transport().clone());
        Self {
            inbox: Arc::new(RwLock::new(Inbox::with_log(log))),
            assistant,
            api,
            transcript: Arc::new(transcript),
            notifier,
            cancel: CancellationToken::new(),
        }
    }

    /// Starts the incoming-message poll loop (interval from configuration).
    pub fn start_polling(&self) -> JoinHandle<()> {
        let interval =
            Duration::from_secs(self.api.transport().config().poll_interval_secs.max(1));
        spawn_inbox_poller(
            self.api.clone(),
            Arc::clone(&self.inbox),
            Arc::clone(&self.transcript),
            Arc::clone(&self.notifier),
            interval,
            self.cancel.clone(),
        )
    }

    /// Stops the poll loop; an in-flight poll is discarded on completion.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Sends a user message. The optimistic user entry lands in the
    /// transcript immediately; the reply (or a synthetic error entry)
    /// follows. Send failures are absorbed into the transcript.
    pub async fn send(&self, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        let user_message = AssistantMessage {
            id: format!("user-{}", Uuid::new_v4()),
            role: MessageRole::User,
            content: trimmed.to_string(),
            attachments: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        self.append_and_persist(user_message).await;

        match self.assistant.send_message(trimmed).await {
            Ok(reply) => {
                let assistant_message = AssistantMessage {
                    id: format!("assistant-{}", Uuid::new_v4()),
                    role: MessageRole::Assistant,
                    content: reply.text,
                    attachments: reply.attachments,
                    timestamp: chrono::Utc::now().timestamp_millis(),
                };
                self.append_and_persist(assistant_message).await;
            }
            Err(e) => {
                tracing::warn!("[Console] Send failed: {}", e);
                let error_message = AssistantMessage {
                    id: format!("err-{}", Uuid::new_v4()),
                    role: MessageRole::Assistant,
                    content: SEND_ERROR_TEXT.to_string(),
                    attachments: None,
                    timestamp: chrono::Utc::now().timestamp_millis(),
                };
                self.append_and_persist(error_message).await;
            }
        }
        Ok(())
    }

    /// The currently visible transcript (watermark and date filters applied).
    pub async fn messages(&self) -> Vec<AssistantMessage> {
        self.inbox
            .read()
            .await
            .visible_messages()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Hides the transcript up to now; new messages still appear.
    pub async fn clear_dialog(&self) {
        self.inbox
            .write()
            .await
            .clear_dialog(chrono::Utc::now().timestamp_millis());
    }

    /// Restricts the visible window to `[from, to]` (epoch milliseconds).
    pub async fn set_date_range(&self, from_millis: i64, to_millis: i64) {
        self.inbox.write().await.set_date_range(from_millis, to_millis);
    }

    /// Resets the watermark and the date range.
    pub async fn show_all(&self) {
        self.inbox.write().await.show_all();
    }

    /// Shared inbox state (read by embedding UIs).
    pub fn inbox(&self) -> Arc<RwLock<Inbox>> {
        Arc::clone(&self.inbox)
    }

    async fn append_and_persist(&self, message: AssistantMessage) {
        let snapshot = {
            let mut guard = self.inbox.write().await;
            guard.append(message);
            guard.log().to_vec()
        };
        if let Err(e) = self.transcript.save(&snapshot) {
            tracing::warn!("[Console] Failed to persist transcript: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aone_core::config::WebhookConfig;
    use aone_core::notify::NullNotifier;
    use aone_core::session::SessionStore;
    use aone_webhook::transport::WebhookTransport;
    use tempfile::TempDir;

    fn console(temp_dir: &TempDir) -> AssistantConsole {
        // The default relative webhook URL cannot be resolved by the HTTP
        // client, so every send fails fast without touching the network.
        let transport =
            WebhookTransport::new(WebhookConfig::default(), SessionStore::new());
        let api = WebhookApi::new(transport);
        let transcript = TranscriptStore::new(temp_dir.path()).unwrap();
        AssistantConsole::new(api, transcript, Arc::new(NullNotifier))
    }

    #[tokio::test]
    async fn test_seeded_from_persisted_transcript() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = TranscriptStore::new(temp_dir.path()).unwrap();
            store
                .save(&[AssistantMessage {
                    id: "1".to_string(),
                    role: MessageRole::Assistant,
                    content: "welcome back".to_string(),
                    attachments: None,
                    timestamp: 1000,
                }])
                .unwrap();
        }
        let console = console(&temp_dir);
        let messages = console.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "welcome back");
    }

    #[tokio::test]
    async fn test_failed_send_keeps_user_message_and_appends_error() {
        let temp_dir = TempDir::new().unwrap();
        let console = console(&temp_dir);

        console.send("есть новости?").await.unwrap();

        let messages = console.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "есть новости?");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, SEND_ERROR_TEXT);

        // Both entries were persisted.
        let store = TranscriptStore::new(temp_dir.path()).unwrap();
        assert_eq!(store.load().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let console = console(&temp_dir);
        console.send("   ").await.unwrap();
        assert!(console.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_and_show_all() {
        let temp_dir = TempDir::new().unwrap();
        let console = console(&temp_dir);
        console.send("первое").await.unwrap();

        console.clear_dialog().await;
        assert!(console.messages().await.is_empty());

        console.show_all().await;
        assert_eq!(console.messages().await.len(), 2);
    }
}
