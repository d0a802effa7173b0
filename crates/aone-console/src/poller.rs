//! Incoming-message poll loop.
//!
//! A repeating task: fetch messages after the current cursor, merge them
//! into the inbox, persist and notify when something new arrived. Transport
//! errors are swallowed and the next tick retries unconditionally; the loop
//! trades efficiency for resilience against a flaky integration. The
//! cancellation token is checked after every await, so an in-flight poll
//! becomes a no-op on teardown instead of mutating state late.

use crate::inbox::Inbox;
use crate::transcript::TranscriptStore;
use aone_core::notify::Notifier;
use aone_webhook::api::WebhookApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns the poll loop. The first tick fires immediately, then every
/// `interval`. Stop it by cancelling the token.
pub fn spawn_inbox_poller(
    api: WebhookApi,
    inbox: Arc<RwLock<Inbox>>,
    transcript: Arc<TranscriptStore>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        tracing::info!(target: "inbox_poll", "Poll loop started ({:?} interval)", interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let after = { inbox.read().await.cursor_param() };
            let batch = match api.fetch_incoming_messages(after.as_deref()).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::debug!(target: "inbox_poll", "Poll failed, will retry: {}", e);
                    continue;
                }
            };

            if cancel.is_cancelled() {
                break;
            }
            if batch.is_empty() {
                continue;
            }

            let (outcome, snapshot) = {
                let mut guard = inbox.write().await;
                let outcome = guard.apply_batch(batch);
                let snapshot = outcome
                    .appended_any()
                    .then(|| guard.log().to_vec());
                (outcome, snapshot)
            };

            if let Some(log) = snapshot {
                if let Err(e) = transcript.save(&log) {
                    tracing::warn!(target: "inbox_poll", "Failed to persist transcript: {}", e);
                }
                notifier.incoming_messages(outcome.appended);
            }
        }

        tracing::info!(target: "inbox_poll", "Poll loop stopped");
    })
}
