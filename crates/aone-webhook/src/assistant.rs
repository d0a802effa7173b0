//! Assistant console send path.
//!
//! Two reply modes, mirroring the backend workflow:
//! 1. Immediate: the webhook answers with `{text, attachments}` directly.
//! 2. Deferred: the webhook answers `{status: "processing", request_id}` and
//!    the client polls `getCOOResponse` with that request_id until
//!    `{status: "ready", text, attachments}` arrives or the attempts run
//!    out.

use crate::transport::WebhookTransport;
use aone_core::error::Result;
use aone_core::message::AssistantReply;
use aone_core::record::Attachment;
use serde_json::{Value, json};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(1500);
const POLL_MAX_ATTEMPTS: usize = 60; // ~90 s

/// Informational text shown when the deferred reply never arrived.
pub const NO_RESPONSE_TEXT: &str = "Ответ не получен. Попробуйте позже.";

/// Client for the assistant's free-form message channel.
#[derive(Clone)]
pub struct AssistantClient {
    transport: WebhookTransport,
}

impl AssistantClient {
    pub fn new(transport: WebhookTransport) -> Self {
        Self { transport }
    }

    /// Sends a user message and resolves the assistant reply, polling for a
    /// deferred one when the backend signals `processing`.
    pub async fn send_message(&self, message: &str) -> Result<AssistantReply> {
        let body = json!({
            "message": message,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        });
        let raw = self.transport.send_raw(body).await?;

        // Immediate reply.
        if let Some(reply) = reply_from(&raw) {
            return Ok(reply);
        }

        // Deferred reply: poll by request_id.
        if raw.get("status").and_then(Value::as_str) == Some("processing")
            && let Some(request_id) = raw.get("request_id").and_then(Value::as_str)
        {
            let request_id = request_id.to_string();
            for _ in 0..POLL_MAX_ATTEMPTS {
                tokio::time::sleep(POLL_INTERVAL).await;
                if let Some(reply) = self.poll_response(&request_id).await? {
                    return Ok(reply);
                }
            }
            return Ok(AssistantReply {
                text: NO_RESPONSE_TEXT.to_string(),
                attachments: None,
            });
        }

        Ok(reply_or_empty(&raw))
    }

    /// One `getCOOResponse` poll; `Some` once the backend reports `ready`.
    async fn poll_response(&self, request_id: &str) -> Result<Option<AssistantReply>> {
        // request_id travels at the top level of the envelope, next to the
        // action, not inside a payload.
        let body = json!({
            "action": "getCOOResponse",
            "request_id": request_id,
        });
        let raw = self.transport.send_raw(body).await?;
        if raw.get("status").and_then(Value::as_str) == Some("ready") {
            return Ok(Some(reply_or_empty(&raw)));
        }
        Ok(None)
    }
}

/// Builds a reply when any of the known text keys is present; the reply text
/// is the first present of `text`/`message`/`output`, attachments come from
/// `attachments` falling back to `files`.
fn reply_from(raw: &Value) -> Option<AssistantReply> {
    let has_text = ["text", "message", "output"]
        .iter()
        .any(|key| raw.get(*key).is_some());
    if !has_text {
        return None;
    }
    Some(reply_or_empty(raw))
}

fn reply_or_empty(raw: &Value) -> AssistantReply {
    let text = ["text", "message", "output"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
        .unwrap_or("")
        .to_string();
    let attachments = raw
        .get("attachments")
        .or_else(|| raw.get("files"))
        .cloned()
        .and_then(|value| serde_json::from_value::<Vec<Attachment>>(value).ok())
        .filter(|list| !list.is_empty());
    AssistantReply { text, attachments }
}
