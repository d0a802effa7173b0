//! Assistant console message types.
//!
//! `IncomingMessage` is the wire shape delivered by the incoming-message
//! poll; `AssistantMessage` is the entry kept in the transcript. Incoming
//! ids are a monotonic backend sequence transmitted as strings (or, from
//! older workflows, numbers) to avoid precision loss.

use crate::record::Attachment;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Represents the author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message produced by the assistant (or synthesized on its behalf).
    Assistant,
}

/// A single entry of the assistant console transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// A message pushed by the backend, fetched via the incoming-message poll.
///
/// Entries with `status == "processing"` represent a not-yet-finalized
/// assistant turn and must be neither persisted nor merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Epoch milliseconds.
    #[serde(default, deserialize_with = "millis_as_i64")]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl IncomingMessage {
    /// True when this entry marks an in-progress assistant turn.
    pub fn is_processing(&self) -> bool {
        self.status.as_deref() == Some("processing")
    }

    /// Converts the wire shape into a transcript entry.
    pub fn into_assistant_message(self) -> AssistantMessage {
        AssistantMessage {
            id: self.id,
            role: MessageRole::Assistant,
            content: self.text,
            attachments: self.attachments,
            timestamp: self.timestamp,
        }
    }
}

/// A finished assistant reply as returned by the send path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssistantReply {
    pub text: String,
    pub attachments: Option<Vec<Attachment>>,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn millis_as_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| {
            n.as_f64().map(|f| f as i64).unwrap_or(0)
        }),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    })
}
