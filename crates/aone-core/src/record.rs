//! Domain record types.
//!
//! Backend records are open maps: a small set of required keys per type
//! (`id` everywhere, `stageId` for board records) plus arbitrary extra
//! fields that must round-trip untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An open record as returned by the backend: unknown fields preserved.
pub type RecordObject = Map<String, Value>;

/// Reads a record's `id` coerced to a string (ids arrive as strings or
/// numbers depending on the backend workflow).
pub fn record_id(record: &RecordObject) -> Option<String> {
    match record.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a record's `stageId` as a string.
pub fn record_stage_id(record: &RecordObject) -> Option<String> {
    match record.get("stageId") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// A named step in a kanban-style pipeline (lead/deal/invoice progression).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub order: i64,
}

/// The hardcoded default pipeline, used when the backend returns no stages
/// and merged into whatever it does return.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage {
            id: "new".to_string(),
            title: "Новая".to_string(),
            order: 0,
        },
        Stage {
            id: "negotiation".to_string(),
            title: "Переговоры".to_string(),
            order: 1,
        },
        Stage {
            id: "won".to_string(),
            title: "Выиграна".to_string(),
            order: 2,
        },
        Stage {
            id: "lost".to_string(),
            title: "Проиграна".to_string(),
            order: 3,
        },
    ]
}

/// An OPS task row (fields assigned by the backend workflow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub status: String,
    /// Arrives as a number or a string depending on the workflow.
    #[serde(default)]
    pub step_index: Value,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A file/image reference attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// "image", "file", "chart" or "sticker"; kept open for new kinds.
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A chat channel from `getChatData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChannel {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "isGeneral")]
    pub is_general: bool,
}

/// A chat user from `getChatData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A message inside a team chat channel or direct conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "chatId")]
    pub chat_id: String,
    /// "channel" or "user".
    #[serde(default, rename = "chatType")]
    pub chat_type: String,
    #[serde(default, rename = "senderId")]
    pub sender_id: String,
    #[serde(default, rename = "senderName")]
    pub sender_name: String,
    #[serde(default)]
    pub text: String,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, rename = "isOwn")]
    pub is_own: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_string_and_number() {
        let mut record = RecordObject::new();
        record.insert("id".to_string(), json!("42"));
        assert_eq!(record_id(&record), Some("42".to_string()));

        record.insert("id".to_string(), json!(42));
        assert_eq!(record_id(&record), Some("42".to_string()));

        record.insert("id".to_string(), json!(""));
        assert_eq!(record_id(&record), None);
    }

    #[test]
    fn test_task_roundtrips_unknown_fields() {
        let raw = json!({
            "id": "t1",
            "task_type": "call",
            "domain": "sales",
            "status": "new",
            "step_index": 2,
            "created_at": "2025-01-01T10:00:00Z",
            "assignee": "maria",
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.extra.get("assignee"), Some(&json!("maria")));

        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back.get("assignee"), Some(&json!("maria")));
    }

    #[test]
    fn test_default_stage_order() {
        let stages = default_stages();
        assert_eq!(stages.len(), 4);
        assert!(stages.windows(2).all(|w| w[0].order < w[1].order));
    }
}
