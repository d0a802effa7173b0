//! Typed wrappers over the webhook actions.
//!
//! One method per backend action. Each list-returning method funnels the raw
//! response through the extractors in [`crate::extract`], so a misbehaving
//! workflow degrades to an empty view instead of an error.

use crate::extract::{extract_records, extract_stages, reconcile_stages};
use crate::transport::WebhookTransport;
use aone_core::error::Result;
use aone_core::message::IncomingMessage;
use aone_core::record::{ChatChannel, ChatMessage, ChatUser, RecordObject, Stage, Task};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Outcome of the `login` action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginOutcome {
    #[serde(default)]
    pub access: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
}

/// A demo-access request form.
#[derive(Debug, Clone, Serialize)]
pub struct DemoRequest {
    pub name: String,
    pub email: String,
    /// Where the requester heard about the product.
    pub source: String,
    pub region: String,
}

/// Decision returned for a demo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoDecision {
    Access,
    Deny,
}

/// Outcome of the `requestDemo` action.
#[derive(Debug, Clone)]
pub struct DemoOutcome {
    pub decision: DemoDecision,
    pub message: Option<String>,
}

/// Records plus their reconciled stage catalog, ready for a kanban board.
#[derive(Debug, Clone, Default)]
pub struct StageBoard {
    pub records: Vec<RecordObject>,
    pub stages: Vec<Stage>,
}

/// Channels and users available in the team chat.
#[derive(Debug, Clone, Default)]
pub struct ChatData {
    pub channels: Vec<ChatChannel>,
    pub users: Vec<ChatUser>,
}

/// Typed facade over the webhook transport.
#[derive(Clone)]
pub struct WebhookApi {
    transport: WebhookTransport,
}

impl WebhookApi {
    pub fn new(transport: WebhookTransport) -> Self {
        Self { transport }
    }

    /// The underlying transport (used by the assistant send path).
    pub fn transport(&self) -> &WebhookTransport {
        &self.transport
    }

    // ——— Authentication (session fields never attached) ———

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let raw = self
            .transport
            .send("login", Some(json!({ "email": email, "password": password })))
            .await?;
        Ok(serde_json::from_value(raw).unwrap_or_default())
    }

    pub async fn request_demo(&self, request: &DemoRequest) -> Result<DemoOutcome> {
        let raw = self
            .transport
            .send("requestDemo", Some(serde_json::to_value(request)?))
            .await?;
        // Older workflows answer under "result" instead of "access".
        let decision = raw
            .get("access")
            .or_else(|| raw.get("result"))
            .and_then(Value::as_str)
            .map(|text| {
                if text == "access" {
                    DemoDecision::Access
                } else {
                    DemoDecision::Deny
                }
            })
            .unwrap_or(DemoDecision::Deny);
        let message = raw
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(DemoOutcome { decision, message })
    }

    /// Best-effort report of a rejected login attempt.
    pub async fn report_failed_login(&self, email: &str) -> Result<()> {
        self.transport
            .send("reportFailedLogin", Some(json!({ "email": email })))
            .await?;
        Ok(())
    }

    // ——— OPS tasks ———

    pub async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let raw = self.transport.send("getTasks", None).await?;
        Ok(extract_records(&raw, "tasks")
            .into_iter()
            .filter_map(|record| serde_json::from_value(Value::Object(record)).ok())
            .collect())
    }

    // ——— Clients ———

    pub async fn fetch_clients(&self) -> Result<Vec<RecordObject>> {
        let raw = self.transport.send("getClients", None).await?;
        Ok(extract_records(&raw, "clients"))
    }

    pub async fn update_client(&self, client: RecordObject) -> Result<RecordObject> {
        self.update_record("updateClient", "client", client).await
    }

    // ——— Leads / deals / invoices (kanban boards) ———

    pub async fn fetch_leads(&self) -> Result<StageBoard> {
        self.fetch_board("getLeads", "leads").await
    }

    pub async fn update_lead(&self, lead: RecordObject) -> Result<RecordObject> {
        self.update_record("updateLead", "lead", lead).await
    }

    pub async fn fetch_deals(&self) -> Result<StageBoard> {
        self.fetch_board("getDeals", "deals").await
    }

    pub async fn update_deal(&self, deal: RecordObject) -> Result<RecordObject> {
        self.update_record("updateDeal", "deal", deal).await
    }

    pub async fn fetch_invoices(&self) -> Result<StageBoard> {
        self.fetch_board("getInvoices", "invoices").await
    }

    pub async fn update_invoice(&self, invoice: RecordObject) -> Result<RecordObject> {
        self.update_record("updateInvoice", "invoice", invoice).await
    }

    // ——— Dashboard and section blocks ———

    pub async fn fetch_dashboard(&self, template: &str) -> Result<Value> {
        let raw = self
            .transport
            .send("getDashboard", Some(json!({ "template": template })))
            .await?;
        Ok(ensure_object(raw))
    }

    pub async fn fetch_block_data(&self, view_id: &str) -> Result<Value> {
        let raw = self
            .transport
            .send("getBlockData", Some(json!({ "viewId": view_id })))
            .await?;
        Ok(ensure_object(raw))
    }

    // ——— Team chat ———

    pub async fn fetch_chat_data(&self) -> Result<ChatData> {
        let raw = self.transport.send("getChatData", None).await?;
        let channels = extract_records(&raw, "channels")
            .into_iter()
            .filter_map(|record| serde_json::from_value(Value::Object(record)).ok())
            .collect();
        let users = extract_records(&raw, "users")
            .into_iter()
            .filter_map(|record| serde_json::from_value(Value::Object(record)).ok())
            .collect();
        Ok(ChatData { channels, users })
    }

    pub async fn fetch_chat_messages(
        &self,
        chat_id: &str,
        chat_type: &str,
    ) -> Result<Vec<ChatMessage>> {
        let raw = self
            .transport
            .send(
                "getChatMessages",
                Some(json!({ "chatId": chat_id, "chatType": chat_type })),
            )
            .await?;
        Ok(extract_records(&raw, "messages")
            .into_iter()
            .filter_map(|record| serde_json::from_value(Value::Object(record)).ok())
            .collect())
    }

    pub async fn send_chat_message(
        &self,
        chat_id: &str,
        chat_type: &str,
        text: &str,
    ) -> Result<ChatMessage> {
        let raw = self
            .transport
            .send(
                "sendChatMessage",
                Some(json!({ "chatId": chat_id, "chatType": chat_type, "text": text })),
            )
            .await?;
        Ok(self.chat_message_or_echo(raw, chat_id, chat_type, text))
    }

    /// Uploads a file into a chat; the content travels base64-encoded inside
    /// the JSON envelope.
    pub async fn send_chat_file(
        &self,
        chat_id: &str,
        chat_type: &str,
        file_name: &str,
        mime_type: &str,
        data_b64: &str,
    ) -> Result<ChatMessage> {
        let raw = self
            .transport
            .send(
                "sendChatFile",
                Some(json!({
                    "chatId": chat_id,
                    "chatType": chat_type,
                    "fileName": file_name,
                    "mimeType": mime_type,
                    "data_b64": data_b64,
                })),
            )
            .await?;
        Ok(self.chat_message_or_echo(raw, chat_id, chat_type, file_name))
    }

    // ——— Company configuration ———

    pub async fn fetch_config(&self) -> Result<Value> {
        let raw = self.transport.send("getConfig", None).await?;
        Ok(ensure_object(raw))
    }

    pub async fn update_config(&self, config: &Value) -> Result<Value> {
        let raw = self
            .transport
            .send("updateConfig", Some(config.clone()))
            .await?;
        let updated = raw.get("config").cloned().unwrap_or(raw);
        Ok(if updated.is_object() {
            updated
        } else {
            config.clone()
        })
    }

    // ——— Assistant console: pushed incoming messages ———

    /// Fetches assistant-originated messages after the given cursor. The
    /// payload is omitted entirely when no cursor is known yet.
    pub async fn fetch_incoming_messages(
        &self,
        after_id: Option<&str>,
    ) -> Result<Vec<IncomingMessage>> {
        let payload = after_id.map(|id| json!({ "after_id": id }));
        let raw = self
            .transport
            .send("getCOOIncomingMessages", payload)
            .await?;
        Ok(extract_records(&raw, "messages")
            .into_iter()
            .filter_map(|record| serde_json::from_value(Value::Object(record)).ok())
            .collect())
    }

    // ——— Shared helpers ———

    async fn fetch_board(&self, action: &str, domain_key: &str) -> Result<StageBoard> {
        let raw = self.transport.send(action, None).await?;
        let records = extract_records(&raw, domain_key);
        let stages = reconcile_stages(&records, extract_stages(&raw));
        Ok(StageBoard { records, stages })
    }

    /// Sends an update action and unwraps the echoed record, falling back to
    /// the input when the backend echoes nothing usable.
    async fn update_record(
        &self,
        action: &str,
        wrapper_key: &str,
        record: RecordObject,
    ) -> Result<RecordObject> {
        let raw = self
            .transport
            .send(action, Some(Value::Object(record.clone())))
            .await?;
        let updated = raw
            .get(wrapper_key)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or(record);
        Ok(updated)
    }

    fn chat_message_or_echo(
        &self,
        raw: Value,
        chat_id: &str,
        chat_type: &str,
        text: &str,
    ) -> ChatMessage {
        raw.get("message")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_else(|| ChatMessage {
                id: uuid::Uuid::new_v4().to_string(),
                chat_id: chat_id.to_string(),
                chat_type: chat_type.to_string(),
                sender_id: String::new(),
                sender_name: String::new(),
                text: text.to_string(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                is_own: true,
                attachments: None,
                extra: Default::default(),
            })
    }
}

fn ensure_object(raw: Value) -> Value {
    if raw.is_object() { raw } else { json!({}) }
}
