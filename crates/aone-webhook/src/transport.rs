//! Generic webhook transport.
//!
//! One HTTP POST endpoint, routing by the `action` field in the request
//! body. Every request except the public actions carries the session
//! triple (company_id, token, user_id). With a configured secret the
//! envelope travels as `{body_b64}` plus signature headers; responses are
//! verified and unwrapped the same way.

use crate::signature::{sign_envelope, verify_signed_response};
use aone_core::config::WebhookConfig;
use aone_core::error::{AoneError, Result};
use aone_core::session::SessionStore;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

pub const HEADER_TIMESTAMP: &str = "X-Timestamp";
pub const HEADER_NONCE: &str = "X-Nonce";
pub const HEADER_SIGNATURE: &str = "X-Signature";

/// Actions that never carry session credentials.
const PUBLIC_ACTIONS: [&str; 3] = ["login", "requestDemo", "reportFailedLogin"];

/// Client for the single webhook endpoint.
///
/// Holds the HTTP client, the resolved configuration and the shared session
/// store; cheap to clone.
#[derive(Clone)]
pub struct WebhookTransport {
    client: Client,
    config: WebhookConfig,
    session: SessionStore,
}

impl WebhookTransport {
    /// Creates a transport over the given configuration and session store.
    pub fn new(config: WebhookConfig, session: SessionStore) -> Self {
        Self {
            client: Client::new(),
            config,
            session,
        }
    }

    /// Returns the session store this transport reads on every request.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Returns the resolved configuration.
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Builds the request envelope for an action.
    ///
    /// Public actions (`login`, `requestDemo`, `reportFailedLogin`) never
    /// carry session fields, even when a session is installed.
    pub fn build_envelope(&self, action: &str, payload: Option<Value>) -> Value {
        let mut body = json!({ "action": action });
        if let Some(payload) = payload {
            body["payload"] = payload;
        }
        if !PUBLIC_ACTIONS.contains(&action)
            && let Some(session) = self.session.get()
        {
            body["company_id"] = Value::String(session.company_id);
            body["token"] = Value::String(session.token);
            body["user_id"] = Value::String(session.user_id);
        }
        body
    }

    /// Sends an action envelope and returns the (possibly unwrapped)
    /// response value.
    pub async fn send(&self, action: &str, payload: Option<Value>) -> Result<Value> {
        let body = self.build_envelope(action, payload);
        self.post(body).await
    }

    /// Sends a pre-built body as-is. Used by the assistant console, whose
    /// free-form message envelope has no `action` field.
    pub async fn send_raw(&self, mut body: Value) -> Result<Value> {
        if let Some(session) = self.session.get()
            && let Some(map) = body.as_object_mut()
        {
            map.insert("company_id".to_string(), Value::String(session.company_id));
            map.insert("token".to_string(), Value::String(session.token));
            map.insert("user_id".to_string(), Value::String(session.user_id));
        }
        self.post(body).await
    }

    async fn post(&self, body: Value) -> Result<Value> {
        let mut request = self
            .client
            .post(&self.config.webhook_url)
            .timeout(Duration::from_secs(self.config.timeout_secs));

        if self.config.signing_enabled() {
            let signed = sign_envelope(&self.config.secret, &body);
            request = request
                .header(HEADER_TIMESTAMP, signed.timestamp.to_string())
                .header(HEADER_NONCE, signed.nonce.as_str())
                .header(HEADER_SIGNATURE, signed.signature.as_str())
                .json(&json!({ "body_b64": signed.body_b64 }));
        } else {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AoneError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AoneError::status(status.as_u16()));
        }

        let timestamp = header_string(&response, HEADER_TIMESTAMP);
        let nonce = header_string(&response, HEADER_NONCE);
        let signature = header_string(&response, HEADER_SIGNATURE);

        let text = response
            .text()
            .await
            .map_err(|e| AoneError::transport(e.to_string()))?;

        // A body that does not parse is an empty successful result, not an
        // error; read paths must stay tolerant of a flaky integration.
        let parsed: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!({}));

        if self.config.signing_enabled()
            && let Some(body_b64) = parsed.get("body_b64").and_then(Value::as_str)
        {
            match verify_signed_response(
                &self.config.secret,
                body_b64,
                timestamp.as_deref().unwrap_or(""),
                nonce.as_deref().unwrap_or(""),
                signature.as_deref().unwrap_or(""),
            ) {
                Some(inner) => return Ok(inner),
                None => {
                    tracing::warn!(
                        "[Webhook] Response signature verification failed, \
                         falling back to unverified body"
                    );
                }
            }
        }

        Ok(parsed)
    }
}

fn header_string(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
