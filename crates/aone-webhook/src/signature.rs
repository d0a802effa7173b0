//! HMAC signing of webhook requests and responses.
//!
//! payload → body_b64, signing_string = "{timestamp}.{nonce}.{body_b64}",
//! signature = base64(HMAC-SHA256(secret, signing_string)). The same scheme
//! is used in both directions; this layer proves integrity and authenticity,
//! not recency (no clock-skew window is enforced here).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Wire form of a signed request: the body plus its three companion headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// base64 of the UTF-8 JSON of the payload.
    pub body_b64: String,
    /// Unix time in seconds at signing.
    pub timestamp: i64,
    /// Fresh random UUID per call; never reused.
    pub nonce: String,
    /// base64 HMAC-SHA256 over the signing string.
    pub signature: String,
}

fn hmac_sha256_base64(secret: &str, message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    BASE64_STANDARD.encode(mac.finalize().into_bytes())
}

/// Signs a payload for sending: `body_b64` plus timestamp/nonce/signature
/// headers.
pub fn sign_envelope(secret: &str, payload: &Value) -> SignedEnvelope {
    let body_b64 = BASE64_STANDARD.encode(payload.to_string().as_bytes());
    let timestamp = chrono::Utc::now().timestamp();
    let nonce = Uuid::new_v4().to_string();
    let signing_string = format!("{timestamp}.{nonce}.{body_b64}");
    let signature = hmac_sha256_base64(secret, &signing_string);
    SignedEnvelope {
        body_b64,
        timestamp,
        nonce,
        signature,
    }
}

/// Verifies a signed response and returns the decoded payload; `None` on any
/// mismatch or decode failure. Callers fall back to treating the response as
/// unverified rather than failing the request.
pub fn verify_signed_response(
    secret: &str,
    body_b64: &str,
    timestamp: &str,
    nonce: &str,
    signature: &str,
) -> Option<Value> {
    let Ok(signature_bytes) = BASE64_STANDARD.decode(signature.trim()) else {
        return None;
    };
    let signing_string = format!("{timestamp}.{nonce}.{body_b64}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(signing_string.as_bytes());
    if mac.verify_slice(&signature_bytes).is_err() {
        return None;
    }
    let decoded = BASE64_STANDARD.decode(body_b64).ok()?;
    let json = String::from_utf8(decoded).ok()?;
    serde_json::from_str(&json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sign_verify_round_trip() {
        let payload = json!({"action": "getLeads", "company_id": "c1", "token": "t"});
        let signed = sign_envelope("shared-secret", &payload);

        let recovered = verify_signed_response(
            "shared-secret",
            &signed.body_b64,
            &signed.timestamp.to_string(),
            &signed.nonce,
            &signed.signature,
        );
        assert_eq!(recovered, Some(payload));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = json!({"hello": "world"});
        let signed = sign_envelope("secret-one", &payload);

        let recovered = verify_signed_response(
            "secret-two",
            &signed.body_b64,
            &signed.timestamp.to_string(),
            &signed.nonce,
            &signed.signature,
        );
        assert_eq!(recovered, None);
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signed = sign_envelope("s", &json!({"amount": 100}));
        let tampered = BASE64_STANDARD.encode(json!({"amount": 99999}).to_string());

        let recovered = verify_signed_response(
            "s",
            &tampered,
            &signed.timestamp.to_string(),
            &signed.nonce,
            &signed.signature,
        );
        assert_eq!(recovered, None);
    }

    #[test]
    fn test_tampered_nonce_rejected() {
        let signed = sign_envelope("s", &json!({"a": 1}));
        let recovered = verify_signed_response(
            "s",
            &signed.body_b64,
            &signed.timestamp.to_string(),
            "00000000-0000-0000-0000-000000000000",
            &signed.signature,
        );
        assert_eq!(recovered, None);
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let signed = sign_envelope("s", &json!({"a": 1}));
        let recovered = verify_signed_response(
            "s",
            &signed.body_b64,
            &signed.timestamp.to_string(),
            &signed.nonce,
            "%%% not base64 %%%",
        );
        assert_eq!(recovered, None);
    }

    #[test]
    fn test_nonces_are_fresh() {
        let payload = json!({"a": 1});
        let first = sign_envelope("s", &payload);
        let second = sign_envelope("s", &payload);
        assert_ne!(first.nonce, second.nonce);
    }
}
