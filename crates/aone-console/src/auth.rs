//! Login/logout flow and persisted auth state.
//!
//! A successful login installs the session triple into the shared store and
//! writes a small JSON file so the next start can restore the session
//! without re-authenticating. Logout clears both.

use anyhow::{Context, Result as IoResult};
use aone_core::error::{AoneError, Result};
use aone_core::session::SessionStore;
use aone_webhook::api::WebhookApi;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const AUTH_FILE: &str = "auth.json";

/// Persisted authentication state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAuth {
    pub token: String,
    pub email: String,
    pub company_id: String,
}

/// Drives the login lifecycle against the webhook.
pub struct AuthService {
    api: WebhookApi,
    session: SessionStore,
    base_dir: PathBuf,
}

impl AuthService {
    /// Creates the service with auth state stored under `base_dir`.
    pub fn new(
        api: WebhookApi,
        session: SessionStore,
        base_dir: impl AsRef<Path>,
    ) -> IoResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).context("Failed to create auth directory")?;
        Ok(Self {
            api,
            session,
            base_dir,
        })
    }

    /// Creates the service at the default location (~/.aone).
    pub fn default_location(api: WebhookApi, session: SessionStore) -> IoResult<Self> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        Self::new(api, session, home_dir.join(".aone"))
    }

    /// Authenticates against the webhook. On access the session is installed
    /// (the backend may omit the token and company id; the observed defaults
    /// apply) and persisted. A rejected login is reported back to the
    /// backend best-effort and surfaces as an auth error.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let outcome = self.api.login(email, password).await?;
        if !outcome.access {
            if let Err(e) = self.api.report_failed_login(email).await {
                tracing::debug!("[Auth] Failed-login report not delivered: {}", e);
            }
            return Err(AoneError::auth("Неверный логин или пароль"));
        }

        let token = outcome.token.unwrap_or_else(|| "ok".to_string());
        let company_id = outcome.company_id.unwrap_or_default();
        self.session.set(&company_id, &token, email);

        let stored = StoredAuth {
            token,
            email: email.to_string(),
            company_id,
        };
        if let Err(e) = self.save_stored(&stored) {
            tracing::warn!("[Auth] Failed to persist auth state: {}", e);
        }
        Ok(())
    }

    /// Restores a persisted session, if a complete one exists. Returns true
    /// when a session was installed.
    pub fn restore(&self) -> bool {
        match self.load_stored() {
            Some(stored)
                if !stored.token.is_empty()
                    && !stored.email.is_empty() =>
            {
                self.session
                    .set(&stored.company_id, &stored.token, &stored.email);
                true
            }
            _ => {
                self.session.clear();
                false
            }
        }
    }

    /// Clears the in-memory session and the persisted auth state.
    pub fn logout(&self) {
        self.session.clear();
        let path = self.auth_path();
        if path.exists()
            && let Err(e) = fs::remove_file(&path)
        {
            tracing::warn!("[Auth] Failed to remove auth file: {}", e);
        }
    }

    fn save_stored(&self, stored: &StoredAuth) -> IoResult<()> {
        let json = serde_json::to_string_pretty(stored).context("Failed to serialize auth")?;
        fs::write(self.auth_path(), json).context("Failed to write auth file")?;
        Ok(())
    }

    fn load_stored(&self) -> Option<StoredAuth> {
        let json = fs::read_to_string(self.auth_path()).ok()?;
        serde_json::from_str(&json).ok()
    }

    fn auth_path(&self) -> PathBuf {
        self.base_dir.join(AUTH_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aone_core::config::WebhookConfig;
    use aone_webhook::transport::WebhookTransport;
    use tempfile::TempDir;

    fn service(temp_dir: &TempDir) -> (AuthService, SessionStore) {
        let session = SessionStore::new();
        let transport = WebhookTransport::new(WebhookConfig::default(), session.clone());
        let api = WebhookApi::new(transport);
        let service = AuthService::new(api, session.clone(), temp_dir.path()).unwrap();
        (service, session)
    }

    #[test]
    fn test_restore_without_file_clears_session() {
        let temp_dir = TempDir::new().unwrap();
        let (service, session) = service(&temp_dir);
        session.set("stale", "stale", "stale@example.com");

        assert!(!service.restore());
        assert!(session.get().is_none());
    }

    #[test]
    fn test_restore_from_persisted_auth() {
        let temp_dir = TempDir::new().unwrap();
        let (service, session) = service(&temp_dir);

        let stored = StoredAuth {
            token: "t-123".to_string(),
            email: "user@example.com".to_string(),
            company_id: "c-9".to_string(),
        };
        service.save_stored(&stored).unwrap();

        assert!(service.restore());
        let restored = session.get().unwrap();
        assert_eq!(restored.token, "t-123");
        assert_eq!(restored.company_id, "c-9");
        assert_eq!(restored.user_id, "user@example.com");
    }

    #[test]
    fn test_incomplete_auth_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (service, session) = service(&temp_dir);

        let stored = StoredAuth {
            token: String::new(),
            email: "user@example.com".to_string(),
            company_id: "c".to_string(),
        };
        service.save_stored(&stored).unwrap();

        assert!(!service.restore());
        assert!(session.get().is_none());
    }

    #[test]
    fn test_logout_clears_session_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let (service, session) = service(&temp_dir);

        let stored = StoredAuth {
            token: "t".to_string(),
            email: "e@example.com".to_string(),
            company_id: "c".to_string(),
        };
        service.save_stored(&stored).unwrap();
        assert!(service.restore());

        service.logout();
        assert!(session.get().is_none());
        assert!(!service.restore());
    }
}
