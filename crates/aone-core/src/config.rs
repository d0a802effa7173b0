//! Webhook client configuration.
//!
//! Sources, in precedence order: explicit overrides set by the embedding
//! application, environment variables (`AONE_WEBHOOK_URL`,
//! `AONE_WEBHOOK_SECRET`), the config file (~/.config/aone/config.toml),
//! built-in defaults. An empty secret disables request signing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_WEBHOOK_URL: &str = "/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 4;

/// Runtime configuration for the webhook transport and poll loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Base URL of the single webhook endpoint (no trailing slash).
    pub webhook_url: String,
    /// HMAC shared secret; empty means unsigned requests.
    pub secret: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Incoming-message poll interval in seconds.
    pub poll_interval_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            secret: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

/// Optional fields as they appear in config.toml.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    webhook_url: Option<String>,
    secret: Option<String>,
    timeout_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
}

impl WebhookConfig {
    /// Loads the configuration from the default config file location and the
    /// environment.
    pub fn load() -> Self {
        let file = Self::config_path()
            .and_then(|path| Self::read_file(&path))
            .unwrap_or_default();
        Self::from_sources(
            file,
            std::env::var("AONE_WEBHOOK_URL").ok(),
            std::env::var("AONE_WEBHOOK_SECRET").ok(),
        )
    }

    /// Merges file values and environment overrides on top of the defaults.
    fn from_sources(file: FileConfig, env_url: Option<String>, env_secret: Option<String>) -> Self {
        let defaults = Self::default();
        let webhook_url = env_url
            .or(file.webhook_url)
            .unwrap_or(defaults.webhook_url);
        let secret = env_secret.or(file.secret).unwrap_or(defaults.secret);
        Self {
            webhook_url,
            secret,
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
            poll_interval_secs: file
                .poll_interval_secs
                .unwrap_or(defaults.poll_interval_secs),
        }
        .normalized()
    }

    /// Overrides the webhook URL (runtime injection takes precedence).
    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = url.into();
        self.normalized()
    }

    /// Overrides the signing secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Trims the trailing slash from the webhook URL.
    pub fn normalized(mut self) -> Self {
        while self.webhook_url.ends_with('/') && self.webhook_url.len() > 1 {
            self.webhook_url.pop();
        }
        self
    }

    /// Returns true when requests must be HMAC-signed.
    pub fn signing_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("aone").join("config.toml"))
    }

    fn read_file(path: &Path) -> Option<FileConfig> {
        let raw = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("[Config] Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WebhookConfig::default();
        assert_eq!(config.webhook_url, "/api");
        assert!(!config.signing_enabled());
        assert_eq!(config.poll_interval_secs, 4);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileConfig {
            webhook_url: Some("https://file.example.com/hook".to_string()),
            secret: Some("file-secret".to_string()),
            timeout_secs: Some(10),
            poll_interval_secs: None,
        };
        let config = WebhookConfig::from_sources(
            file,
            Some("https://env.example.com/hook/".to_string()),
            None,
        );
        assert_eq!(config.webhook_url, "https://env.example.com/hook");
        assert_eq!(config.secret, "file-secret");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.poll_interval_secs, 4);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = WebhookConfig::default().with_webhook_url("https://example.com/api/");
        assert_eq!(config.webhook_url, "https://example.com/api");
    }

    #[test]
    fn test_file_parse() {
        let raw = "webhook_url = \"https://n8n.example.com/webhook\"\nsecret = \"s3cret\"\n";
        let file: FileConfig = toml::from_str(raw).unwrap();
        let config = WebhookConfig::from_sources(file, None, None);
        assert_eq!(config.webhook_url, "https://n8n.example.com/webhook");
        assert!(config.signing_enabled());
    }
}
