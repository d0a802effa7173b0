//! Webhook session credentials.
//!
//! Every authenticated request carries the `(company_id, token, user_id)`
//! triple. `user_id` is the email used at login. The triple is installed once
//! per successful login and cleared on logout.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Credentials attached to every authenticated webhook request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub company_id: String,
    pub token: String,
    pub user_id: String,
}

/// Shared holder for the current session.
///
/// A single slot: the last `set` wins. Intended lifecycle is one `set` per
/// successful login and one `clear` per logout, with `get` read by the
/// transport on every outgoing request. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    /// Creates an empty store (no session installed).
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the session credentials, replacing any previous ones.
    pub fn set(
        &self,
        company_id: impl Into<String>,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) {
        let session = Session {
            company_id: company_id.into(),
            token: token.into(),
            user_id: user_id.into(),
        };
        *self.inner.write().unwrap() = Some(session);
    }

    /// Returns a copy of the current session, if one is installed.
    pub fn get(&self) -> Option<Session> {
        self.inner.read().unwrap().clone()
    }

    /// Removes the current session.
    pub fn clear(&self) {
        *self.inner.write().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let store = SessionStore::new();
        assert_eq!(store.get(), None);

        store.set("c1", "t1", "user@example.com");
        let session = store.get().unwrap();
        assert_eq!(session.company_id, "c1");
        assert_eq!(session.token, "t1");
        assert_eq!(session.user_id, "user@example.com");
    }

    #[test]
    fn test_last_set_wins() {
        let store = SessionStore::new();
        store.set("c1", "t1", "a@example.com");
        store.set("c2", "t2", "b@example.com");

        let session = store.get().unwrap();
        assert_eq!(session.company_id, "c2");
    }

    #[test]
    fn test_clear() {
        let store = SessionStore::new();
        store.set("c1", "t1", "a@example.com");
        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_clones_share_slot() {
        let store = SessionStore::new();
        let clone = store.clone();
        store.set("c1", "t1", "a@example.com");
        assert!(clone.get().is_some());
        clone.clear();
        assert_eq!(store.get(), None);
    }
}
