//! Credential Persistence
//!
//! The client-local credential contract: a token string and a serialized
//! user profile, stored under two fixed keys, read on startup to decide
//! authenticated status and cleared on logout.
//!
//! The [`KeyValueStore`] seam keeps the storage mechanics out of scope: a
//! browser shell maps it onto local storage, tests and headless runs use
//! [`MemoryStore`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::gateway::UserProfile;

/// Fixed key for the credential token
pub const TOKEN_KEY: &str = "authToken";

/// Fixed key for the serialized user profile
pub const PROFILE_KEY: &str = "user";

/// Minimal synchronous key/value contract for client-local persistence
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value
    fn set(&self, key: &str, value: &str);
    /// Delete a value
    fn remove(&self, key: &str);
}

/// In-memory store, empty at startup
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }
}

/// The persisted credential pair: token plus profile
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Create over an arbitrary backing store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Create over a fresh in-memory store
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The persisted token, if any
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY)
    }

    /// The persisted profile. A corrupt stored blob reads as absent.
    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        let raw = self.store.get(PROFILE_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    /// Persist the token and profile together
    pub fn persist(&self, token: &str, profile: &UserProfile) {
        self.store.set(TOKEN_KEY, token);
        match serde_json::to_string(profile) {
            Ok(raw) => self.store.set(PROFILE_KEY, &raw),
            Err(error) => {
                tracing::warn!(%error, "failed to serialize user profile");
            }
        }
    }

    /// Remove both values
    pub fn clear(&self) {
        self.store.remove(TOKEN_KEY);
        self.store.remove(PROFILE_KEY);
    }

    /// Whether a token is currently persisted. One synchronous read, so
    /// the answer cannot be torn across suspension points.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let store = CredentialStore::in_memory();
        assert!(store.token().is_none());
        assert!(store.profile().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_persist_and_clear() {
        let store = CredentialStore::in_memory();
        let profile = UserProfile {
            name: Some("Ada".to_string()),
            email: Some("ada@campus.edu".to_string()),
            token: Some("T".to_string()),
            ..UserProfile::default()
        };

        store.persist("T", &profile);
        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("T"));
        assert_eq!(store.profile().unwrap().name.as_deref(), Some("Ada"));

        store.clear();
        assert!(!store.is_authenticated());
        assert!(store.profile().is_none());
    }

    #[test]
    fn test_corrupt_profile_reads_as_absent() {
        let backing = Arc::new(MemoryStore::new());
        backing.set(PROFILE_KEY, "{not json");
        let store = CredentialStore::new(backing);
        assert!(store.profile().is_none());
    }
}
