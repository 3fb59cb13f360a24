//! Short-lived, single-use storage for the values that must survive the round trip
//! through the identity provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::error::{store_error, Error};

/// The two values kept between the login redirect and the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    PkceVerifier,
    AuthState,
}

impl StoreKey {
    /// Storage name for the key, also used as the cookie name by cookie-backed stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::PkceVerifier => "pkce_verifier",
            StoreKey::AuthState => "auth_state",
        }
    }
}

/// Per-browser storage with a consume-on-read contract.
///
/// A stored value can be read back at most once: `retrieve_and_consume` always
/// deletes the entry, and deleting an absent entry is a no-op.
pub trait EphemeralStore {
    /// Persist `value` under `key`, replacing any previous value.
    fn store(&self, key: StoreKey, value: &str) -> Result<(), Error>;

    /// Return the value stored under `key`, if any, and delete it.
    fn retrieve_and_consume(&self, key: StoreKey) -> Result<Option<String>, Error>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Server-side [`EphemeralStore`] holding one browser's entries in memory.
///
/// Entries expire after the configured TTL (default 10 minutes) whether or not they are read.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<StoreKey, Entry>>>,
    ttl: Duration,
}

impl MemoryStore {
    /// Create a new store with default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a new store with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralStore for MemoryStore {
    /// Also drops any entries whose TTL has elapsed.
    fn store(&self, key: StoreKey, value: &str) -> Result<(), Error> {
        let now = Utc::now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| store_error("memory store lock poisoned"))?;

        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            Entry {
                value: value.to_string(),
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    fn retrieve_and_consume(&self, key: StoreKey) -> Result<Option<String>, Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| store_error("memory store lock poisoned"))?;

        Ok(entries
            .remove(&key)
            .filter(|entry| Utc::now() <= entry.expires_at)
            .map(|entry| entry.value))
    }
}
