//! The session contract the callback pipeline is threaded through.
//!
//! The session is treated as an explicit value rather than an ambient store:
//! the orchestrator reads the stored login attempt at entry, writes the
//! authenticated identity at specific named points, and persists every batch
//! of mutations with [`Session::save`] before the next stage proceeds.
//!
//! Contract with the login-initiation step (out of scope here): when a login
//! is initiated for provider `p`, the initiator generates a state token of
//! the form `p_<randomSuffix>`, stores it in the session under the key
//! returned by [`attempt_key`], and sends the user to the provider's
//! authorize endpoint with that token as the `state` parameter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DomainErrorKind, Error, InternalErrorKind};

/// Session key holding the provider-returned profile record.
pub const USER_KEY: &str = "user";
/// Session key holding the token-endpoint response.
pub const TOKEN_KEY: &str = "token";
/// Session key holding the provider key the user authenticated through.
pub const CURRENT_SERVICE_PROVIDER_KEY: &str = "currentServiceProvider";
/// Session key holding the destination to resume after login, if any.
pub const FROM_URL_KEY: &str = "fromUrl";

/// Session key under which the login-initiation step stores the state token
/// for `provider_key`.
pub fn attempt_key(provider_key: &str) -> String {
    format!("{provider_key}_key")
}

/// Per-user mutable key-value store supplied by the caller.
///
/// `save` is the durability point: implementations must resolve only once
/// the backing store has committed all prior mutations.
#[async_trait]
pub trait Session: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn insert(&self, key: &str, value: Value) -> Result<(), Error>;

    /// Removes and returns the value stored under `key`, if any.
    async fn remove(&self, key: &str) -> Result<Option<Value>, Error>;

    /// Durably persists all mutations made so far.
    async fn save(&self) -> Result<(), Error>;
}

/// In-memory [`Session`] used by tests and by embedders that manage
/// persistence themselves. Tracks how often `save` was called so ordering
/// guarantees around persistence can be asserted.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, Value>>,
    saves: AtomicUsize,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `save` has been awaited on this session.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    async fn insert(&self, key: &str, value: Value) -> Result<(), Error> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.values.lock().unwrap().remove(key))
    }

    async fn save(&self) -> Result<(), Error> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Translates a session backend failure into a domain error.
pub fn session_error(source: Box<dyn std::error::Error + Send + Sync>) -> Error {
    Error {
        source: Some(source),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Session),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attempt_key_format() {
        assert_eq!(attempt_key("aprofiel"), "aprofiel_key");
    }

    #[tokio::test]
    async fn test_memory_session_round_trip() {
        let session = MemorySession::new();
        session.insert(USER_KEY, json!({"name": "jane"})).await.unwrap();

        assert_eq!(
            session.get(USER_KEY).await,
            Some(json!({"name": "jane"}))
        );
        assert_eq!(
            session.remove(USER_KEY).await.unwrap(),
            Some(json!({"name": "jane"}))
        );
        assert_eq!(session.get(USER_KEY).await, None);
    }

    #[tokio::test]
    async fn test_memory_session_counts_saves() {
        let session = MemorySession::new();
        assert_eq!(session.save_count(), 0);

        session.save().await.unwrap();
        session.save().await.unwrap();
        assert_eq!(session.save_count(), 2);
    }
}
