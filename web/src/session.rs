//! tower-sessions adapter for the domain session contract.

use async_trait::async_trait;
use domain::error::Error;
use domain::session::{session_error, Session};
use log::*;
use serde_json::Value;

/// Wraps the extracted `tower_sessions::Session` so the domain pipeline can
/// read, mutate and persist it through its own [`Session`] trait.
pub struct WebSession(pub tower_sessions::Session);

#[async_trait]
impl Session for WebSession {
    async fn get(&self, key: &str) -> Option<Value> {
        match self.0.get::<Value>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read session key {key}: {e:?}");
                None
            }
        }
    }

    async fn insert(&self, key: &str, value: Value) -> Result<(), Error> {
        self.0
            .insert(key, value)
            .await
            .map_err(|e| session_error(Box::new(e)))
    }

    async fn remove(&self, key: &str) -> Result<Option<Value>, Error> {
        self.0
            .remove::<Value>(key)
            .await
            .map_err(|e| session_error(Box::new(e)))
    }

    async fn save(&self) -> Result<(), Error> {
        self.0
            .save()
            .await
            .map_err(|e| session_error(Box::new(e)))
    }
}
