use std::collections::HashMap;

use async_trait::async_trait;
use mediator_core::ConnectionRecord;
use tokio::sync::Mutex;

use crate::{Store, StoreResult};

/// An in-memory backend, used in unit tests and whenever `ENABLE_STORE` is
/// unset. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    connections: Mutex<HashMap<String, ConnectionRecord>>,
    agent_key: Mutex<Option<String>>,
    mediator_key: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn store_connection(&self, verkey: &str, record: ConnectionRecord) -> StoreResult<()> {
        self.connections.lock().await.insert(verkey.to_string(), record);
        Ok(())
    }

    async fn retrieve_connections(&self) -> StoreResult<Vec<ConnectionRecord>> {
        Ok(self.connections.lock().await.values().cloned().collect())
    }

    async fn store_agent_key(&self, verkey: &str) -> StoreResult<()> {
        *self.agent_key.lock().await = Some(verkey.to_string());
        Ok(())
    }

    async fn retrieve_agent_key(&self) -> StoreResult<Option<String>> {
        Ok(self.agent_key.lock().await.clone())
    }

    async fn store_mediator_key(&self, verkey: &str) -> StoreResult<()> {
        *self.mediator_key.lock().await = Some(verkey.to_string());
        Ok(())
    }

    async fn retrieve_mediator_key(&self) -> StoreResult<Option<String>> {
        Ok(self.mediator_key.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_insert_overwrites() {
        let store = MemoryStore::new();
        let record_a = sample_record("stateA");
        let record_b = sample_record("stateB");

        store.store_connection("verkey1", record_a).await.unwrap();
        store.store_connection("verkey1", record_b).await.unwrap();

        let all = store.retrieve_connections().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn distinguished_keys_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.retrieve_agent_key().await.unwrap(), None);

        store.store_agent_key("agent-verkey").await.unwrap();
        store.store_mediator_key("mediator-verkey").await.unwrap();

        assert_eq!(store.retrieve_agent_key().await.unwrap(), Some("agent-verkey".into()));
        assert_eq!(store.retrieve_mediator_key().await.unwrap(), Some("mediator-verkey".into()));
    }

    fn sample_record(state_tag: &str) -> ConnectionRecord {
        serde_json::from_value(serde_json::json!({
            "state": "null",
            "multiuse": false,
            "invitation_key": null,
            "did": state_tag,
            "verkey": "verkey1",
            "sigkey": "sigkey1",
            "target": null,
            "diddoc": null,
        }))
        .unwrap()
    }
}
