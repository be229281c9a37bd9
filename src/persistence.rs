use std::sync::Arc;

use eyre::Result;
use mediator_core::Registry;
use store::{MemoryStore, SqlxStore, Store, StoreResult};
use tracing::info;

use crate::config::Settings;

/// Thin wrapper directing registry snapshots at whichever backend this
/// process was configured with. `REPO_KEY` is accepted (see `Settings`) but
/// unused here; see `store`'s crate docs for why.
pub struct Persistence {
    backend: Arc<dyn Store>,
}

impl Persistence {
    /// `None` when `ENABLE_STORE` is unset: the registry is then purely
    /// in-memory for the life of the process, matching the teacher's
    /// behavior when no repo is configured.
    pub async fn open(settings: &Settings) -> Result<Option<Arc<Self>>> {
        if !settings.enable_store {
            return Ok(None);
        }
        let repo_uri = settings.repo_uri.as_deref().expect("checked in Settings::from_env");
        info!(repo_uri, "opening persistent connection store");
        let backend = SqlxStore::connect(repo_uri).await?;
        Ok(Some(Arc::new(Self {
            backend: Arc::new(backend),
        })))
    }

    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self {
            backend: Arc::new(MemoryStore::new()),
        })
    }

    /// Writes every connection currently in `registry`, plus the two
    /// distinguished identifiers, in one logical batch (the backend's own
    /// transaction scope, see `store`'s `SqlxStore`/`MemoryStore`).
    pub async fn save(&self, registry: &Registry) -> StoreResult<()> {
        for record in registry.snapshot().await {
            self.backend.store_connection(&record.verkey, record).await?;
        }
        if let Some(verkey) = registry.agent_connection_verkey().await {
            self.backend.store_agent_key(&verkey).await?;
        }
        if let Some(verkey) = registry.mediator_connection_verkey().await {
            self.backend.store_mediator_key(&verkey).await?;
        }
        Ok(())
    }

    /// Restores every stored connection plus the two distinguished
    /// identifiers into `registry`. Called once at startup, before the
    /// bootstrap sequence decides what still needs establishing.
    pub async fn restore(&self, registry: &Registry) -> StoreResult<()> {
        let records = self.backend.retrieve_connections().await?;
        let recalled = !records.is_empty();
        registry.restore(records).await?;

        if let Some(verkey) = self.backend.retrieve_agent_key().await? {
            registry.set_agent_connection(verkey).await;
        }
        if let Some(verkey) = self.backend.retrieve_mediator_key().await? {
            registry.set_mediator_connection(verkey).await;
        }
        if recalled {
            info!("recalled connections from store");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediator_core::Connection;

    #[tokio::test]
    async fn save_then_restore_round_trips_connections_and_distinguished_keys() {
        let persistence = Persistence::in_memory();

        let registry = Registry::new();
        let mediator = Connection::random().unwrap();
        let mediator_verkey = mediator.verkey_b58();
        registry.register(mediator).await;
        registry.set_mediator_connection(mediator_verkey.clone()).await;

        let agent = Connection::random().unwrap();
        let agent_verkey = agent.verkey_b58();
        registry.register(agent).await;
        registry.set_agent_connection(agent_verkey.clone()).await;

        persistence.save(&registry).await.unwrap();

        let restored = Registry::new();
        persistence.restore(&restored).await.unwrap();

        assert_eq!(restored.mediator_connection_verkey().await, Some(mediator_verkey.clone()));
        assert_eq!(restored.agent_connection_verkey().await, Some(agent_verkey.clone()));
        assert!(restored.get_and(&mediator_verkey, |_| ()).await.is_some());
        assert!(restored.get_and(&agent_verkey, |_| ()).await.is_some());
    }

    #[tokio::test]
    async fn restore_on_empty_store_leaves_registry_untouched() {
        let persistence = Persistence::in_memory();
        let registry = Registry::new();

        persistence.restore(&registry).await.unwrap();

        assert!(registry.mediator_connection_verkey().await.is_none());
        assert!(registry.agent_connection_verkey().await.is_none());
    }
}
