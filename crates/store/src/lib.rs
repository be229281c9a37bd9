//! Persistence for connections and the two distinguished identifiers
//! (`agent`, `mediator`). The contract is the original's `store.py`
//! flattened to two backends: an in-memory one for tests and
//! `ENABLE_STORE`-unset deployments, and a `sqlx`-backed one for
//! `sqlite:`/`postgres:` `REPO_URI`s.
//!
//! `REPO_KEY` is accepted but, unlike the original's askar-backed wallet
//! encryption, is not used to encrypt the backing store in this
//! implementation: the persistent key/connection store's encryption-at-rest
//! guarantee is out of scope here (see `SPEC_FULL.md` §1) and is expected to
//! be provided by the deployment (disk encryption, a managed DB) rather than
//! by this crate re-implementing Argon2i-derived wallet keys.

mod memory;
mod sqlx_store;

pub use memory::MemoryStore;
pub use sqlx_store::SqlxStore;

use async_trait::async_trait;
use mediator_core::ConnectionRecord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("not found")]
    NotFound,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn store_connection(&self, verkey: &str, record: ConnectionRecord) -> StoreResult<()>;
    async fn retrieve_connections(&self) -> StoreResult<Vec<ConnectionRecord>>;

    async fn store_agent_key(&self, verkey: &str) -> StoreResult<()>;
    async fn retrieve_agent_key(&self) -> StoreResult<Option<String>>;

    async fn store_mediator_key(&self, verkey: &str) -> StoreResult<()>;
    async fn retrieve_mediator_key(&self) -> StoreResult<Option<String>>;
}

impl From<mediator_core::CoreError> for StoreError {
    fn from(e: mediator_core::CoreError) -> Self {
        StoreError::Backend(e.to_string())
    }
}
