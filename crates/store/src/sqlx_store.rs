use async_trait::async_trait;
use mediator_core::ConnectionRecord;
use sqlx::{any::AnyPoolOptions, AnyPool, Row};

use crate::{Store, StoreError, StoreResult};

/// A `sqlx`-backed store for `REPO_URI`s of the form `sqlite://...` or
/// `postgres://...`. Uses `sqlx::Any` so the same queries serve either
/// backend, the way the original's `AskarStore.provision(repo_uri, ...)`
/// accepted one DSN shape for multiple wallet backends.
pub struct SqlxStore {
    pool: AnyPool,
}

impl SqlxStore {
    pub async fn connect(repo_uri: &str) -> StoreResult<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(repo_uri)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS connections (verkey TEXT PRIMARY KEY, record TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS identifiers (name TEXT PRIMARY KEY, verkey TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    async fn store_identifier(&self, name: &str, verkey: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM identifiers WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query("INSERT INTO identifiers (name, verkey) VALUES (?, ?)")
            .bind(name)
            .bind(verkey)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn retrieve_identifier(&self, name: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT verkey FROM identifiers WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(row.map(|r| r.get::<String, _>("verkey")))
    }
}

#[async_trait]
impl Store for SqlxStore {
    async fn store_connection(&self, verkey: &str, record: ConnectionRecord) -> StoreResult<()> {
        let json = serde_json::to_string(&record).map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query("DELETE FROM connections WHERE verkey = ?")
            .bind(verkey)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query("INSERT INTO connections (verkey, record) VALUES (?, ?)")
            .bind(verkey)
            .bind(json)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn retrieve_connections(&self) -> StoreResult<Vec<ConnectionRecord>> {
        let rows = sqlx::query("SELECT record FROM connections")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter()
            .map(|r| {
                let json: String = r.get("record");
                serde_json::from_str(&json).map_err(|e| StoreError::Backend(e.to_string()))
            })
            .collect()
    }

    async fn store_agent_key(&self, verkey: &str) -> StoreResult<()> {
        self.store_identifier("agent", verkey).await
    }

    async fn retrieve_agent_key(&self) -> StoreResult<Option<String>> {
        self.retrieve_identifier("agent").await
    }

    async fn store_mediator_key(&self, verkey: &str) -> StoreResult<()> {
        self.store_identifier("mediator", verkey).await
    }

    async fn retrieve_mediator_key(&self) -> StoreResult<Option<String>> {
        self.retrieve_identifier("mediator").await
    }
}
