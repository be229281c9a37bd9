use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::{connection::Connection, envelope, error::{CoreError, CoreResult}};

/// Process readiness, derived from what the registry currently holds rather
/// than tracked as independent state (see the design note in `SPEC_FULL.md`
/// on avoiding a second source of truth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Init,
    Setup,
    Ready,
}

/// Owns every connection known to this process, keyed by local verkey, plus
/// the two distinguished slots: the upstream mediator relationship and the
/// downstream agent relationship.
#[derive(Default)]
pub struct Registry {
    connections: Mutex<HashMap<String, Connection>>,
    mediator_connection: Mutex<Option<String>>,
    agent_connection: Mutex<Option<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, conn: Connection) -> String {
        let verkey = conn.verkey_b58();
        self.connections.lock().await.insert(verkey.clone(), conn);
        verkey
    }

    pub async fn remove(&self, verkey: &str) -> Option<Connection> {
        self.connections.lock().await.remove(verkey)
    }

    /// Atomically removes `old_verkey` (unless `keep_old`, for multi-use
    /// invitations) and inserts `new_conn` in its place.
    pub async fn replace(&self, old_verkey: &str, new_conn: Connection, keep_old: bool) -> String {
        let new_verkey = new_conn.verkey_b58();
        let mut guard = self.connections.lock().await;
        if !keep_old {
            guard.remove(old_verkey);
        }
        guard.insert(new_verkey.clone(), new_conn);
        new_verkey
    }

    pub async fn get_and<F, R>(&self, verkey: &str, f: F) -> Option<R>
    where
        F: FnOnce(&Connection) -> R,
    {
        self.connections.lock().await.get(verkey).map(f)
    }

    pub async fn mutate<F, R>(&self, verkey: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut Connection) -> R,
    {
        self.connections.lock().await.get_mut(verkey).map(f)
    }

    /// Like [`Self::get_and`], but `f` returns a future that is awaited
    /// while the registry's lock is held (tokio's `Mutex` guard may be held
    /// across an `.await`, unlike `std::sync::Mutex`'s). Used for operations
    /// like `Connection::send_async` that need a long-lived borrow of the
    /// connection across network I/O.
    pub async fn with_connection<F, Fut, R>(&self, verkey: &str, f: F) -> Option<R>
    where
        F: FnOnce(&Connection) -> Fut,
        Fut: std::future::Future<Output = R>,
    {
        let guard = self.connections.lock().await;
        let conn = guard.get(verkey)?;
        Some(f(conn).await)
    }

    pub async fn set_mediator_connection(&self, verkey: String) {
        *self.mediator_connection.lock().await = Some(verkey);
    }

    pub async fn set_agent_connection(&self, verkey: String) {
        *self.agent_connection.lock().await = Some(verkey);
    }

    pub async fn mediator_connection_verkey(&self) -> Option<String> {
        self.mediator_connection.lock().await.clone()
    }

    pub async fn agent_connection_verkey(&self) -> Option<String> {
        self.agent_connection.lock().await.clone()
    }

    pub async fn is_mediator_connection(&self, verkey: &str) -> bool {
        self.mediator_connection_verkey().await.as_deref() == Some(verkey)
    }

    pub async fn is_agent_connection(&self, verkey: &str) -> bool {
        self.agent_connection_verkey().await.as_deref() == Some(verkey)
    }

    /// Returns the local verkeys matching any recipient kid in `packed`.
    pub async fn connections_for_message(&self, packed: &[u8]) -> CoreResult<Vec<String>> {
        let kids = envelope::recipients(packed)?;
        let guard = self.connections.lock().await;
        let matches: Vec<String> = kids.into_iter().filter(|k| guard.contains_key(k)).collect();
        if matches.is_empty() {
            return Err(CoreError::ConnectionNotFound);
        }
        Ok(matches)
    }

    pub async fn process_state(&self) -> ProcessState {
        let has_mediator = self.mediator_connection_verkey().await.is_some();
        let has_agent_invite = self.agent_connection_verkey().await.is_some()
            || !self.connections.lock().await.is_empty();
        match (has_mediator, has_agent_invite) {
            (true, true) => ProcessState::Ready,
            (false, _) => ProcessState::Init,
            _ => ProcessState::Setup,
        }
    }

    /// Snapshots every connection as a storage record, for persistence.
    pub async fn snapshot(&self) -> Vec<crate::connection::ConnectionRecord> {
        self.connections.lock().await.values().map(|c| c.to_record()).collect()
    }

    pub async fn restore(&self, records: Vec<crate::connection::ConnectionRecord>) -> CoreResult<()> {
        let mut guard = self.connections.lock().await;
        for record in records {
            let conn = Connection::from_record(record)?;
            guard.insert(conn.verkey_b58(), conn);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_lookup_by_kid_matches() {
        let registry = Registry::new();
        let conn = Connection::random().unwrap();
        let verkey = conn.verkey_b58();
        registry.register(conn).await;

        assert_eq!(registry.process_state().await, ProcessState::Setup);
    }

    #[tokio::test]
    async fn replace_drops_the_invitation_key_unless_multiuse() {
        let registry = Registry::new();
        let invite = Connection::random().unwrap();
        let invite_verkey = invite.verkey_b58();
        registry.register(invite).await;

        let relationship = Connection::random().unwrap();
        let new_verkey = registry.replace(&invite_verkey, relationship, false).await;

        assert!(registry.get_and(&invite_verkey, |_| ()).await.is_none());
        assert!(registry.get_and(&new_verkey, |_| ()).await.is_some());
    }

    #[tokio::test]
    async fn process_state_tracks_registered_connections() {
        let registry = Registry::new();
        assert_eq!(registry.process_state().await, ProcessState::Init);

        let mediator = Connection::random().unwrap();
        let mediator_verkey = mediator.verkey_b58();
        registry.register(mediator).await;
        registry.set_mediator_connection(mediator_verkey).await;

        let agent = Connection::random().unwrap();
        let agent_verkey = agent.verkey_b58();
        registry.register(agent).await;
        registry.set_agent_connection(agent_verkey).await;

        assert_eq!(registry.process_state().await, ProcessState::Ready);
    }
}
