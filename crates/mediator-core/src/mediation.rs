use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::error::{CoreError, CoreResult};

/// Tracks this process's single outstanding `mediate-request` to its
/// upstream cloud mediator, and the grant it eventually receives. There is
/// at most one such request in flight at a time (the proxy has exactly one
/// upstream mediator relationship), mirroring the singleton
/// `external_pending_request` the original agent kept.
#[derive(Default)]
pub struct MediationState {
    pending: Mutex<Option<Arc<watch::Sender<bool>>>>,
    granted: Mutex<Option<(String, Vec<String>)>>,
}

impl MediationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a request as pending, returning the completion signal to await.
    /// Fails if a request is already pending.
    pub async fn begin_request(&self) -> CoreResult<Arc<watch::Sender<bool>>> {
        let mut guard = self.pending.lock().await;
        if guard.is_some() {
            return Err(CoreError::RequestAlreadyPending);
        }
        let (tx, _rx) = watch::channel(false);
        let tx = Arc::new(tx);
        *guard = Some(tx.clone());
        Ok(tx)
    }

    /// Records a grant's `endpoint`/`routing_keys` and completes the pending
    /// request's signal. Fails if no request was pending.
    pub async fn grant(&self, endpoint: String, routing_keys: Vec<String>) -> CoreResult<()> {
        let mut pending = self.pending.lock().await;
        let tx = pending.take().ok_or(CoreError::UnexpectedMediationGrant)?;
        *self.granted.lock().await = Some((endpoint, routing_keys));
        let _ = tx.send(true);
        Ok(())
    }

    pub async fn is_granted(&self) -> bool {
        self.granted.lock().await.is_some()
    }

    pub async fn endpoint_and_routing_keys(&self) -> Option<(String, Vec<String>)> {
        self.granted.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_request_fails_while_first_pending() {
        let state = MediationState::new();
        state.begin_request().await.unwrap();
        assert!(matches!(state.begin_request().await, Err(CoreError::RequestAlreadyPending)));
    }

    #[tokio::test]
    async fn grant_without_pending_request_fails() {
        let state = MediationState::new();
        assert!(matches!(
            state.grant("https://example.org".into(), vec![]).await,
            Err(CoreError::UnexpectedMediationGrant)
        ));
    }

    #[tokio::test]
    async fn grant_completes_pending_signal_and_records_endpoint() {
        let state = MediationState::new();
        let tx = state.begin_request().await.unwrap();
        let mut rx = tx.subscribe();

        state.grant("https://mediator.example/".into(), vec!["did:key:z6Mk".into()]).await.unwrap();
        assert!(*rx.borrow());
        assert!(state.is_granted().await);
        let (endpoint, keys) = state.endpoint_and_routing_keys().await.unwrap();
        assert_eq!(endpoint, "https://mediator.example/");
        assert_eq!(keys, vec!["did:key:z6Mk".to_string()]);
    }
}
