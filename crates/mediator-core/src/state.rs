use tracing::warn;

use crate::{
    dispatcher::{HandlerContext, MessageRouter},
    error::CoreResult,
    mediation::MediationState,
    registry::Registry,
};

/// Static process configuration, loaded once at startup from the
/// environment (see the binary crate's `config` module).
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub endpoint: String,
    pub poll_interval_secs: u64,
}

/// The application's single shared-state value: the connection registry plus
/// static configuration. Handlers and HTTP routes alike receive this through
/// an `Arc`, never through a global.
pub struct AppState {
    pub registry: Registry,
    pub config: ProxyConfig,
    pub router: MessageRouter,
    pub mediation: MediationState,
}

impl AppState {
    pub fn new(config: ProxyConfig, router: MessageRouter) -> Self {
        Self {
            registry: Registry::new(),
            config,
            router,
            mediation: MediationState::new(),
        }
    }

    /// Demultiplexes a packed envelope to every local connection it names,
    /// unpacks, dispatches, and returns at most one reply (packed for the
    /// first connection that produced one). A handler failure for one
    /// recipient does not affect the others.
    pub async fn handle_message(self: &std::sync::Arc<Self>, packed: &[u8]) -> CoreResult<Option<Vec<u8>>> {
        let verkeys = self.registry.connections_for_message(packed).await?;

        for verkey in verkeys {
            let msg = match self.registry.get_and(&verkey, |c| c.unpack(packed)).await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    warn!(error = %e, %verkey, "failed to unpack message");
                    continue;
                }
                None => continue,
            };

            let ctx = HandlerContext {
                app: self.clone(),
                local_verkey: verkey.clone(),
            };
            if let Some(reply) = self.router.dispatch(&ctx, msg).await {
                let body = serde_json::to_value(&reply).map_err(|e| crate::error::CoreError::InvalidEnvelope(e.to_string()))?;
                let packed_reply = self.registry.get_and(&verkey, |c| c.pack(&body)).await;
                if let Some(Ok(bytes)) = packed_reply {
                    return Ok(Some(bytes));
                }
            }
        }

        Ok(None)
    }
}
