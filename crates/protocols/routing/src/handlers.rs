use async_trait::async_trait;
use mediator_core::{dispatcher::HandlerContext, message::Message, CoreError, CoreResult, MessageHandler};
use serde_json::Value;
use tracing::info;

/// RFC-0094 `forward`. Received only from the upstream mediator connection,
/// and only once both ends of the relay are established. The enclosed `msg`
/// is already a packed envelope addressed to the agent; it is sent on
/// verbatim, never unpacked or re-wrapped.
pub struct ForwardHandler;

#[async_trait]
impl MessageHandler for ForwardHandler {
    async fn handle(&self, ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        let agent_verkey = ctx
            .app
            .registry
            .agent_connection_verkey()
            .await
            .ok_or(CoreError::AgentConnectionNotEstablished)?;

        if ctx.app.registry.mediator_connection_verkey().await.is_none() {
            return Err(CoreError::MediatorConnectionNotEstablished);
        }

        if !ctx.app.registry.is_mediator_connection(&ctx.local_verkey).await {
            return Err(CoreError::ForwardFromUnauthorizedConnection);
        }

        let inner = msg
            .body
            .get("msg")
            .cloned()
            .ok_or_else(|| CoreError::InvalidEnvelope("forward message missing msg".into()))?;
        let endpoint = ctx
            .app
            .registry
            .get_and(&agent_verkey, |c| c.target.as_ref().map(|t| t.endpoint.clone()))
            .await
            .flatten()
            .ok_or(CoreError::AgentConnectionNotEstablished)?;

        forward(&endpoint, &inner).await?;
        Ok(None)
    }
}

async fn forward(endpoint: &str, packed: &Value) -> CoreResult<()> {
    let body = serde_json::to_vec(packed).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    info!(endpoint, "forwarding packed envelope to agent");
    reqwest::Client::new()
        .post(endpoint)
        .header("content-type", "application/didcomm-envelope-enc")
        .body(body)
        .send()
        .await
        .map_err(|e| CoreError::Transport(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediator_core::{state::ProxyConfig, AppState, MessageRouter};
    use serde_json::json;
    use std::sync::Arc;

    fn test_app() -> Arc<AppState> {
        Arc::new(AppState::new(
            ProxyConfig {
                endpoint: "https://proxy.example".into(),
                poll_interval_secs: 5,
            },
            MessageRouter::new(),
        ))
    }

    #[tokio::test]
    async fn forward_without_agent_connection_fails() {
        let app = test_app();
        let ctx = HandlerContext {
            app: app.clone(),
            local_verkey: "whoever".into(),
        };
        let err = ForwardHandler
            .handle(&ctx, Message::new("x", json!({ "msg": {} })))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AgentConnectionNotEstablished));
    }

    #[tokio::test]
    async fn forward_without_mediator_connection_fails() {
        let app = test_app();
        app.registry.register(mediator_core::Connection::random().unwrap()).await;
        let agent = mediator_core::Connection::random().unwrap();
        let agent_verkey = app.registry.register(agent).await;
        app.registry.set_agent_connection(agent_verkey).await;

        let ctx = HandlerContext {
            app: app.clone(),
            local_verkey: "whoever".into(),
        };
        let err = ForwardHandler
            .handle(&ctx, Message::new("x", json!({ "msg": {} })))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MediatorConnectionNotEstablished));
    }

    #[tokio::test]
    async fn forward_from_non_mediator_connection_is_rejected() {
        let app = test_app();
        let mediator = mediator_core::Connection::random().unwrap();
        let mediator_verkey = app.registry.register(mediator).await;
        app.registry.set_mediator_connection(mediator_verkey).await;
        let agent = mediator_core::Connection::random().unwrap();
        let agent_verkey = app.registry.register(agent).await;
        app.registry.set_agent_connection(agent_verkey).await;

        let ctx = HandlerContext {
            app: app.clone(),
            local_verkey: "some-unrelated-connection".into(),
        };
        let err = ForwardHandler
            .handle(&ctx, Message::new("x", json!({ "msg": {} })))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ForwardFromUnauthorizedConnection));
    }
}
