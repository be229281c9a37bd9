use async_trait::async_trait;
use mediator_core::{dispatcher::HandlerContext, message::Message, CoreResult, MessageHandler};
use serde_json::Value;
use tracing::info;

/// Logs the sender and content of an inbound basic message. Does not reply;
/// this proxy has no conversational role of its own.
pub struct MessageHandlerImpl;

#[async_trait]
impl MessageHandler for MessageHandlerImpl {
    async fn handle(&self, ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        let content = msg.body.get("content").and_then(Value::as_str).unwrap_or_default();
        info!(verkey = %ctx.local_verkey, content, "received basic message");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediator_core::{state::ProxyConfig, AppState, MessageRouter};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn basic_message_is_not_replied_to() {
        let app = Arc::new(AppState::new(
            ProxyConfig {
                endpoint: "https://proxy.example".into(),
                poll_interval_secs: 5,
            },
            MessageRouter::new(),
        ));
        let ctx = HandlerContext {
            app,
            local_verkey: "whoever".into(),
        };
        let reply = MessageHandlerImpl
            .handle(&ctx, Message::new("x", json!({ "content": "hello" })))
            .await
            .unwrap();
        assert!(reply.is_none());
    }
}
