use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tracing::warn;

use crate::{
    error::CoreResult,
    message::Message,
    problem_report::ProblemReport,
    state::AppState,
};

/// Everything a protocol handler needs besides the message itself: the
/// shared application state and which local connection this message arrived
/// on.
pub struct HandlerContext {
    pub app: Arc<AppState>,
    pub local_verkey: String,
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>>;
}

/// Maps fully-qualified `@type` strings to handlers, mirroring the
/// teacher's `message-api` router but built on this workspace's own
/// `Message` type instead of the `didcomm` crate's DID-keyed one.
#[derive(Clone, Default)]
pub struct MessageRouter {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `type_`, and again under the legacy sovrin
    /// doc-uri equivalent of the same protocol/version/name, so either
    /// prefix dispatches identically.
    pub fn register(mut self, type_: &str, handler: impl MessageHandler + 'static) -> Self {
        let handler = Arc::new(handler);
        self.handlers.insert(type_.to_string(), handler.clone());
        if let Some(rest) = type_.strip_prefix(crate::message::DIDCOMM_ORG_DOC_URI) {
            let legacy = format!("{}{rest}", crate::message::SOV_DOC_URI);
            self.handlers.insert(legacy, handler);
        }
        self
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.handlers.extend(other.handlers);
        self
    }

    pub fn get_handler(&self, type_: &str) -> Option<&Arc<dyn MessageHandler>> {
        self.handlers.get(type_)
    }

    pub fn message_types(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Dispatches `msg` to its registered handler. Unknown types are logged
    /// and ignored. Handler errors are converted into a problem report
    /// addressed back to the sender rather than propagated.
    pub async fn dispatch(&self, ctx: &HandlerContext, msg: Message) -> Option<Message> {
        let Some(handler) = self.get_handler(&msg.type_) else {
            warn!(type_ = %msg.type_, "no handler registered for message type");
            return None;
        };

        match handler.handle(ctx, msg).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "handler failed, emitting problem report");
                Some(ProblemReport::from_error(&e).into_message())
            }
        }
    }
}
