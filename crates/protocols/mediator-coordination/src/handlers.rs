use async_trait::async_trait;
use did_utils::crypto::{encode_multikey, Algorithm};
use mediator_core::{dispatcher::HandlerContext, message::Message, CoreError, CoreResult, MessageHandler};
use serde_json::{json, Value};
use tracing::debug;

const MEDIATE_GRANT_TYPE: &str = "https://didcomm.org/coordinate-mediation/1.0/mediate-grant";
const KEYLIST_UPDATE_RESPONSE_TYPE: &str = "https://didcomm.org/coordinate-mediation/1.0/keylist-update-response";

fn didkey_of_b58(verkey_b58: &str) -> CoreResult<String> {
    let raw = bs58::decode(verkey_b58)
        .into_vec()
        .map_err(|_| CoreError::InvalidEnvelope("malformed verkey".into()))?;
    Ok(encode_multikey(Algorithm::Ed25519, &raw))
}

/// Normalizes an upstream routing key to `did:key` form, passing through
/// values already encoded that way.
fn as_didkey(key: &str) -> CoreResult<String> {
    if key.starts_with("did:key:") {
        Ok(key.to_string())
    } else {
        didkey_of_b58(key)
    }
}

/// Downstream side: the local agent asks this proxy to mediate. Requires
/// that mediation with the upstream cloud mediator is already granted.
pub struct MediateRequestHandler;

#[async_trait]
impl MessageHandler for MediateRequestHandler {
    async fn handle(&self, ctx: &HandlerContext, _msg: Message) -> CoreResult<Option<Message>> {
        if !ctx.app.mediation.is_granted().await {
            return Err(CoreError::ExternalMediationNotEstablished);
        }
        let (endpoint, upstream_routing_keys) = ctx
            .app
            .mediation
            .endpoint_and_routing_keys()
            .await
            .ok_or(CoreError::ExternalMediationNotEstablished)?;

        let mediator_verkey = ctx
            .app
            .registry
            .mediator_connection_verkey()
            .await
            .ok_or(CoreError::MediatorConnectionNotEstablished)?;

        // Prepending the proxy's own upstream key is what causes the
        // agent's outbound messages to be wrapped so they arrive at the
        // proxy first, before being forwarded on to the real mediator.
        let mut routing_keys = vec![didkey_of_b58(&mediator_verkey)?];
        for key in &upstream_routing_keys {
            routing_keys.push(as_didkey(key)?);
        }

        Ok(Some(Message::new(
            MEDIATE_GRANT_TYPE,
            json!({ "endpoint": endpoint, "routing_keys": routing_keys }),
        )))
    }
}

/// Upstream side: the cloud mediator's grant, in response to our own
/// `mediate-request`.
pub struct MediateGrantHandler;

#[async_trait]
impl MessageHandler for MediateGrantHandler {
    async fn handle(&self, ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        let endpoint = msg
            .body
            .get("endpoint")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::InvalidEnvelope("mediate-grant missing endpoint".into()))?
            .to_string();
        let routing_keys = msg
            .body
            .get("routing_keys")
            .and_then(Value::as_array)
            .ok_or_else(|| CoreError::InvalidEnvelope("mediate-grant missing routing_keys".into()))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();

        ctx.app.mediation.grant(endpoint, routing_keys).await?;
        Ok(None)
    }
}

/// Downstream side: acknowledges every keylist entry as successful. No
/// actual keylist is kept, since this proxy mediates for exactly one agent.
pub struct KeylistUpdateHandler;

#[async_trait]
impl MessageHandler for KeylistUpdateHandler {
    async fn handle(&self, _ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        let updates = msg.body.get("updates").and_then(Value::as_array).cloned().unwrap_or_default();
        let updated: Vec<Value> = updates
            .into_iter()
            .map(|u| {
                json!({
                    "recipient_key": u.get("recipient_key").cloned().unwrap_or(Value::Null),
                    "action": u.get("action").cloned().unwrap_or(Value::Null),
                    "result": "success",
                })
            })
            .collect();
        Ok(Some(Message::new(KEYLIST_UPDATE_RESPONSE_TYPE, json!({ "updated": updated }))))
    }
}

/// Upstream side: the mediator's acknowledgement of our own keylist update.
pub struct KeylistUpdateResponseHandler;

#[async_trait]
impl MessageHandler for KeylistUpdateResponseHandler {
    async fn handle(&self, _ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        debug!(body = ?msg.body, "received keylist update response");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediator_core::{state::ProxyConfig, AppState, MessageRouter};
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
    async fn request_without_upstream_grant_fails() {
        let app = test_app();
        let ctx = HandlerContext {
            app: app.clone(),
            local_verkey: "whatever".into(),
        };
        let err = MediateRequestHandler
            .handle(&ctx, Message::new("x", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ExternalMediationNotEstablished));
    }

    #[tokio::test]
    async fn grant_without_pending_request_fails() {
        let app = test_app();
        let ctx = HandlerContext {
            app: app.clone(),
            local_verkey: "whatever".into(),
        };
        let grant_body = json!({ "endpoint": "https://mediator.example/", "routing_keys": [] });
        let err = MediateGrantHandler
            .handle(&ctx, Message::new(MEDIATE_GRANT_TYPE, grant_body))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedMediationGrant));
    }

    #[tokio::test]
    async fn keylist_update_acknowledges_every_entry() {
        let app = test_app();
        let ctx = HandlerContext {
            app: app.clone(),
            local_verkey: "whatever".into(),
        };
        let body = json!({ "updates": [{ "recipient_key": "abc", "action": "add" }] });
        let reply = KeylistUpdateHandler
            .handle(&ctx, Message::new("x", body))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.body["updated"][0]["result"], "success");
    }
}
