use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use did_utils::didcore::Document;
use mediator_core::{
    connection::Target,
    dispatcher::HandlerContext,
    message::Message,
    state_machine::ConnectionEvent,
    CoreError, CoreResult, MessageHandler,
};
use serde_json::{json, Value};
use tracing::info;

use crate::{diddoc, extract, sig};

const RESPONSE_TYPE: &str = "https://didcomm.org/connections/1.0/response";
const PING_TYPE: &str = "https://didcomm.org/trust_ping/1.0/ping";
const PING_RESPONSE_TYPE: &str = "https://didcomm.org/trust_ping/1.0/ping_response";

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Inviter side: a peer's `request` arrives on the invitation connection.
/// Promotes it to a relationship connection, signs a did-core document with
/// the invitation key, and sends the `response` directly (the reply cannot
/// flow through the generic per-connection packer, since the local verkey
/// changes as part of handling this message).
pub struct RequestHandler;

#[async_trait]
impl MessageHandler for RequestHandler {
    async fn handle(&self, ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        let peer_doc_value = msg
            .body
            .get("connection")
            .and_then(|c| c.get("DIDDoc"))
            .cloned()
            .ok_or_else(|| CoreError::InvalidEnvelope("request missing connection.DIDDoc".into()))?;
        let peer_doc: Document =
            serde_json::from_value(peer_doc_value).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
        let peer_target = extract::target_from_document(&peer_doc)?;

        let app = &ctx.app;
        let invite_verkey = ctx.local_verkey.clone();

        let state = app
            .registry
            .get_and(&invite_verkey, |c| c.state)
            .await
            .ok_or(CoreError::ConnectionNotFound)?;
        let state = state.apply(ConnectionEvent::ReceiveRequest)?;

        let mut new_conn = app
            .registry
            .get_and(&invite_verkey, mediator_core::Connection::from_invite)
            .await
            .ok_or(CoreError::ConnectionNotFound)??;
        new_conn.target = Some(peer_target.clone());
        new_conn.diddoc = Some(peer_doc);
        new_conn.state = state.apply(ConnectionEvent::SendResponse)?;

        let new_did = new_conn.did.clone();
        let new_verkey_preview = new_conn.verkey_b58();
        let response_doc = diddoc::build(&new_did, &new_verkey_preview, &app.config.endpoint);
        let doc_value = serde_json::to_value(&response_doc).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;

        let timestamp = now_secs();
        let sig_data = sig::sig_data_bytes(&doc_value, timestamp)?;
        let signature = app
            .registry
            .get_and(&invite_verkey, |c| c.sign(&sig_data))
            .await
            .ok_or(CoreError::ConnectionNotFound)??;
        let decorator = sig::assemble(sig_data, signature, invite_verkey.clone());

        let multiuse = app.registry.get_and(&invite_verkey, |c| c.multiuse).await.unwrap_or(false);
        let new_verkey = app.registry.replace(&invite_verkey, new_conn, multiuse).await;

        let response = Message::new(RESPONSE_TYPE, json!({ "connection~sig": decorator }))
            .with_thread(msg.id.clone(), None);
        let body = serde_json::to_value(&response).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;

        let packed = app
            .registry
            .get_and(&new_verkey, |c| c.pack(&body))
            .await
            .ok_or(CoreError::ConnectionNotFound)??;

        post(&peer_target.endpoint, packed).await?;
        info!(verkey = %new_verkey, "legacy connection request handled, response sent");
        Ok(None)
    }
}

/// Invitee side: the signed `response` arrives. Verifies the invitation key
/// signed it, adopts the peer's target, and sends a trust-ping to complete.
pub struct ResponseHandler;

#[async_trait]
impl MessageHandler for ResponseHandler {
    async fn handle(&self, ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        let decorator = sig::decorator_from_message(&msg)?;
        let verkey = ctx.local_verkey.clone();

        let invitation_key = ctx
            .app
            .registry
            .get_and(&verkey, |c| c.invitation_key.clone())
            .await
            .flatten()
            .ok_or(CoreError::SignatureInvalid)?;
        if decorator.signer != invitation_key {
            return Err(CoreError::SignatureInvalid);
        }

        let doc_value = sig::verify_and_extract(&decorator)?;
        let doc: Document = serde_json::from_value(doc_value).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
        let target: Target = extract::target_from_document(&doc)?;

        ctx.app
            .registry
            .mutate(&verkey, |c| -> CoreResult<()> {
                c.state = c.state.apply(ConnectionEvent::ReceiveResponse)?;
                c.target = Some(target);
                c.diddoc = Some(doc);
                Ok(())
            })
            .await
            .ok_or(CoreError::ConnectionNotFound)??;

        let ping = Message::new(PING_TYPE, json!({ "response_requested": false }));
        let body = serde_json::to_value(&ping).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
        ctx.app
            .registry
            .with_connection(&verkey, |c| c.send_async(&body, Some("all")))
            .await
            .ok_or(CoreError::ConnectionNotFound)??;

        ctx.app
            .registry
            .mutate(&verkey, |c| -> CoreResult<()> {
                c.state = c.state.apply(ConnectionEvent::SendPing)?;
                c.complete();
                Ok(())
            })
            .await
            .ok_or(CoreError::ConnectionNotFound)??;

        Ok(None)
    }
}

/// Either side: a trust-ping completes the handshake and, if requested,
/// draws a `ping_response`.
pub struct PingHandler;

#[async_trait]
impl MessageHandler for PingHandler {
    async fn handle(&self, ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        let verkey = ctx.local_verkey.clone();
        ctx.app
            .registry
            .mutate(&verkey, |c| -> CoreResult<()> {
                c.state = c.state.apply(ConnectionEvent::ReceivePing)?;
                c.complete();
                Ok(())
            })
            .await
            .ok_or(CoreError::ConnectionNotFound)??;

        let response_requested = msg
            .body
            .get("response_requested")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        if !response_requested {
            return Ok(None);
        }
        Ok(Some(Message::new(PING_RESPONSE_TYPE, json!({})).with_thread(msg.id, None)))
    }
}

pub struct PingResponseHandler;

#[async_trait]
impl MessageHandler for PingResponseHandler {
    async fn handle(&self, ctx: &HandlerContext, _msg: Message) -> CoreResult<Option<Message>> {
        let verkey = ctx.local_verkey.clone();
        ctx.app
            .registry
            .mutate(&verkey, |c| -> CoreResult<()> {
                c.state = c.state.apply(ConnectionEvent::PingResponse)?;
                Ok(())
            })
            .await
            .ok_or(CoreError::ConnectionNotFound)??;
        Ok(None)
    }
}

async fn post(endpoint: &str, packed: Vec<u8>) -> CoreResult<()> {
    let client = reqwest::Client::new();
    client
        .post(endpoint)
        .header("content-type", "application/didcomm-envelope-enc")
        .body(packed)
        .send()
        .await
        .map_err(|e| CoreError::Transport(e.to_string()))?;
    Ok(())
}
