use async_trait::async_trait;
use mediator_core::{
    connection::Target, dispatcher::HandlerContext, message::Message, CoreError, CoreResult, MessageHandler,
};
use serde_json::json;
use tracing::info;

use crate::{diddoc, jws, normalize, state};

const RESPONSE_TYPE: &str = "https://didcomm.org/didexchange/1.0/response";
const COMPLETE_TYPE: &str = "https://didcomm.org/didexchange/1.0/complete";

fn attachment_from(msg: &Message) -> CoreResult<jws::Attachment> {
    let value = msg
        .body
        .get("did_doc~attach")
        .cloned()
        .ok_or_else(|| CoreError::InvalidEnvelope("missing did_doc~attach".into()))?;
    serde_json::from_value(value).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))
}

/// Inviter side: a peer's signed `request` arrives on the invitation
/// connection. Promotes it to a relationship connection, attaches this
/// proxy's own signed document, and sends the `response`.
pub struct RequestHandler;

#[async_trait]
impl MessageHandler for RequestHandler {
    async fn handle(&self, ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        let attachment = attachment_from(&msg)?;
        let peer_doc_value = jws::verify_attachment(&attachment)?;
        let peer_doc = normalize::normalize(&peer_doc_value)?;
        let peer_target = crate::extract::target_from_document(&peer_doc)?;

        let app = &ctx.app;
        let invite_verkey = ctx.local_verkey.clone();
        let machine = state::machine();

        let invite_state = app
            .registry
            .get_and(&invite_verkey, |c| c.state)
            .await
            .ok_or(CoreError::ConnectionNotFound)?;
        let requested = machine.apply(&state::Role::Inviter, &invite_state, &mediator_core::ConnectionEvent::ReceiveRequest)?;

        let mut new_conn = app
            .registry
            .get_and(&invite_verkey, mediator_core::Connection::from_invite)
            .await
            .ok_or(CoreError::ConnectionNotFound)??;
        new_conn.target = Some(peer_target.clone());
        new_conn.diddoc = Some(peer_doc);
        new_conn.state = machine.apply(&state::Role::Inviter, &requested, &mediator_core::ConnectionEvent::SendResponse)?;

        let new_verkey = new_conn.verkey_b58();
        let response_doc = diddoc::build(&new_verkey, &app.config.endpoint, &new_conn.keypair)?;
        let doc_value = serde_json::to_value(&response_doc).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
        let attachment = jws::build_attachment(&doc_value, &new_conn.keypair)?;

        let multiuse = app.registry.get_and(&invite_verkey, |c| c.multiuse).await.unwrap_or(false);
        let new_verkey = app.registry.replace(&invite_verkey, new_conn, multiuse).await;

        let response = Message::new(RESPONSE_TYPE, json!({ "did_doc~attach": attachment }))
            .with_thread(msg.id.clone(), msg.thread.as_ref().and_then(|t| t.pthid.clone()));
        let body = serde_json::to_value(&response).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;

        // The local verkey changed as part of promoting the invitation
        // connection, so the reply cannot flow through the generic
        // per-connection packer in `AppState::handle_message`; pack and
        // send it directly here, as `connections-legacy::RequestHandler` does.
        let packed = app
            .registry
            .get_and(&new_verkey, |c| c.pack(&body))
            .await
            .ok_or(CoreError::ConnectionNotFound)??;
        post(&peer_target.endpoint, packed).await?;

        info!(verkey = %new_verkey, "didexchange request handled, response sent");
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

/// Invitee side: the peer's signed `response` arrives. Adopts the peer's
/// target and sends the explicit `complete` message that finishes the
/// exchange (DID-exchange does not rely on an implicit trust-ping).
pub struct ResponseHandler;

#[async_trait]
impl MessageHandler for ResponseHandler {
    async fn handle(&self, ctx: &HandlerContext, msg: Message) -> CoreResult<Option<Message>> {
        let attachment = attachment_from(&msg)?;
        let peer_doc_value = jws::verify_attachment(&attachment)?;
        let peer_doc = normalize::normalize(&peer_doc_value)?;
        let target: Target = crate::extract::target_from_document(&peer_doc)?;

        let verkey = ctx.local_verkey.clone();
        let machine = state::machine();

        let next = ctx
            .app
            .registry
            .mutate(&verkey, |c| -> CoreResult<_> {
                let responded =
                    machine.apply(&state::Role::Invitee, &c.state, &mediator_core::ConnectionEvent::ReceiveResponse)?;
                c.target = Some(target);
                c.diddoc = Some(peer_doc);
                c.state = responded;
                Ok(responded)
            })
            .await
            .ok_or(CoreError::ConnectionNotFound)??;

        let complete_state =
            machine.apply(&state::Role::Invitee, &next, &mediator_core::ConnectionEvent::SendComplete)?;

        let thid = msg
            .thread
            .as_ref()
            .and_then(|t| t.thid.clone())
            .unwrap_or_else(|| msg.id.clone());
        let pthid = msg
            .thread
            .as_ref()
            .and_then(|t| t.pthid.clone())
            .unwrap_or_else(|| thid.clone());
        let complete = json!({
            "@type": COMPLETE_TYPE,
            "@id": uuid::Uuid::new_v4().to_string(),
            "~thread": { "thid": thid, "pthid": pthid },
        });

        ctx.app
            .registry
            .with_connection(&verkey, |c| c.send_async(&complete, Some("all")))
            .await
            .ok_or(CoreError::ConnectionNotFound)??;

        ctx.app
            .registry
            .mutate(&verkey, |c| {
                c.state = complete_state;
                c.complete();
            })
            .await
            .ok_or(CoreError::ConnectionNotFound)?;

        Ok(None)
    }
}

/// Inviter side: the invitee's `complete` closes out the handshake.
pub struct CompleteHandler;

#[async_trait]
impl MessageHandler for CompleteHandler {
    async fn handle(&self, ctx: &HandlerContext, _msg: Message) -> CoreResult<Option<Message>> {
        let verkey = ctx.local_verkey.clone();
        let machine = state::machine();

        ctx.app
            .registry
            .mutate(&verkey, |c| -> CoreResult<()> {
                c.state = machine.apply(&state::Role::Inviter, &c.state, &mediator_core::ConnectionEvent::ReceiveComplete)?;
                c.complete();
                Ok(())
            })
            .await
            .ok_or(CoreError::ConnectionNotFound)??;
        Ok(None)
    }
}
