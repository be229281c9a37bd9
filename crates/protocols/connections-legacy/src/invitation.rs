use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use mediator_core::{connection::Target, state_machine::{ConnectionEvent, ConnectionState}, AppState, Connection, CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::{diddoc, sig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(rename = "@type")]
    pub type_: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub label: String,
    #[serde(rename = "recipientKeys")]
    pub recipient_keys: Vec<String>,
    #[serde(rename = "routingKeys", default)]
    pub routing_keys: Vec<String>,
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

const INVITATION_TYPE: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/invitation";
const REQUEST_TYPE: &str = "https://didcomm.org/connections/1.0/request";

/// Generates a fresh invitation connection and returns its verkey together
/// with its `?c_i=` URL.
pub async fn create_invitation(app: &Arc<AppState>, label: &str) -> CoreResult<(String, String)> {
    let conn = Connection::random()?;
    let verkey = conn.verkey_b58();
    let state = ConnectionState::Null.apply(ConnectionEvent::SendInvite)?;

    let invitation = Invitation {
        type_: INVITATION_TYPE.to_string(),
        id: uuid::Uuid::new_v4().to_string(),
        label: label.to_string(),
        recipient_keys: vec![verkey.clone()],
        routing_keys: vec![],
        service_endpoint: app.config.endpoint.clone(),
    };

    app.registry.register(conn).await;
    app.registry
        .mutate(&verkey, |c| c.state = state)
        .await
        .ok_or(CoreError::ConnectionNotFound)?;

    let json = serde_json::to_vec(&invitation).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let encoded = URL_SAFE_NO_PAD.encode(json);
    Ok((verkey, format!("{}?c_i={}", app.config.endpoint, encoded)))
}

/// Parses a `?c_i=` URL, and as the invitee, sends a `request` to the
/// inviter. Returns the verkey of the newly created relationship connection.
pub async fn receive_invitation(app: &Arc<AppState>, url: &str, label: &str) -> CoreResult<String> {
    let encoded = url
        .split_once("c_i=")
        .map(|(_, rest)| rest)
        .ok_or_else(|| CoreError::InvalidEnvelope("missing c_i query parameter".into()))?;
    let json = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let invitation: Invitation =
        serde_json::from_slice(&json).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;

    let mut conn = Connection::random()?;
    conn.target = Some(Target {
        recipients: invitation.recipient_keys.clone(),
        endpoint: invitation.service_endpoint.clone(),
    });
    conn.state = ConnectionState::Null.apply(ConnectionEvent::ReceiveInvite)?;
    conn.state = conn.state.apply(ConnectionEvent::SendRequest)?;

    let verkey = conn.verkey_b58();
    let did = conn.did.clone();
    let doc = diddoc::build(&did, &verkey, &app.config.endpoint);
    let doc_value = serde_json::to_value(&doc).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;

    let request: Value = serde_json::json!({
        "@type": REQUEST_TYPE,
        "@id": uuid::Uuid::new_v4().to_string(),
        "label": label,
        "connection": {
            "DID": did,
            "DIDDoc": doc_value,
        },
    });

    app.registry.register(conn).await;
    app.registry
        .get_and(&verkey, |_| ())
        .await
        .ok_or(CoreError::ConnectionNotFound)?;

    let packed = app
        .registry
        .get_and(&verkey, |c| c.pack(&request))
        .await
        .ok_or(CoreError::ConnectionNotFound)??;
    send(app, &verkey, packed).await?;

    Ok(verkey)
}

async fn send(app: &Arc<AppState>, verkey: &str, packed: Vec<u8>) -> CoreResult<()> {
    let endpoint = app
        .registry
        .get_and(verkey, |c| c.target.as_ref().map(|t| t.endpoint.clone()))
        .await
        .flatten()
        .ok_or(CoreError::ConnectionNotFound)?;

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

pub use sig::SignatureDecorator;
