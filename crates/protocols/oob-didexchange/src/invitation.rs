use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use did_utils::crypto::{decode_multikey, encode_multikey, Algorithm};
use mediator_core::{
    connection::Target,
    state_machine::{ConnectionEvent, ConnectionState},
    AppState, Connection, CoreError, CoreResult,
};
use serde::{Deserialize, Serialize};

use crate::{jws, normalize};

const OOB_TYPE: &str = "https://didcomm.org/out-of-band/1.1/invitation";
const REQUEST_TYPE: &str = "https://didcomm.org/didexchange/1.0/request";
const HANDSHAKE_PROTOCOL: &str = "https://didcomm.org/didexchange/1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InlineService {
    id: String,
    #[serde(rename = "type")]
    type_: String,
    #[serde(rename = "recipientKeys")]
    recipient_keys: Vec<String>,
    #[serde(rename = "routingKeys", default)]
    routing_keys: Vec<String>,
    #[serde(rename = "serviceEndpoint")]
    service_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Invitation {
    #[serde(rename = "@type")]
    type_: String,
    #[serde(rename = "@id")]
    id: String,
    label: String,
    handshake_protocols: Vec<String>,
    services: Vec<InlineService>,
}

fn didkey_of(verkey_b58: &str) -> CoreResult<String> {
    let raw = bs58::decode(verkey_b58)
        .into_vec()
        .map_err(|_| CoreError::InvalidEnvelope("malformed verkey".into()))?;
    Ok(encode_multikey(Algorithm::Ed25519, &raw))
}

fn verkey_of_didkey(didkey: &str) -> CoreResult<String> {
    let multikey = didkey.strip_prefix("did:key:").unwrap_or(didkey);
    let (alg, raw) = decode_multikey(multikey).map_err(|_| CoreError::InvalidEnvelope("malformed did:key".into()))?;
    if alg != Algorithm::Ed25519 {
        return Err(CoreError::DidMethodNotSupported(didkey.to_string()));
    }
    Ok(bs58::encode(raw).into_string())
}

/// Generates a fresh invitation connection and returns its verkey together
/// with its `?oob=` URL.
pub async fn create_invitation(app: &Arc<AppState>, label: &str) -> CoreResult<(String, String)> {
    let conn = Connection::random()?;
    let verkey = conn.verkey_b58();
    let state = ConnectionState::Null.apply(ConnectionEvent::SendInvite)?;

    let invitation = Invitation {
        type_: OOB_TYPE.to_string(),
        id: uuid::Uuid::new_v4().to_string(),
        label: label.to_string(),
        handshake_protocols: vec![HANDSHAKE_PROTOCOL.to_string()],
        services: vec![InlineService {
            id: "#inline".to_string(),
            type_: "did-communication".to_string(),
            recipient_keys: vec![didkey_of(&verkey)?],
            routing_keys: vec![],
            service_endpoint: app.config.endpoint.clone(),
        }],
    };

    app.registry.register(conn).await;
    app.registry
        .mutate(&verkey, |c| c.state = state)
        .await
        .ok_or(CoreError::ConnectionNotFound)?;

    let json = serde_json::to_vec(&invitation).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let encoded = URL_SAFE_NO_PAD.encode(json);
    Ok((verkey, format!("{}?oob={}", app.config.endpoint, encoded)))
}

/// Parses a `?oob=` URL and, as the invitee, sends a DID-exchange `request`
/// carrying this proxy's own signed DID document. Returns the verkey of the
/// newly created relationship connection.
pub async fn receive_invitation(app: &Arc<AppState>, url: &str, label: &str) -> CoreResult<String> {
    let encoded = url
        .split_once("oob=")
        .map(|(_, rest)| rest)
        .ok_or_else(|| CoreError::InvalidEnvelope("missing oob query parameter".into()))?;
    let encoded = encoded.split('&').next().unwrap_or(encoded);
    let json = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let invitation: Invitation =
        serde_json::from_slice(&json).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;

    let service = invitation
        .services
        .first()
        .ok_or_else(|| CoreError::InvalidEnvelope("invitation has no services".into()))?;
    let recipients = service
        .recipient_keys
        .iter()
        .map(|k| verkey_of_didkey(k))
        .collect::<CoreResult<Vec<_>>>()?;

    let mut conn = Connection::random()?;
    conn.target = Some(Target {
        recipients,
        endpoint: service.service_endpoint.clone(),
    });
    conn.state = ConnectionState::Null.apply(ConnectionEvent::ReceiveInvite)?;
    conn.state = conn.state.apply(ConnectionEvent::SendRequest)?;

    let verkey = conn.verkey_b58();
    let doc = crate::diddoc::build(&verkey, &app.config.endpoint, &conn.keypair)?;
    let did = doc.id.clone();
    let doc_value = serde_json::to_value(&doc).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;

    let request = serde_json::json!({
        "@type": REQUEST_TYPE,
        "@id": uuid::Uuid::new_v4().to_string(),
        "~thread": { "pthid": invitation.id },
        "label": label,
        "did": did,
        "did_doc~attach": jws::build_attachment(&doc_value, &conn.keypair)?,
    });

    app.registry.register(conn).await;

    let packed = app
        .registry
        .get_and(&verkey, |c| c.pack(&request))
        .await
        .ok_or(CoreError::ConnectionNotFound)??;
    post(&service.service_endpoint, packed).await?;

    Ok(verkey)
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

pub use normalize::normalize;
