use std::sync::Arc;

use did_utils::{crypto::{CoreSign, Ed25519KeyPair, Generate, KeyMaterial}, didcore::Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::{crypto, error::{CoreError, CoreResult}, message::Message, state_machine::ConnectionState};

/// The peer side of a connection: where its recipients are and how to reach
/// them. Absent until a handshake completes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Target {
    pub recipients: Vec<String>,
    pub endpoint: String,
}

/// Wire shape persisted by the store adapter (see `store` crate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub state: ConnectionState,
    pub multiuse: bool,
    pub invitation_key: Option<String>,
    pub did: String,
    pub verkey: String,
    pub sigkey: String,
    pub target: Option<Target>,
    pub diddoc: Option<Document>,
}

/// One pairwise relationship: a local keypair, the peer's target (once
/// known), and the handshake's protocol state.
pub struct Connection {
    pub keypair: Ed25519KeyPair,
    pub did: String,
    pub state: ConnectionState,
    pub multiuse: bool,
    pub invitation_key: Option<String>,
    pub target: Option<Target>,
    pub diddoc: Option<Document>,
    completion_tx: Arc<watch::Sender<bool>>,
    completion_rx: watch::Receiver<bool>,
}

impl Connection {
    pub fn random() -> CoreResult<Self> {
        let keypair = Ed25519KeyPair::new().map_err(|e| CoreError::Transport(format!("{e:?}")))?;
        Ok(Self::from_keypair(keypair, ConnectionState::Null))
    }

    fn from_keypair(keypair: Ed25519KeyPair, state: ConnectionState) -> Self {
        let did = Self::derive_did(&keypair);
        let (tx, rx) = watch::channel(false);
        Self {
            keypair,
            did,
            state,
            multiuse: false,
            invitation_key: None,
            target: None,
            diddoc: None,
            completion_tx: Arc::new(tx),
            completion_rx: rx,
        }
    }

    fn derive_did(keypair: &Ed25519KeyPair) -> String {
        let pk = keypair.public_key_bytes().expect("ed25519 public key");
        bs58::encode(&pk[..16]).into_string()
    }

    pub fn verkey_b58(&self) -> String {
        bs58::encode(self.keypair.public_key_bytes().expect("ed25519 public key")).into_string()
    }

    /// Builds a fresh relationship connection out of an invitation
    /// connection, inheriting its completion signal and recording its
    /// verkey as the invitation key that must later sign the response.
    pub fn from_invite(invite_conn: &Connection) -> CoreResult<Self> {
        let mut conn = Self::random()?;
        conn.invitation_key = Some(invite_conn.verkey_b58());
        conn.completion_tx = invite_conn.completion_tx.clone();
        conn.completion_rx = invite_conn.completion_tx.subscribe();
        Ok(conn)
    }

    pub fn complete(&self) {
        let _ = self.completion_tx.send(true);
    }

    pub async fn await_completion(&self) {
        let mut rx = self.completion_rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }

    /// A clone of this connection's completion signal, for callers that
    /// must wait outside the registry's lock (awaiting a handshake can take
    /// arbitrarily long, and the registry must stay available to the
    /// handlers that will eventually complete it).
    pub fn completion_receiver(&self) -> watch::Receiver<bool> {
        self.completion_rx.clone()
    }

    pub fn unpack(&self, packed: &[u8]) -> CoreResult<Message> {
        let (plaintext, sender_verkey) = crypto::unpack(packed, &self.keypair, &self.verkey_b58())?;
        let mut msg: Message =
            serde_json::from_slice(&plaintext).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
        msg.sender_verkey = sender_verkey;
        msg.recipient_verkey = Some(self.verkey_b58());
        Ok(msg)
    }

    pub fn sign(&self, payload: &[u8]) -> CoreResult<Vec<u8>> {
        self.keypair.sign(payload).map_err(|e| CoreError::Transport(format!("{e:?}")))
    }

    pub fn pack(&self, body: &Value) -> CoreResult<Vec<u8>> {
        let target = self.target.as_ref().ok_or(CoreError::ConnectionNotFound)?;
        let plaintext = serde_json::to_vec(body).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
        crypto::pack(&plaintext, &target.recipients, &self.keypair)
    }

    /// Packs and POSTs `body` to the current target's endpoint. If
    /// `return_route` is set, tags the outgoing message so the peer may
    /// reply over the same transport; a peer honoring that hint over plain
    /// HTTP writes its reply into the POST response body, which this
    /// returns packed and unopened for the caller to dispatch.
    pub async fn send_async(&self, body: &Value, return_route: Option<&str>) -> CoreResult<Option<Vec<u8>>> {
        let target = self.target.as_ref().ok_or(CoreError::ConnectionNotFound)?;
        let mut body = body.clone();
        if let Some(rr) = return_route {
            body["~transport"] = serde_json::json!({ "return_route": rr });
        }
        let packed = self.pack(&body)?;

        let client = reqwest::Client::new();
        let response = client
            .post(&target.endpoint)
            .header("content-type", "application/didcomm-envelope-enc")
            .body(packed)
            .send()
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))?;

        let reply = response.bytes().await.map_err(|e| CoreError::Transport(e.to_string()))?;
        Ok(if reply.is_empty() { None } else { Some(reply.to_vec()) })
    }

    pub fn to_record(&self) -> ConnectionRecord {
        ConnectionRecord {
            state: self.state.clone(),
            multiuse: self.multiuse,
            invitation_key: self.invitation_key.clone(),
            did: self.did.clone(),
            verkey: self.verkey_b58(),
            sigkey: bs58::encode(self.keypair.private_key_bytes().expect("ed25519 secret key")).into_string(),
            target: self.target.clone(),
            diddoc: self.diddoc.clone(),
        }
    }

    pub fn from_record(record: ConnectionRecord) -> CoreResult<Self> {
        let sk_bytes = bs58::decode(&record.sigkey)
            .into_vec()
            .map_err(|_| CoreError::Store("sigkey not base58".into()))?;
        let sk_bytes: [u8; 32] = sk_bytes
            .try_into()
            .map_err(|_| CoreError::Store("sigkey not 32 bytes".into()))?;
        let keypair = Ed25519KeyPair::from_secret_key(&sk_bytes).map_err(|e| CoreError::Store(format!("{e:?}")))?;

        let mut conn = Self::from_keypair(keypair, record.state);
        conn.multiuse = record.multiuse;
        conn.invitation_key = record.invitation_key;
        conn.target = record.target;
        conn.diddoc = record.diddoc;
        conn.did = record.did;
        Ok(conn)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("did", &self.did)
            .field("state", &self.state)
            .field("target", &self.target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_roundtrip_preserves_identity() {
        let conn = Connection::random().unwrap();
        let verkey = conn.verkey_b58();
        let record = conn.to_record();
        let restored = Connection::from_record(record).unwrap();
        assert_eq!(restored.verkey_b58(), verkey);
    }

    #[tokio::test]
    async fn completion_is_observed_after_signal() {
        let conn = Connection::random().unwrap();
        conn.complete();
        conn.await_completion().await;
    }

    #[test]
    fn from_invite_records_invitation_key() {
        let invite = Connection::random().unwrap();
        let relationship = Connection::from_invite(&invite).unwrap();
        assert_eq!(relationship.invitation_key, Some(invite.verkey_b58()));
    }
}
