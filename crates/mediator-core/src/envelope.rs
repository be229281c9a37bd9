use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// One entry of a packed message's `recipients` array: the wrapped content
/// encryption key plus the kid (base58 verkey) it was wrapped for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientHeader {
    pub kid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub encrypted_key: String,
    pub header: RecipientHeader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedHeader {
    pub enc: String,
    pub typ: String,
    pub alg: String,
    pub recipients: Vec<Recipient>,
}

/// The outer packed message envelope: a base64url-encoded protected header
/// plus the AEAD-sealed body. This shape, not the content, is what the
/// registry inspects to find a matching connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedMessage {
    pub protected: String,
    pub iv: String,
    pub ciphertext: String,
    pub tag: String,
}

impl PackedMessage {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))
    }

    pub fn decode_protected(&self) -> Result<ProtectedHeader, CoreError> {
        let raw = URL_SAFE_NO_PAD
            .decode(&self.protected)
            .map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
        serde_json::from_slice(&raw).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))
    }
}

/// Returns every recipient kid (base58 verkey) listed in a packed message's
/// protected header, without decrypting anything.
pub fn recipients(packed: &[u8]) -> Result<Vec<String>, CoreError> {
    let msg = PackedMessage::from_slice(packed)?;
    let header = msg.decode_protected()?;
    Ok(header.recipients.into_iter().map(|r| r.header.kid).collect())
}

/// Parses a raw JSON value into a [`PackedMessage`], used when the envelope
/// arrives already deserialized (e.g. from a websocket text frame).
pub fn from_value(value: Value) -> Result<PackedMessage, CoreError> {
    serde_json::from_value(value).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kids: &[&str]) -> Vec<u8> {
        let header = ProtectedHeader {
            enc: "xchacha20poly1305_ietf".into(),
            typ: "JWM/1.0".into(),
            alg: "Authcrypt".into(),
            recipients: kids
                .iter()
                .map(|k| Recipient {
                    encrypted_key: "AAAA".into(),
                    header: RecipientHeader {
                        kid: k.to_string(),
                        iv: None,
                        sender: None,
                    },
                })
                .collect(),
        };
        let protected = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
        let packed = PackedMessage {
            protected,
            iv: "AAAA".into(),
            ciphertext: "AAAA".into(),
            tag: "AAAA".into(),
        };
        serde_json::to_vec(&packed).unwrap()
    }

    #[test]
    fn extracts_recipient_kids() {
        let bytes = sample(&["verkey1", "verkey2"]);
        let kids = recipients(&bytes).unwrap();
        assert_eq!(kids, vec!["verkey1".to_string(), "verkey2".to_string()]);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = recipients(b"not json").unwrap_err();
        assert!(matches!(err, CoreError::InvalidEnvelope(_)));
    }

    #[test]
    fn rejects_missing_protected_header() {
        let err = recipients(br#"{"iv":"x","ciphertext":"y","tag":"z"}"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidEnvelope(_)));
    }
}
