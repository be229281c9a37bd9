use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use did_utils::crypto::{CoreSign, Ed25519KeyPair, Generate, KeyMaterial};
use mediator_core::{message::Message, CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The Aries "signature decorator" (`connection~sig`): a detached Ed25519
/// signature over an 8-byte big-endian timestamp concatenated with the
/// signed document's JSON bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureDecorator {
    #[serde(rename = "@type")]
    pub type_: String,
    pub sig_data: String,
    pub signer: String,
    pub signature: String,
}

const SIG_TYPE: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/signature/1.0/ed25519Sha512_single";

/// Builds the bytes actually signed: an 8-byte big-endian timestamp
/// concatenated with the document's JSON bytes.
pub fn sig_data_bytes(doc: &Value, timestamp_secs: u64) -> CoreResult<Vec<u8>> {
    let doc_bytes = serde_json::to_vec(doc).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let mut bytes = timestamp_secs.to_be_bytes().to_vec();
    bytes.extend_from_slice(&doc_bytes);
    Ok(bytes)
}

/// Assembles a decorator from an already-computed signature, for callers
/// (like a [`mediator_core::Connection`]) that sign through their own
/// `sign()` method rather than handling an `Ed25519KeyPair` directly.
pub fn assemble(sig_data: Vec<u8>, signature: Vec<u8>, signer_verkey: String) -> SignatureDecorator {
    SignatureDecorator {
        type_: SIG_TYPE.to_string(),
        sig_data: URL_SAFE_NO_PAD.encode(sig_data),
        signer: signer_verkey,
        signature: URL_SAFE_NO_PAD.encode(signature),
    }
}

pub fn sign(doc: &Value, signer: &Ed25519KeyPair, timestamp_secs: u64) -> CoreResult<SignatureDecorator> {
    let sig_data = sig_data_bytes(doc, timestamp_secs)?;
    let signature = signer
        .sign(&sig_data)
        .map_err(|e| CoreError::Transport(format!("{e:?}")))?;
    let signer_verkey = bs58::encode(signer.public_key_bytes().map_err(|e| CoreError::Transport(format!("{e:?}")))?)
        .into_string();
    Ok(assemble(sig_data, signature, signer_verkey))
}

/// Verifies `decorator` was signed by `decorator.signer` and returns the
/// embedded document. Callers that require the signer to equal a specific
/// key (e.g. the invitation key) must check `decorator.signer` themselves.
pub fn verify_and_extract(decorator: &SignatureDecorator) -> CoreResult<Value> {
    let sig_data = URL_SAFE_NO_PAD
        .decode(&decorator.sig_data)
        .map_err(|_| CoreError::SignatureInvalid)?;
    let signature = URL_SAFE_NO_PAD
        .decode(&decorator.signature)
        .map_err(|_| CoreError::SignatureInvalid)?;

    let raw = bs58::decode(&decorator.signer)
        .into_vec()
        .map_err(|_| CoreError::SignatureInvalid)?;
    let raw: [u8; 32] = raw.try_into().map_err(|_| CoreError::SignatureInvalid)?;
    let signer_key = Ed25519KeyPair::from_public_key(&raw).map_err(|_| CoreError::SignatureInvalid)?;

    signer_key
        .verify(&sig_data, &signature)
        .map_err(|_| CoreError::SignatureInvalid)?;

    if sig_data.len() < 8 {
        return Err(CoreError::SignatureInvalid);
    }
    let doc_bytes = &sig_data[8..];
    serde_json::from_slice(doc_bytes).map_err(|_| CoreError::SignatureInvalid)
}

pub fn message_body_from_decorator(decorator: SignatureDecorator) -> Value {
    serde_json::json!({ "connection~sig": decorator })
}

pub fn decorator_from_message(msg: &Message) -> CoreResult<SignatureDecorator> {
    let sig = msg
        .body
        .get("connection~sig")
        .cloned()
        .ok_or(CoreError::SignatureInvalid)?;
    serde_json::from_value(sig).map_err(|_| CoreError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_roundtrip() {
        let signer = Ed25519KeyPair::new().unwrap();
        let doc = serde_json::json!({"hello": "world"});
        let decorator = sign(&doc, &signer, 1_700_000_000).unwrap();

        let extracted = verify_and_extract(&decorator).unwrap();
        assert_eq!(extracted, doc);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let signer = Ed25519KeyPair::new().unwrap();
        let doc = serde_json::json!({"hello": "world"});
        let mut decorator = sign(&doc, &signer, 1_700_000_000).unwrap();
        decorator.signature = URL_SAFE_NO_PAD.encode(b"not a real signature padded to 64 bytes!!!!!!!!!!!!!!!!!!!!!!!!");

        assert!(verify_and_extract(&decorator).is_err());
    }
}
