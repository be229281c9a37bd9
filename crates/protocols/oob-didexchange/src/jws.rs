use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use did_utils::{
    crypto::{decode_multikey, encode_multikey, Algorithm, CoreSign, Ed25519KeyPair, KeyMaterial},
    jwk::Jwk,
};
use mediator_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JwsHeader {
    kid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Jws {
    header: JwsHeader,
    protected: String,
    signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttachmentData {
    base64: String,
    jws: Jws,
}

/// A `did_doc~attach` entry: a DID document carried as a detached, signed
/// attachment rather than inline, per RFC-0023's "signed attachment" shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "mime-type")]
    pub mime_type: String,
    pub data: AttachmentData,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    kid: String,
    jwk: Jwk,
}

/// Signs `doc` with `signer` and wraps it as a `did_doc~attach` value. The
/// signing input is `protected || "." || payload`, both base64url
/// (no padding), matching a detached JWS.
pub fn build_attachment(doc: &Value, signer: &Ed25519KeyPair) -> CoreResult<Attachment> {
    let doc_bytes = serde_json::to_vec(doc).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(doc_bytes);

    let pk = signer.public_key_bytes().map_err(|e| CoreError::Transport(format!("{e:?}")))?;
    let kid = encode_multikey(Algorithm::Ed25519, &pk);
    let protected = ProtectedHeader {
        alg: "EdDSA".to_string(),
        kid: kid.clone(),
        jwk: Jwk::public_ed25519(&pk),
    };
    let protected_b64 = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&protected).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?,
    );

    let signing_input = format!("{protected_b64}.{payload_b64}");
    let signature = signer
        .sign(signing_input.as_bytes())
        .map_err(|e| CoreError::Transport(format!("{e:?}")))?;

    Ok(Attachment {
        id: Uuid::new_v4().to_string(),
        mime_type: "application/json".to_string(),
        data: AttachmentData {
            base64: payload_b64,
            jws: Jws {
                header: JwsHeader { kid },
                protected: protected_b64,
                signature: URL_SAFE_NO_PAD.encode(signature),
            },
        },
    })
}

/// Verifies the detached JWS over an attachment's payload, checking that the
/// `kid` and embedded `jwk` agree, and returns the decoded document.
pub fn verify_attachment(attachment: &Attachment) -> CoreResult<Value> {
    let protected_json = URL_SAFE_NO_PAD
        .decode(&attachment.data.jws.protected)
        .map_err(|_| CoreError::SignatureInvalid)?;
    let protected: ProtectedHeader =
        serde_json::from_slice(&protected_json).map_err(|_| CoreError::SignatureInvalid)?;

    let signer: Ed25519KeyPair = protected.jwk.clone().try_into().map_err(|_| CoreError::SignatureInvalid)?;
    let signer_pk = signer.public_key_bytes().map_err(|_| CoreError::SignatureInvalid)?;

    let multikey = protected.kid.strip_prefix("did:key:").unwrap_or(&protected.kid);
    let (alg, raw) = decode_multikey(multikey).map_err(|_| CoreError::SignatureInvalid)?;
    if alg != Algorithm::Ed25519 || raw != signer_pk {
        return Err(CoreError::SignatureInvalid);
    }

    let signing_input = format!("{}.{}", attachment.data.jws.protected, attachment.data.base64);
    let signature = URL_SAFE_NO_PAD
        .decode(&attachment.data.jws.signature)
        .map_err(|_| CoreError::SignatureInvalid)?;
    signer
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| CoreError::SignatureInvalid)?;

    let doc_bytes = URL_SAFE_NO_PAD
        .decode(&attachment.data.base64)
        .map_err(|_| CoreError::SignatureInvalid)?;
    serde_json::from_slice(&doc_bytes).map_err(|_| CoreError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use did_utils::crypto::Generate;

    #[test]
    fn sign_then_verify_roundtrip() {
        let signer = Ed25519KeyPair::new().unwrap();
        let doc = serde_json::json!({"id": "did:peer:2.example"});
        let attachment = build_attachment(&doc, &signer).unwrap();

        let recovered = verify_attachment(&attachment).unwrap();
        assert_eq!(recovered, doc);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let signer = Ed25519KeyPair::new().unwrap();
        let doc = serde_json::json!({"id": "did:peer:2.example"});
        let mut attachment = build_attachment(&doc, &signer).unwrap();
        attachment.data.base64 = URL_SAFE_NO_PAD.encode(br#"{"id":"did:peer:2.evil"}"#);

        assert!(verify_attachment(&attachment).is_err());
    }
}
