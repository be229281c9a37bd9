use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use did_utils::crypto::{encode_multikey, Algorithm, Ed25519KeyPair, KeyMaterial};
use mediator_core::{CoreError, CoreResult};
use serde_json::json;

/// Builds this proxy's own `did:peer:2` identifier: a short-form peer DID
/// that encodes its key-agreement key (`E`), verification key (`V`), and an
/// abbreviated `did-communication` service (`S`) directly in the identifier,
/// needing no registry or resolver.
///
/// See <https://identity.foundation/peer-did-method-spec/#generation-method>.
pub fn encode(keypair: &Ed25519KeyPair, endpoint: &str) -> CoreResult<String> {
    let pk = keypair.public_key_bytes().map_err(|e| CoreError::Transport(format!("{e:?}")))?;
    let verification_key = encode_multikey(Algorithm::Ed25519, &pk);
    let verification_multibase = verification_key.strip_prefix("did:key:").unwrap_or(&verification_key);

    let x25519 = keypair.get_x25519().map_err(|e| CoreError::Transport(format!("{e:?}")))?;
    let xpk = x25519.public_key_bytes().map_err(|e| CoreError::Transport(format!("{e:?}")))?;
    let agreement_key = encode_multikey(Algorithm::X25519, &xpk);
    let agreement_multibase = agreement_key.strip_prefix("did:key:").unwrap_or(&agreement_key);

    let service = json!({ "t": "dm", "s": endpoint });
    let service_b64 = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&service).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?,
    );

    Ok(format!("did:peer:2.E{agreement_multibase}.V{verification_multibase}.S{service_b64}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use did_utils::crypto::Generate;

    #[test]
    fn encodes_recognizable_did_peer_2() {
        let keypair = Ed25519KeyPair::new().unwrap();
        let did = encode(&keypair, "https://example.org/endpoint").unwrap();
        assert!(did.starts_with("did:peer:2.Ez"));
        assert!(did.contains(".Vz"));
        assert!(did.contains(".S"));
        assert!(!did.contains(".Ezz") && !did.contains(".Vzz"));
    }
}
