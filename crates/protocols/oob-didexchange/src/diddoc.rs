use did_utils::{
    didcore::{Document, KeyAgreement, KeyFormat, Service, VerificationMethod},
    ldmodel::Context,
};
use mediator_core::CoreResult;

use crate::peer;

/// Builds this proxy's own did-core document for a DID-exchange connection,
/// addressed by its `did:peer:2` identifier rather than the legacy
/// protocol's `did:sov`-style short DID.
pub fn build(verkey_b58: &str, endpoint: &str, keypair: &did_utils::crypto::Ed25519KeyPair) -> CoreResult<Document> {
    let did = peer::encode(keypair, endpoint)?;
    let vm_id = format!("{did}#key-1");
    let vm = VerificationMethod {
        id: vm_id.clone(),
        key_type: "Ed25519VerificationKey2018".to_string(),
        controller: did.clone(),
        revoked: None,
        public_key: Some(KeyFormat::Base58(verkey_b58.to_string())),
        private_key: None,
        additional_properties: None,
    };

    let mut doc = Document::new(Context::SingleString("https://www.w3.org/ns/did/v1".to_string()), did.clone());
    doc.verification_method = Some(vec![vm]);
    doc.authentication = Some(vec![did_utils::didcore::Authentication::Reference(vm_id.clone())]);
    doc.key_agreement = Some(vec![KeyAgreement::Reference(vm_id)]);
    doc.service = Some(vec![Service {
        id: format!("{did}#did-communication"),
        service_type: "did-communication".to_string(),
        service_endpoint: endpoint.to_string(),
        additional_properties: None,
    }]);
    Ok(doc)
}
