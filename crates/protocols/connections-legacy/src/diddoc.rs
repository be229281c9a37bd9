use did_utils::{
    didcore::{Document, KeyAgreement, KeyFormat, Service, VerificationMethod},
    ldmodel::Context,
};

/// Builds a minimal did-core document for `did`/`verkey_b58`, advertising a
/// single `did-communication` service at `endpoint`. The proxy controls both
/// ends of its own legacy connections, so it emits the normalized document
/// shape directly rather than the original Indy `publicKey`/`IndyAgent`
/// shape that `doc_normalization` (see the `oob-didexchange` crate) exists to
/// rewrite for third-party peers.
pub fn build(did: &str, verkey_b58: &str, endpoint: &str) -> Document {
    let vm_id = format!("{did}#1");
    let vm = VerificationMethod {
        id: vm_id.clone(),
        key_type: "Ed25519VerificationKey2018".to_string(),
        controller: did.to_string(),
        revoked: None,
        public_key: Some(KeyFormat::Base58(verkey_b58.to_string())),
        private_key: None,
        additional_properties: None,
    };

    let mut doc = Document::new(Context::SingleString("https://www.w3.org/ns/did/v1".to_string()), did.to_string());
    doc.verification_method = Some(vec![vm]);
    doc.authentication = Some(vec![did_utils::didcore::Authentication::Reference(vm_id.clone())]);
    doc.key_agreement = Some(vec![KeyAgreement::Reference(vm_id)]);
    doc.service = Some(vec![Service {
        id: format!("{did}#did-communication"),
        service_type: "did-communication".to_string(),
        service_endpoint: endpoint.to_string(),
        additional_properties: None,
    }]);
    doc
}
