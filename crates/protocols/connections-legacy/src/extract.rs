use did_utils::didcore::{Document, KeyFormat};
use mediator_core::{connection::Target, CoreError, CoreResult};

/// Pulls a usable [`Target`] (recipient keys + endpoint) out of a peer's DID
/// document: every base58-encoded public key in `verificationMethod` as a
/// recipient, and the first service's `serviceEndpoint`.
pub fn target_from_document(doc: &Document) -> CoreResult<Target> {
    let recipients: Vec<String> = doc
        .verification_method
        .as_ref()
        .into_iter()
        .flatten()
        .filter_map(|vm| match &vm.public_key {
            Some(KeyFormat::Base58(s)) => Some(s.clone()),
            _ => None,
        })
        .collect();

    if recipients.is_empty() {
        return Err(CoreError::InvalidEnvelope("peer document has no usable verification key".into()));
    }

    let endpoint = doc
        .service
        .as_ref()
        .and_then(|services| services.first())
        .map(|s| s.service_endpoint.clone())
        .ok_or_else(|| CoreError::InvalidEnvelope("peer document has no service endpoint".into()))?;

    Ok(Target { recipients, endpoint })
}
