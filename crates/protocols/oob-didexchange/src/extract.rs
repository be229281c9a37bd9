use did_utils::didcore::{Document, KeyFormat};
use mediator_core::{connection::Target, CoreError, CoreResult};

/// Pulls a usable [`Target`] out of a (by this point, already normalized)
/// peer document: every base58-encoded verification key as a recipient, and
/// the first `did-communication` service's endpoint.
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
        .into_iter()
        .flatten()
        .find(|s| s.service_type == "did-communication")
        .or_else(|| doc.service.as_ref().and_then(|s| s.first()))
        .map(|s| s.service_endpoint.clone())
        .ok_or_else(|| CoreError::InvalidEnvelope("peer document has no service endpoint".into()))?;

    Ok(Target { recipients, endpoint })
}
