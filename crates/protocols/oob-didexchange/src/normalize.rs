use std::collections::HashMap;

use did_utils::{
    crypto::{encode_multikey, Algorithm},
    didcore::{Authentication, Document, KeyAgreement, KeyFormat, Service, VerificationMethod},
    ldmodel::Context,
};
use mediator_core::{CoreError, CoreResult};
use serde_json::Value;

/// Rewrites a raw peer document into the did-core shape the rest of this
/// proxy works with. Third-party agents reached through OOB/DID-exchange
/// still sometimes send the older Indy shape (`publicKey` rather than
/// `verificationMethod`, `IndyAgent` rather than `did-communication`
/// services); this is the one place in the proxy that has to understand it,
/// since `connections-legacy` controls both ends of its own documents and
/// never needs to read anyone else's.
///
/// A document already in did-core shape (carrying `verificationMethod`)
/// deserializes and is returned as-is.
pub fn normalize(raw: &Value) -> CoreResult<Document> {
    if let Ok(doc) = serde_json::from_value::<Document>(raw.clone()) {
        if doc.verification_method.is_some() {
            return Ok(doc);
        }
    }

    let did = raw
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::InvalidEnvelope("document missing id".into()))?
        .to_string();

    let qualify = |fragment: &str| -> String {
        if fragment.starts_with("did:") {
            fragment.to_string()
        } else if let Some(frag) = fragment.strip_prefix('#') {
            format!("{did}#{frag}")
        } else {
            format!("{did}#{fragment}")
        }
    };

    let mut verification_method = Vec::new();
    if let Some(keys) = raw.get("publicKey").and_then(Value::as_array) {
        for key in keys {
            let id = qualify(key.get("id").and_then(Value::as_str).unwrap_or_default());
            let controller = key
                .get("controller")
                .and_then(Value::as_str)
                .map(qualify)
                .unwrap_or_else(|| did.clone());
            let public_key = key
                .get("publicKeyBase58")
                .and_then(Value::as_str)
                .map(|s| KeyFormat::Base58(s.to_string()));
            verification_method.push(VerificationMethod {
                id,
                key_type: key
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("Ed25519VerificationKey2018")
                    .to_string(),
                controller,
                revoked: None,
                public_key,
                private_key: None,
                additional_properties: None,
            });
        }
    }

    let mut services = Vec::new();
    if let Some(raw_services) = raw.get("service").and_then(Value::as_array) {
        for svc in raw_services {
            let service_type = svc.get("type").and_then(Value::as_str).unwrap_or_default();
            let endpoint = svc
                .get("serviceEndpoint")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let id = qualify(svc.get("id").and_then(Value::as_str).unwrap_or("did-communication"));

            if service_type == "IndyAgent" {
                // IndyAgent carries its usable keys inline on the service
                // rather than in the document's verification methods; lift
                // each one into its own verification method so the rest of
                // the proxy can treat every key uniformly, and re-express
                // routingKeys as did:key references per did-core's convention.
                if let Some(recipient_keys) = svc.get("recipientKeys").and_then(Value::as_array) {
                    for (i, rk) in recipient_keys.iter().enumerate() {
                        if let Some(b58) = rk.as_str() {
                            verification_method.push(VerificationMethod {
                                id: format!("{did}#indy-recipient-{i}"),
                                key_type: "Ed25519VerificationKey2018".to_string(),
                                controller: did.clone(),
                                revoked: None,
                                public_key: Some(KeyFormat::Base58(b58.to_string())),
                                private_key: None,
                                additional_properties: None,
                            });
                        }
                    }
                }

                let routing_keys: Vec<Value> = svc
                    .get("routingKeys")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str)
                    .filter_map(|b58| {
                        let raw = bs58::decode(b58).into_vec().ok()?;
                        Some(Value::String(encode_multikey(Algorithm::Ed25519, &raw)))
                    })
                    .collect();

                let mut additional_properties = HashMap::new();
                if !routing_keys.is_empty() {
                    additional_properties.insert("routingKeys".to_string(), Value::Array(routing_keys));
                }

                services.push(Service {
                    id,
                    service_type: "did-communication".to_string(),
                    service_endpoint: endpoint,
                    additional_properties: (!additional_properties.is_empty()).then_some(additional_properties),
                });
            } else {
                services.push(Service {
                    id,
                    service_type: service_type.to_string(),
                    service_endpoint: endpoint,
                    additional_properties: None,
                });
            }
        }
    }

    let authentication = verification_method
        .iter()
        .map(|vm| Authentication::Reference(vm.id.clone()))
        .collect::<Vec<_>>();
    let key_agreement = verification_method
        .iter()
        .map(|vm| KeyAgreement::Reference(vm.id.clone()))
        .collect::<Vec<_>>();

    let mut doc = Document::new(Context::SingleString("https://www.w3.org/ns/did/v1".to_string()), did);
    doc.authentication = (!authentication.is_empty()).then_some(authentication);
    doc.key_agreement = (!key_agreement.is_empty()).then_some(key_agreement);
    doc.verification_method = (!verification_method.is_empty()).then_some(verification_method);
    doc.service = (!services.is_empty()).then_some(services);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_indy_agent_service_and_public_key() {
        let raw = serde_json::json!({
            "@context": "https://w3id.org/did/v1",
            "id": "did:sov:ABCDEFGHIJKLMNOPQRST",
            "publicKey": [{
                "id": "#1",
                "type": "Ed25519VerificationKey2018",
                "controller": "did:sov:ABCDEFGHIJKLMNOPQRST",
                "publicKeyBase58": "5yx1wAVkDtKdUzEYAzHBBHxZ8KAHvDQ2EGBvaTDkJxC7"
            }],
            "service": [{
                "id": "did:sov:ABCDEFGHIJKLMNOPQRST;indy",
                "type": "IndyAgent",
                "priority": 0,
                "recipientKeys": ["5yx1wAVkDtKdUzEYAzHBBHxZ8KAHvDQ2EGBvaTDkJxC7"],
                "routingKeys": [],
                "serviceEndpoint": "https://example.org/endpoint"
            }]
        });

        let doc = normalize(&raw).unwrap();
        assert_eq!(doc.id, "did:sov:ABCDEFGHIJKLMNOPQRST");
        let services = doc.service.unwrap();
        assert_eq!(services[0].service_type, "did-communication");
        let methods = doc.verification_method.unwrap();
        assert!(methods.iter().any(|vm| matches!(&vm.public_key, Some(KeyFormat::Base58(k)) if k == "5yx1wAVkDtKdUzEYAzHBBHxZ8KAHvDQ2EGBvaTDkJxC7")));
    }

    #[test]
    fn already_normalized_document_passes_through() {
        let raw = serde_json::json!({
            "@context": "https://www.w3.org/ns/did/v1",
            "id": "did:peer:2.example",
            "verificationMethod": [{
                "id": "did:peer:2.example#1",
                "type": "Ed25519VerificationKey2018",
                "controller": "did:peer:2.example",
                "publicKeyBase58": "5yx1wAVkDtKdUzEYAzHBBHxZ8KAHvDQ2EGBvaTDkJxC7"
            }]
        });
        let doc = normalize(&raw).unwrap();
        assert_eq!(doc.id, "did:peer:2.example");
    }
}
