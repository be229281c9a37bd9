use did_utils::{didcore::Document, ldmodel::Context};

/// Picks the websocket endpoint out of a DID document's service list: the
/// first `serviceEndpoint` starting with `ws` (covers both `ws://` and
/// `wss://`). `None` if the document carries no such service.
pub fn ws_endpoint(doc: &Document) -> Option<String> {
    doc.service
        .as_ref()?
        .iter()
        .map(|s| s.service_endpoint.clone())
        .find(|endpoint| endpoint.starts_with("ws"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use did_utils::didcore::Service;

    fn doc_with(endpoints: Vec<&str>) -> Document {
        let mut doc = Document::new(Context::SingleString("https://www.w3.org/ns/did/v1".to_string()), "did:peer:2.test".to_string());
        doc.service = Some(
            endpoints
                .into_iter()
                .map(|e| Service {
                    id: "#1".into(),
                    service_type: "did-communication".into(),
                    service_endpoint: e.into(),
                    additional_properties: None,
                })
                .collect(),
        );
        doc
    }

    #[test]
    fn finds_a_ws_endpoint_among_others() {
        let doc = doc_with(vec!["https://agents-r-us.org", "wss://agents-r-us.org/ws"]);
        assert_eq!(ws_endpoint(&doc).as_deref(), Some("wss://agents-r-us.org/ws"));
    }

    #[test]
    fn none_when_no_service_has_a_ws_endpoint() {
        let doc = doc_with(vec!["https://agents-r-us.org"]);
        assert_eq!(ws_endpoint(&doc), None);
    }

    #[test]
    fn none_when_no_service_at_all() {
        let doc = Document::new(Context::SingleString("https://www.w3.org/ns/did/v1".to_string()), "did:peer:2.test".to_string());
        assert_eq!(ws_endpoint(&doc), None);
    }
}
