use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The legacy sovrin doc-uri, still emitted by some peers for backward compatibility.
pub const SOV_DOC_URI: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/";

/// The current didcomm.org doc-uri.
pub const DIDCOMM_ORG_DOC_URI: &str = "https://didcomm.org/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,
}

/// A decoded DIDComm plaintext message together with the trust context the
/// envelope was unpacked with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "@type")]
    pub type_: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "~thread", skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[serde(flatten)]
    pub body: Value,

    /// The verification key the sender authenticated with, if any.
    /// Not part of the wire payload.
    #[serde(skip)]
    pub sender_verkey: Option<String>,

    /// The local verification key this message was decrypted for.
    /// Not part of the wire payload.
    #[serde(skip)]
    pub recipient_verkey: Option<String>,
}

impl Message {
    pub fn new(type_: impl Into<String>, body: Value) -> Self {
        Self {
            type_: type_.into(),
            id: uuid::Uuid::new_v4().to_string(),
            thread: None,
            body,
            sender_verkey: None,
            recipient_verkey: None,
        }
    }

    pub fn with_thread(mut self, thid: impl Into<String>, pthid: Option<String>) -> Self {
        self.thread = Some(Thread {
            thid: Some(thid.into()),
            pthid,
        });
        self
    }

    /// Returns the `(doc_uri, protocol, version, message_name)` quadruple this
    /// message's `@type` decomposes into, normalizing the legacy sovrin prefix
    /// to the current one.
    pub fn type_parts(&self) -> Option<(&'static str, String, String, String)> {
        let (prefix, rest) = if let Some(rest) = self.type_.strip_prefix(SOV_DOC_URI) {
            (DIDCOMM_ORG_DOC_URI, rest)
        } else if let Some(rest) = self.type_.strip_prefix(DIDCOMM_ORG_DOC_URI) {
            (DIDCOMM_ORG_DOC_URI, rest)
        } else {
            return None;
        };

        let mut parts = rest.splitn(3, '/');
        let protocol = parts.next()?.to_string();
        let version = parts.next()?.to_string();
        let name = parts.next()?.to_string();
        Some((prefix, protocol, version, name))
    }

    /// Builds a fully-qualified `@type` under the canonical didcomm.org prefix.
    pub fn qualify(protocol: &str, version: &str, name: &str) -> String {
        format!("{DIDCOMM_ORG_DOC_URI}{protocol}/{version}/{name}")
    }
}
