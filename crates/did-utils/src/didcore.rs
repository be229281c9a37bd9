//! Implements the DID Core specification
//! 
//! As specified by [Decentralized Identifiers (DIDs) v1.0 - Core architecture,
//! data model, and representations][did-core].
//!
//! [did-core]: https://www.w3.org/TR/did-core/

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{jwk::Jwk, ldmodel::Context};

// === Structure of a did document ===

/// Represents a DID Document according to the [DID Core specification][did-core].
/// 
/// [did-core]: https://www.w3.org/TR/did-core/
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    // The @context property defines the vocabulary used in the JSON-LD document.
    // It provides a way to map the keys in the JSON structure to specific terms,
    // properties, and classes from external vocabularies. In the context of a
    // DID Document, the @context property is used to define the vocabulary for
    // the various properties within the document, such as id, publicKey, service, and others.
    #[serde(rename = "@context")]
    pub context: Context,

    // === Identifier ===

    // Identifier property is mandatory in a did document.
    // see https://www.w3.org/TR/did-core/#dfn-id
    #[serde(default = "String::new")]
    pub id: String,

    // See https://www.w3.org/TR/did-core/#dfn-controller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<Controller>,

    // See https://www.w3.org/TR/did-core/#dfn-alsoknownas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub also_known_as: Option<Vec<String>>,

    // === Verification Methods ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<Vec<VerificationMethod>>,

    // === Verification Relationships ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Vec<Authentication>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_method: Option<Vec<AssertionMethod>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_delegation: Option<Vec<CapabilityDelegation>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_invocation: Option<Vec<CapabilityInvocation>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_agreement: Option<Vec<KeyAgreement>>,

    // === Services ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<Service>>,

    // === Dynamic Properties ===
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(flatten)]
    pub additional_properties: Option<HashMap<String, Value>>,
}

impl Default for Document {  
    fn default() -> Self {  
        let id = String::new();  
        let context = Context::SingleString(String::from("https://www.w3.org/ns/did/v1"));  
        
        Self::new(context, id)  
    }  
}

/// Represents a DID Document controller(s).
#[derive(Serialize, Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Controller {
    SingleString(String),
    SetOfString(Vec<String>),
}

/// Represents a [service] in a DID Document.
/// 
/// A service defines how to interact with the DID subject.
/// 
/// [service]: https://www.w3.org/TR/did-core/#services
#[derive(Serialize, Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default = "String::new")]
    pub id: String,

    #[serde(rename = "type")]
    pub service_type: String,

    pub service_endpoint: String,

    // === Additional properties ===
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(flatten)]
    pub additional_properties: Option<HashMap<String, Value>>,
}

/// Represents a [verification method] in a DID Document.
/// 
/// [verification method]: https://www.w3.org/TR/did-core/#verification-methods
#[derive(Serialize, Debug, Clone, PartialEq, Default, Deserialize)]
pub struct VerificationMethod {
    pub id: String,

    #[serde(rename = "type")]
    pub key_type: String,

    pub controller: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "VerificationMethod::serialize_public_key_format")]
    #[serde(deserialize_with = "VerificationMethod::deserialize_public_key_format")]
    #[serde(flatten)]
    pub public_key: Option<KeyFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "VerificationMethod::serialize_private_key_format")]
    #[serde(deserialize_with = "VerificationMethod::deserialize_private_key_format")]
    #[serde(flatten)]
    pub private_key: Option<KeyFormat>,

    // === Additional properties ===
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(flatten)]
    pub additional_properties: Option<HashMap<String, Value>>,
}

/// Represents different formats of keys used in verification methods.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum KeyFormat {
    Base58(String),
    Multibase(String),
    Jwk(Jwk),
}

/// Represents the authentication methods in a DID Document.
#[derive(Serialize, Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Authentication {
    Reference(String),
    Embedded(Box<VerificationMethod>),
}

/// Represents the assertion methods in a DID Document.
#[derive(Serialize, Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AssertionMethod {
    Reference(String),
    Embedded(Box<VerificationMethod>),
}

/// Represents the capability delegation methods in a DID Document.
#[derive(Serialize, Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CapabilityDelegation {
    Reference(String),
    Embedded(Box<VerificationMethod>),
}

/// Represents the capability invocation methods in a DID Document.
#[derive(Serialize, Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CapabilityInvocation {
    Reference(String),
    Embedded(Box<VerificationMethod>),
}

/// Represents the key agreement methods in a DID Document.
#[derive(Serialize, Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KeyAgreement {
    Reference(String),
    Embedded(Box<VerificationMethod>),
}

impl VerificationMethod {

    /// Serializes the private key format into a JSON map with the appropriate key format field.
    fn serialize_private_key_format<S>(value: &Option<KeyFormat>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(KeyFormat::Base58(s)) => {
                let mut obj = serializer.serialize_map(Some(1))?;
                obj.serialize_entry("privateKeyBase58", s)?;
                obj.end()
            }
            Some(KeyFormat::Multibase(s)) => {
                let mut obj = serializer.serialize_map(Some(1))?;
                obj.serialize_entry("privateKeyMultibase", s)?;
                obj.end()
            }
            Some(KeyFormat::Jwk(jwk)) => {
                let mut obj = serializer.serialize_map(Some(1))?;
                obj.serialize_entry("privateKeyJwk", jwk)?;
                obj.end()
            }
            None => serializer.serialize_none(),
        }
    }

    /// Serializes the public key format into a JSON map with the appropriate key format field.
    fn serialize_public_key_format<S>(value: &Option<KeyFormat>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(KeyFormat::Base58(s)) => {
                let mut obj = serializer.serialize_map(Some(1))?;
                obj.serialize_entry("publicKeyBase58", s)?;
                obj.end()
            }
            Some(KeyFormat::Multibase(s)) => {
                let mut obj = serializer.serialize_map(Some(1))?;
                obj.serialize_entry("publicKeyMultibase", s)?;
                obj.end()
            }
            Some(KeyFormat::Jwk(jwk)) => {
                let mut obj = serializer.serialize_map(Some(1))?;
                obj.serialize_entry("publicKeyJwk", jwk)?;
                obj.end()
            }
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes the private key format from a JSON map with the appropriate key format field.
    pub fn deserialize_public_key_format<'de, D>(deserializer: D) -> Result<Option<KeyFormat>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize, Debug)]
        #[serde(rename_all = "camelCase")]
        struct PublicKeyFormat {
            public_key_base58: Option<String>,
            public_key_multibase: Option<String>,
            public_key_jwk: Option<Jwk>,
        }

        let s: PublicKeyFormat = PublicKeyFormat::deserialize(deserializer)?;

        if s.public_key_base58.is_some() {
            return Ok(Some(KeyFormat::Base58(s.public_key_base58.unwrap())));
        }

        if s.public_key_multibase.is_some() {
            return Ok(Some(KeyFormat::Multibase(s.public_key_multibase.unwrap())));
        }

        if s.public_key_jwk.is_some() {
            return Ok(Some(KeyFormat::Jwk(s.public_key_jwk.unwrap())));
        }

        Ok(None)
    }

    /// Deserializes the private key format from a JSON map with the appropriate key format field.
    pub fn deserialize_private_key_format<'de, D>(deserializer: D) -> Result<Option<KeyFormat>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize, Debug)]
        #[serde(rename_all = "camelCase")]
        struct PrivateKeyFormat {
            private_key_base58: Option<String>,
            private_key_multibase: Option<String>,
            private_key_jwk: Option<Jwk>,
        }

        let s: PrivateKeyFormat = PrivateKeyFormat::deserialize(deserializer)?;

        if s.private_key_base58.is_some() {
            return Ok(Some(KeyFormat::Base58(s.private_key_base58.unwrap())));
        }

        if s.private_key_multibase.is_some() {
            return Ok(Some(KeyFormat::Multibase(s.private_key_multibase.unwrap())));
        }

        if s.private_key_jwk.is_some() {
            return Ok(Some(KeyFormat::Jwk(s.private_key_jwk.unwrap())));
        }

        Ok(None)
    }
}

impl Document {
    /// Builds a bare document carrying only `@context` and `id`, with every
    /// other property left unset.
    pub fn new(context: Context, id: String) -> Self {
        Self {
            context,
            id,
            controller: None,
            also_known_as: None,
            verification_method: None,
            authentication: None,
            assertion_method: None,
            capability_delegation: None,
            capability_invocation: None,
            key_agreement: None,
            service: None,
            additional_properties: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_document_has_empty_id() {
        let doc = Document::default();
        assert_eq!(doc.id, "");
        assert!(matches!(doc.context, Context::SingleString(_)));
    }

    #[test]
    fn test_deserialize_verification_method_base58() {
        let vm: VerificationMethod = serde_json::from_str(
            r#"{
                "id": "did:key:z6Mk#keys-1",
                "type": "Ed25519VerificationKey2018",
                "controller": "did:key:z6Mk",
                "publicKeyBase58": "H3C2AVvLMv6gmMNam3uVAjZpfkcJCwDwnZn6z3wXmqPV"
            }"#,
        )
        .unwrap();

        assert!(matches!(vm.public_key, Some(KeyFormat::Base58(_))));
        assert!(vm.private_key.is_none());
    }

    #[test]
    fn test_deserialize_verification_method_jwk() {
        let vm: VerificationMethod = serde_json::from_str(
            r#"{
                "id": "did:key:z6LS#keys-1",
                "type": "JsonWebKey2020",
                "controller": "did:key:z6LS",
                "publicKeyJwk": {
                    "kty": "OKP",
                    "crv": "X25519",
                    "x": "psQvZbwHAW4z2wrTKGbl4mFyzSIGy_Cw7ov-ep0TWAM"
                }
            }"#,
        )
        .unwrap();

        match vm.public_key {
            Some(KeyFormat::Jwk(jwk)) => assert_eq!(jwk.crv, "X25519"),
            _ => panic!("expected a JWK public key"),
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let doc = Document::new(
            Context::SingleString("https://www.w3.org/ns/did/v1".to_owned()),
            "did:peer:2.Ez6Mk.Vz6Mk".to_owned(),
        );
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, parsed);
    }
}
