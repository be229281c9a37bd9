//! Minimal JSON Web Key support.
//!
//! Only the octet key pair (OKP) family is modeled, which is all the Ed25519 /
//! X25519 key material flowing through this proxy ever needs.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::crypto::{Ed25519KeyPair, Error as CryptoError, Generate, X25519KeyPair};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl Jwk {
    pub fn public_ed25519(x: &[u8]) -> Self {
        Self {
            kty: "OKP".to_owned(),
            crv: "Ed25519".to_owned(),
            x: URL_SAFE_NO_PAD.encode(x),
            d: None,
        }
    }

    pub fn x_bytes(&self) -> Result<[u8; 32], CryptoError> {
        let raw = URL_SAFE_NO_PAD
            .decode(&self.x)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        raw.try_into().map_err(|_| CryptoError::InvalidKeyLength)
    }

    pub fn d_bytes(&self) -> Result<Option<[u8; 32]>, CryptoError> {
        match &self.d {
            None => Ok(None),
            Some(d) => {
                let raw = URL_SAFE_NO_PAD
                    .decode(d)
                    .map_err(|_| CryptoError::InvalidSecretKey)?;
                Ok(Some(raw.try_into().map_err(|_| CryptoError::InvalidKeyLength)?))
            }
        }
    }
}

impl TryFrom<Jwk> for Ed25519KeyPair {
    type Error = CryptoError;

    fn try_from(jwk: Jwk) -> Result<Self, Self::Error> {
        match jwk.d_bytes()? {
            Some(d) => Ed25519KeyPair::from_secret_key(&d),
            None => Ed25519KeyPair::from_public_key(&jwk.x_bytes()?),
        }
    }
}

impl TryFrom<Jwk> for X25519KeyPair {
    type Error = CryptoError;

    fn try_from(jwk: Jwk) -> Result<Self, Self::Error> {
        match jwk.d_bytes()? {
            Some(d) => X25519KeyPair::from_secret_key(&d),
            None => X25519KeyPair::from_public_key(&jwk.x_bytes()?),
        }
    }
}
