use multibase::Base::Base58Btc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cryptographic algorithms recognized by the multicodec prefixes this proxy
/// cares about: the two curves used by `did:key` addresses it hands out or
/// consumes (its own recipient key, and peers' signing/agreement keys).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    Ed25519,
    X25519,
}

use Algorithm::*;

impl Algorithm {
    /// Multicodec prefix, per <https://w3c-ccg.github.io/did-method-key/#signature-method-creation-algorithm>.
    pub fn muticodec_prefix(&self) -> [u8; 2] {
        match self {
            Ed25519 => [0xed, 0x01],
            X25519 => [0xec, 0x01],
        }
    }

    pub fn from_muticodec_prefix(prefix: &[u8; 2]) -> Option<Self> {
        match prefix {
            [0xed, 0x01] => Some(Ed25519),
            [0xec, 0x01] => Some(X25519),
            _ => None,
        }
    }

    pub fn public_key_length(&self) -> usize {
        32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeMultikeyError {
    #[error("error to multibase decode")]
    MultibaseDecodeError,
    #[error("not multibase-encoded in Base58")]
    NotBase58MultibaseEncoded,
    #[error("assumed multicodec too short")]
    MulticodecTooShort,
    #[error("unknown algorithm")]
    UnknownAlgorithm,
}

/// Decodes algorithm and raw key bytes from a multibase-encoded `did:key` value.
pub fn decode_multikey(multikey: &str) -> Result<(Algorithm, Vec<u8>), DecodeMultikeyError> {
    let (base, multicodec) =
        multibase::decode(multikey).map_err(|_| DecodeMultikeyError::MultibaseDecodeError)?;

    if base != Base58Btc {
        return Err(DecodeMultikeyError::NotBase58MultibaseEncoded);
    }
    if multicodec.len() < 2 {
        return Err(DecodeMultikeyError::MulticodecTooShort);
    }

    let multicodec_prefix: &[u8; 2] = &multicodec[..2].try_into().unwrap();
    let raw_public_key_bytes = &multicodec[2..];

    let alg = Algorithm::from_muticodec_prefix(multicodec_prefix)
        .ok_or(DecodeMultikeyError::UnknownAlgorithm)?;

    Ok((alg, raw_public_key_bytes.to_vec()))
}

/// Encodes raw public key bytes as a multibase `did:key` address.
pub fn encode_multikey(alg: Algorithm, raw_public_key_bytes: &[u8]) -> String {
    format!(
        "did:key:{}",
        multibase::encode(Base58Btc, [&alg.muticodec_prefix(), raw_public_key_bytes].concat())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_multikey() {
        let multikey = "z6MkiTBz1ymuepAQ4HEHYSF1H8quG5GLVVQR3djdX3mDooWp";
        let (alg, bytes) = decode_multikey(multikey).unwrap();
        assert_eq!(alg, Algorithm::Ed25519);
        assert_eq!(bytes.len(), 32);

        let multikey = "z6LSbuUXWSgPfpiDBjUK6E7yiCKMN2eKJsXn5b55ZgqGz6Mr";
        let (alg, bytes) = decode_multikey(multikey).unwrap();
        assert_eq!(alg, Algorithm::X25519);
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn test_decode_multikey_negative_cases() {
        let cases = [
            ("Z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK", DecodeMultikeyError::NotBase58MultibaseEncoded),
            ("z6", DecodeMultikeyError::MulticodecTooShort),
            ("z7MkiTBz1ymuepAQ4HEHYSF1H8quG5GLVVQR3djdX3mDooWpd", DecodeMultikeyError::UnknownAlgorithm),
        ];
        for (multikey, expected_err) in cases {
            assert_eq!(decode_multikey(multikey).unwrap_err(), expected_err);
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let bytes = [7u8; 32];
        let did = encode_multikey(Algorithm::Ed25519, &bytes);
        assert!(did.starts_with("did:key:z6Mk"));
        let (alg, decoded) = decode_multikey(did.strip_prefix("did:key:").unwrap()).unwrap();
        assert_eq!(alg, Algorithm::Ed25519);
        assert_eq!(decoded, bytes);
    }
}
