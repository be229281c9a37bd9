use thiserror::Error;

/// Errors arising from key generation, signing and key agreement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid seed")]
    InvalidSeed,
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("signature error")]
    SignatureError,
    #[error("verification error")]
    VerificationError,
    #[error("could not parse signature")]
    CanNotRetrieveSignature,
    #[error("unsupported algorithm")]
    Unsupported,
    #[error("{0}")]
    Other(String),
}
