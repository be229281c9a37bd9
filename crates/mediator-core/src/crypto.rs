//! AuthCrypt-style envelope sealing and opening.
//!
//! Every recipient's content-encryption key (CEK) is wrapped under an X25519
//! shared secret derived from the sender's key-agreement key and the
//! recipient's key-agreement key (both Montgomery-form conversions of
//! Ed25519 verkeys, see [`did_utils::crypto::Ed25519KeyPair::get_x25519`]).
//! The body is then sealed once, under the CEK, with ChaCha20-Poly1305.
//!
//! This realizes Aries RFC-0019 AuthCrypt using the crates this workspace
//! already depends on for key agreement and AEAD, rather than libsodium's
//! `crypto_box`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use did_utils::crypto::{Ed25519KeyPair, Generate, KeyMaterial, ECDH};
use sha2::{Digest, Sha256};

use crate::{
    envelope::{PackedMessage, ProtectedHeader, Recipient, RecipientHeader},
    error::CoreError,
};

fn derive_wrap_key(shared_secret: &[u8]) -> Key {
    let digest = Sha256::digest(shared_secret);
    *Key::from_slice(&digest)
}

/// Seals `plaintext` to every key in `recipient_verkeys`, authenticated as
/// having come from `sender`.
pub fn pack(plaintext: &[u8], recipient_verkeys: &[String], sender: &Ed25519KeyPair) -> Result<Vec<u8>, CoreError> {
    let sender_x25519 = sender
        .get_x25519()
        .map_err(|e| CoreError::Transport(format!("cannot derive key-agreement key: {e:?}")))?;
    let sender_verkey_b58 = bs58::encode(
        sender
            .public_key_bytes()
            .map_err(|e| CoreError::Transport(format!("{e:?}")))?,
    )
    .into_string();

    let cek = ChaCha20Poly1305::generate_key(&mut chacha20poly1305::aead::OsRng);

    let mut recipients = Vec::with_capacity(recipient_verkeys.len());
    for kid in recipient_verkeys {
        let raw = bs58::decode(kid)
            .into_vec()
            .map_err(|_| CoreError::InvalidEnvelope(format!("recipient kid {kid} is not base58")))?;
        let raw: [u8; 32] = raw
            .try_into()
            .map_err(|_| CoreError::InvalidEnvelope(format!("recipient kid {kid} is not 32 bytes")))?;
        let recipient_ed = Ed25519KeyPair::from_public_key(&raw)
            .map_err(|e| CoreError::InvalidEnvelope(format!("bad recipient key: {e:?}")))?;
        let recipient_x25519 = recipient_ed
            .get_x25519()
            .map_err(|e| CoreError::Transport(format!("{e:?}")))?;

        let shared = sender_x25519
            .key_exchange(&recipient_x25519)
            .ok_or_else(|| CoreError::Transport("key exchange failed: missing secret key".into()))?;
        let wrap_key = derive_wrap_key(&shared);
        let cipher = ChaCha20Poly1305::new(&wrap_key);

        let iv = ChaCha20Poly1305::generate_nonce(&mut chacha20poly1305::aead::OsRng);
        let encrypted_key = cipher
            .encrypt(&iv, cek.as_slice())
            .map_err(|_| CoreError::Transport("failed to wrap content-encryption key".into()))?;

        recipients.push(Recipient {
            encrypted_key: URL_SAFE_NO_PAD.encode(encrypted_key),
            header: RecipientHeader {
                kid: kid.clone(),
                iv: Some(URL_SAFE_NO_PAD.encode(iv)),
                sender: Some(sender_verkey_b58.clone()),
            },
        });
    }

    let header = ProtectedHeader {
        enc: "chacha20poly1305_ietf".into(),
        typ: "JWM/1.0".into(),
        alg: "Authcrypt".into(),
        recipients,
    };
    let protected_b64 = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&header).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?,
    );

    let body_cipher = ChaCha20Poly1305::new(&cek);
    let body_nonce = ChaCha20Poly1305::generate_nonce(&mut chacha20poly1305::aead::OsRng);
    let mut sealed = body_cipher
        .encrypt(&body_nonce, plaintext)
        .map_err(|_| CoreError::Transport("failed to seal body".into()))?;
    // ChaCha20Poly1305's `encrypt` appends the 16-byte tag; split it back out
    // so the wire shape matches JWE's separate ciphertext/tag fields.
    let tag = sealed.split_off(sealed.len() - 16);

    let packed = PackedMessage {
        protected: protected_b64,
        iv: URL_SAFE_NO_PAD.encode(body_nonce),
        ciphertext: URL_SAFE_NO_PAD.encode(sealed),
        tag: URL_SAFE_NO_PAD.encode(tag),
    };
    serde_json::to_vec(&packed).map_err(|e| CoreError::InvalidEnvelope(e.to_string()))
}

/// Finds `recipient_verkey`'s entry in `packed`, unwraps its CEK using
/// `recipient`'s secret key-agreement key, and opens the body. Returns the
/// plaintext and the sender's verkey, if the sender authenticated.
pub fn unpack(packed: &[u8], recipient: &Ed25519KeyPair, recipient_verkey: &str) -> Result<(Vec<u8>, Option<String>), CoreError> {
    let msg = PackedMessage::from_slice(packed)?;
    let header = msg.decode_protected()?;

    let entry = header
        .recipients
        .iter()
        .find(|r| r.header.kid == recipient_verkey)
        .ok_or(CoreError::ConnectionNotFound)?;

    let sender_verkey = entry.header.sender.clone();

    let sender_x25519 = match &sender_verkey {
        Some(vk) => {
            let raw = bs58::decode(vk)
                .into_vec()
                .map_err(|_| CoreError::InvalidEnvelope("sender kid not base58".into()))?;
            let raw: [u8; 32] = raw
                .try_into()
                .map_err(|_| CoreError::InvalidEnvelope("sender kid not 32 bytes".into()))?;
            Ed25519KeyPair::from_public_key(&raw)
                .map_err(|e| CoreError::InvalidEnvelope(format!("bad sender key: {e:?}")))?
                .get_x25519()
                .map_err(|e| CoreError::Transport(format!("{e:?}")))?
        }
        None => return Err(CoreError::SignatureInvalid),
    };

    let recipient_x25519 = recipient
        .get_x25519()
        .map_err(|e| CoreError::Transport(format!("{e:?}")))?;
    let shared = recipient_x25519
        .key_exchange(&sender_x25519)
        .ok_or_else(|| CoreError::Transport("key exchange failed: missing secret key".into()))?;
    let wrap_key = derive_wrap_key(&shared);
    let cipher = ChaCha20Poly1305::new(&wrap_key);

    let iv = entry
        .header
        .iv
        .as_ref()
        .ok_or_else(|| CoreError::InvalidEnvelope("missing recipient iv".into()))?;
    let iv_bytes = URL_SAFE_NO_PAD
        .decode(iv)
        .map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let nonce = Nonce::from_slice(&iv_bytes);

    let encrypted_key = URL_SAFE_NO_PAD
        .decode(&entry.encrypted_key)
        .map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let cek_bytes = cipher
        .decrypt(nonce, encrypted_key.as_slice())
        .map_err(|_| CoreError::SignatureInvalid)?;
    let cek = Key::from_slice(&cek_bytes);

    let body_nonce_bytes = URL_SAFE_NO_PAD
        .decode(&msg.iv)
        .map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let body_nonce = Nonce::from_slice(&body_nonce_bytes);
    let mut ciphertext = URL_SAFE_NO_PAD
        .decode(&msg.ciphertext)
        .map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    let tag = URL_SAFE_NO_PAD
        .decode(&msg.tag)
        .map_err(|e| CoreError::InvalidEnvelope(e.to_string()))?;
    ciphertext.extend_from_slice(&tag);

    let body_cipher = ChaCha20Poly1305::new(cek);
    let plaintext = body_cipher
        .decrypt(body_nonce, ciphertext.as_slice())
        .map_err(|_| CoreError::SignatureInvalid)?;

    Ok((plaintext, sender_verkey))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        let sender = Ed25519KeyPair::new().unwrap();
        let recipient = Ed25519KeyPair::new().unwrap();
        let recipient_verkey = bs58::encode(recipient.public_key_bytes().unwrap()).into_string();

        let packed = pack(b"hello world", &[recipient_verkey.clone()], &sender).unwrap();
        let (plaintext, sender_vk) = unpack(&packed, &recipient, &recipient_verkey).unwrap();

        assert_eq!(plaintext, b"hello world");
        let expected_sender = bs58::encode(sender.public_key_bytes().unwrap()).into_string();
        assert_eq!(sender_vk, Some(expected_sender));
    }

    #[test]
    fn unpack_fails_for_wrong_recipient() {
        let sender = Ed25519KeyPair::new().unwrap();
        let recipient = Ed25519KeyPair::new().unwrap();
        let other = Ed25519KeyPair::new().unwrap();
        let recipient_verkey = bs58::encode(recipient.public_key_bytes().unwrap()).into_string();

        let packed = pack(b"hello world", &[recipient_verkey.clone()], &sender).unwrap();
        let err = unpack(&packed, &other, &recipient_verkey).unwrap_err();
        assert!(matches!(err, CoreError::Transport(_) | CoreError::SignatureInvalid));
    }
}
