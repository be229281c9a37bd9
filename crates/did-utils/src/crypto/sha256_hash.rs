use sha2::{Digest, Sha256};

/// Returns the raw SHA-256 digest of `data`.
pub fn sha256_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&out);
    buf
}

/// Returns the SHA-256 digest prefixed with the `sha2-256` multihash header,
/// as used to derive `did:peer:2` hashes of long-form peer DIDs.
pub fn sha256_multihash(data: &[u8]) -> Vec<u8> {
    let digest = sha256_hash(data);
    let mut out = vec![0x12, 0x20];
    out.extend_from_slice(&digest);
    out
}
