//! Keccak-256 hashing and the Ethereum signed-message hash.

use sha3::{Digest, Keccak256};

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest a payload the way Ethereum wallets do: keccak the payload, then
/// keccak again under the personal-message prefix. Signatures over this
/// digest are what the validity pipeline recovers against.
pub fn sign_hash(payload: &[u8]) -> [u8; 32] {
    let inner = keccak256(payload);
    let mut prefixed = Vec::with_capacity(28 + inner.len());
    prefixed.extend_from_slice(b"\x19Ethereum Signed Message:\n32");
    prefixed.extend_from_slice(&inner);
    keccak256(&prefixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_known_vector() {
        // keccak256("") from the Ethereum yellow paper
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn sign_hash_differs_from_plain_keccak() {
        let payload = b"spend";
        assert_ne!(sign_hash(payload), keccak256(payload));
        // deterministic
        assert_eq!(sign_hash(payload), sign_hash(payload));
    }
}
