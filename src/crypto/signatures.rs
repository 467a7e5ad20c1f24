//! Recoverable ECDSA signatures over secp256k1.
//!
//! The sidechain authenticates spends the way Ethereum does: a 65-byte
//! `r ‖ s ‖ v` signature over the transaction's sign hash, verified by
//! recovering the signer address and comparing it to the claimed owner.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use web3::types::Address;

use crate::crypto::hash::keccak256;
use crate::error::PlasmaError;

/// Length of a recoverable signature: 32-byte r, 32-byte s, 1-byte v.
pub const SIGNATURE_BYTES: usize = 65;

/// Sign a 32-byte digest, producing the 65-byte recoverable form. The
/// recovery byte is emitted as 27/28 per the Ethereum convention.
pub fn sign_digest(digest: &[u8; 32], secret: &SecretKey) -> Result<Vec<u8>, PlasmaError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest)
        .map_err(|e| PlasmaError::Unauthorized(format!("invalid digest: {e}")))?;
    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, secret)
        .serialize_compact();

    let mut out = Vec::with_capacity(SIGNATURE_BYTES);
    out.extend_from_slice(&compact);
    out.push(27 + recovery_id.to_i32() as u8);
    Ok(out)
}

/// Recover the signer address from a 65-byte signature over a digest.
/// Accepts recovery bytes in both the 0/1 and 27/28 conventions.
pub fn recover_address(digest: &[u8; 32], signature: &[u8]) -> Result<Address, PlasmaError> {
    if signature.len() != SIGNATURE_BYTES {
        return Err(PlasmaError::Unauthorized(format!(
            "signature must be {} bytes, got {}",
            SIGNATURE_BYTES,
            signature.len()
        )));
    }
    let v = signature[64];
    let recovery = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_i32(recovery as i32)
        .map_err(|e| PlasmaError::Unauthorized(format!("recovery id {v}: {e}")))?;
    let recoverable = RecoverableSignature::from_compact(&signature[0..64], recovery_id)
        .map_err(|e| PlasmaError::Unauthorized(format!("malformed signature: {e}")))?;

    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest)
        .map_err(|e| PlasmaError::Unauthorized(format!("invalid digest: {e}")))?;
    let public_key = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| PlasmaError::Unauthorized(format!("recovery failed: {e}")))?;
    Ok(address_of_pubkey(&public_key))
}

/// Ethereum address of a public key: the low 20 bytes of the keccak of the
/// uncompressed point, tag byte stripped.
pub fn address_of_pubkey(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

/// Address controlled by a secret key. Wallet-side counterpart of
/// [`recover_address`].
pub fn signer_address(secret: &SecretKey) -> Address {
    let secp = Secp256k1::new();
    address_of_pubkey(&secret.public_key(&secp))
}
