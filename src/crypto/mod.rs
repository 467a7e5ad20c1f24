//! Hashing and signature primitives shared by the pipeline and clients.

pub mod hash;
pub mod signatures;

pub use hash::{keccak256, sign_hash};
pub use signatures::{
    address_of_pubkey, recover_address, sign_digest, signer_address, SIGNATURE_BYTES,
};
