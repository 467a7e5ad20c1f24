//! Core plasma types: UTXO positions and spend transactions.

pub mod position;
pub mod spend;

pub use position::{Position, POSITION_BYTES};
pub use spend::{SpendInput, SpendMsg, SpendOutput, SpendTx, Tx};
