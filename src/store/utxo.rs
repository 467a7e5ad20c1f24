//! The UTXO record held by the sidechain ledger.

use serde::{Deserialize, Serialize};
use web3::types::Address;

use crate::plasma::Position;

/// The only asset denomination in this deployment.
pub const DENOM: &str = "Ether";

/// An output on the sidechain ledger. Created when a finalized deposit is
/// first materialized or when an admitted spend produces outputs. The spent
/// flag only ever flips false to true; records are never deleted, so spent
/// UTXOs keep serving replay rejection and exit-challenge lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub owner: Address,
    pub amount: u64,
    pub denom: String,
    pub position: Position,
    pub spent: bool,
}

impl Utxo {
    /// A fresh unspent UTXO in the default denomination.
    pub fn unspent(owner: Address, amount: u64, position: Position) -> Self {
        Self {
            owner,
            amount,
            denom: DENOM.to_string(),
            position,
            spent: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_utxo_is_unspent_ether() {
        let utxo = Utxo::unspent(Address::from_low_u64_be(1), 100, Position::deposit(7));
        assert!(!utxo.spent);
        assert_eq!(utxo.denom, DENOM);
        assert!(utxo.position.is_deposit());
    }
}
