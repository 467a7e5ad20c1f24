//! The sidechain's UTXO store and output position allocator.
//!
//! The store runs strictly inside the consensus engine's serial per-block
//! transaction order, so it is a plain single-writer map with no interior
//! locking. Durability is the engine's concern, not the store's.

use std::collections::HashMap;

use crate::error::PlasmaError;
use crate::plasma::Position;
use crate::store::utxo::Utxo;

/// Position-keyed UTXO map plus the allocator that hands out positions for
/// freshly created transaction outputs. The allocator is the sole writer of
/// non-deposit positions.
#[derive(Debug, Default)]
pub struct UtxoStore {
    utxos: HashMap<Position, Utxo>,
    block_num: u64,
    tx_index: u16,
    /// Whether a transaction slot has been claimed in the current block.
    tx_open: bool,
}

impl UtxoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a UTXO. A miss carries no error; the caller decides what an
    /// absent position means.
    pub fn get(&self, position: &Position) -> Option<&Utxo> {
        self.utxos.get(position)
    }

    /// Insert a new UTXO. Creation is never idempotent: a second insert at
    /// the same position fails, which is what stops a deposit from being
    /// materialized twice.
    pub fn put(&mut self, utxo: Utxo) -> Result<(), PlasmaError> {
        utxo.position.validate()?;
        if self.utxos.contains_key(&utxo.position) {
            return Err(PlasmaError::DuplicatePosition(utxo.position));
        }
        log::debug!(
            "storing utxo at {} owned by {} amount {}",
            utxo.position,
            utxo.owner,
            utxo.amount
        );
        self.utxos.insert(utxo.position, utxo);
        Ok(())
    }

    /// Flip a UTXO's spent flag, visible to all subsequent reads. The flag
    /// never flips back.
    pub fn mark_spent(&mut self, position: &Position) -> Result<(), PlasmaError> {
        let utxo = self
            .utxos
            .get_mut(position)
            .ok_or(PlasmaError::UnknownUtxo(*position))?;
        if utxo.spent {
            return Err(PlasmaError::AlreadySpent(*position));
        }
        utxo.spent = true;
        Ok(())
    }

    /// Consensus hook: the engine announces the block now being processed.
    /// Resets the allocator's transaction cursor.
    pub fn begin_block(&mut self, height: u64) {
        self.block_num = height;
        self.tx_index = 0;
        self.tx_open = false;
    }

    /// Allocate the position for a newly created transaction output.
    ///
    /// The first output of a new transaction takes the next sequential
    /// `(block, txIndex)` slot at output index 0; a secondary output of the
    /// same transaction reuses the slot at output index 1. Finding the slot
    /// occupied means the ledger's invariants no longer hold.
    pub fn next_position(&mut self, secondary: bool) -> Result<Position, PlasmaError> {
        if self.block_num == 0 {
            return Err(PlasmaError::StoreCorruption(
                "output position requested before any block was opened".to_string(),
            ));
        }
        if secondary {
            if !self.tx_open {
                return Err(PlasmaError::StoreCorruption(
                    "secondary output requested before a primary one".to_string(),
                ));
            }
        } else if self.tx_open {
            self.tx_index = self.tx_index.checked_add(1).ok_or_else(|| {
                PlasmaError::StoreCorruption(format!(
                    "transaction index overflow in block {}",
                    self.block_num
                ))
            })?;
        } else {
            self.tx_open = true;
        }

        let position =
            Position::transaction(self.block_num, self.tx_index, if secondary { 1 } else { 0 });
        if self.utxos.contains_key(&position) {
            return Err(PlasmaError::StoreCorruption(format!(
                "allocator produced occupied position {position}"
            )));
        }
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use web3::types::Address;

    fn addr(fill: u8) -> Address {
        Address::from_low_u64_be(fill as u64)
    }

    #[test]
    fn put_then_get() {
        let mut store = UtxoStore::new();
        let utxo = Utxo::unspent(addr(1), 100, Position::deposit(7));
        store.put(utxo.clone()).unwrap();
        assert_eq!(store.get(&Position::deposit(7)), Some(&utxo));
        assert!(store.get(&Position::deposit(8)).is_none());
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let mut store = UtxoStore::new();
        store
            .put(Utxo::unspent(addr(1), 100, Position::deposit(7)))
            .unwrap();
        let err = store
            .put(Utxo::unspent(addr(2), 50, Position::deposit(7)))
            .unwrap_err();
        assert!(matches!(err, PlasmaError::DuplicatePosition(_)));
        // the original record is untouched
        assert_eq!(store.get(&Position::deposit(7)).unwrap().owner, addr(1));
    }

    #[test]
    fn put_rejects_malformed_positions() {
        let mut store = UtxoStore::new();
        let bad = Position {
            block_num: 1,
            tx_index: 0,
            output_index: 0,
            deposit_nonce: 3,
        };
        assert!(store.put(Utxo::unspent(addr(1), 1, bad)).is_err());
    }

    #[test]
    fn mark_spent_flow() {
        let mut store = UtxoStore::new();
        let position = Position::deposit(7);
        store.put(Utxo::unspent(addr(1), 100, position)).unwrap();

        store.mark_spent(&position).unwrap();
        // spent records stay queryable
        assert!(store.get(&position).unwrap().spent);

        let err = store.mark_spent(&position).unwrap_err();
        assert!(matches!(err, PlasmaError::AlreadySpent(_)));

        let err = store.mark_spent(&Position::deposit(8)).unwrap_err();
        assert!(matches!(err, PlasmaError::UnknownUtxo(_)));
    }

    #[test]
    fn allocator_walks_transaction_slots() {
        let mut store = UtxoStore::new();
        store.begin_block(5);

        // two single-output transactions, then one with a secondary output
        assert_eq!(
            store.next_position(false).unwrap(),
            Position::transaction(5, 0, 0)
        );
        assert_eq!(
            store.next_position(false).unwrap(),
            Position::transaction(5, 1, 0)
        );
        assert_eq!(
            store.next_position(false).unwrap(),
            Position::transaction(5, 2, 0)
        );
        assert_eq!(
            store.next_position(true).unwrap(),
            Position::transaction(5, 2, 1)
        );

        // next block restarts the cursor
        store.begin_block(6);
        assert_eq!(
            store.next_position(false).unwrap(),
            Position::transaction(6, 0, 0)
        );
    }

    #[test]
    fn allocator_guards_misuse() {
        let mut store = UtxoStore::new();
        // no block opened yet
        assert!(matches!(
            store.next_position(false),
            Err(PlasmaError::StoreCorruption(_))
        ));

        store.begin_block(1);
        // secondary before primary
        assert!(matches!(
            store.next_position(true),
            Err(PlasmaError::StoreCorruption(_))
        ));
    }

    #[test]
    fn allocator_refuses_occupied_slots() {
        let mut store = UtxoStore::new();
        store.begin_block(5);
        store
            .put(Utxo::unspent(addr(1), 1, Position::transaction(5, 0, 0)))
            .unwrap();
        assert!(matches!(
            store.next_position(false),
            Err(PlasmaError::StoreCorruption(_))
        ));
    }
}
