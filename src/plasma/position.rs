//! Canonical UTXO position encoding.
//!
//! A position is the sole identity of a UTXO on the sidechain. Deposit
//! UTXOs live at `(0.0.0.nonce)` where the nonce is assigned by the
//! rootchain contract; transaction UTXOs live at
//! `(blockNum.txIndex.outputIndex.0)` addressing an output of a spend
//! included in a sidechain block.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use web3::types::U256;

use crate::error::PlasmaError;

/// Serialized width of the binary form: 8 + 2 + 1 + 8 bytes, big-endian.
pub const POSITION_BYTES: usize = 19;

/// Four-field UTXO address. Exactly one of two shapes is valid:
///
/// * deposit: `block_num == tx_index == output_index == 0`, `deposit_nonce > 0`
/// * transaction: `deposit_nonce == 0`, `block_num > 0`, `output_index <= 1`
///
/// `(0.0.0.0)` is the null position and is rejected everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub block_num: u64,
    pub tx_index: u16,
    pub output_index: u8,
    pub deposit_nonce: u64,
}

impl Position {
    /// Position of a rootchain deposit with the given nonce.
    pub fn deposit(nonce: u64) -> Self {
        Self {
            block_num: 0,
            tx_index: 0,
            output_index: 0,
            deposit_nonce: nonce,
        }
    }

    /// Position of a transaction output inside a sidechain block.
    pub fn transaction(block_num: u64, tx_index: u16, output_index: u8) -> Self {
        Self {
            block_num,
            tx_index,
            output_index,
            deposit_nonce: 0,
        }
    }

    /// True iff this position addresses a rootchain deposit.
    pub fn is_deposit(&self) -> bool {
        self.deposit_nonce > 0
    }

    /// Enforce the deposit/transaction shape invariant.
    pub fn validate(&self) -> Result<(), PlasmaError> {
        if self.output_index > 1 {
            return Err(PlasmaError::MalformedPosition(format!(
                "output index {} out of range, must be 0 or 1",
                self.output_index
            )));
        }
        if self.deposit_nonce > 0 {
            if self.block_num != 0 || self.tx_index != 0 || self.output_index != 0 {
                return Err(PlasmaError::MalformedPosition(format!(
                    "deposit nonce {} combined with transaction fields {}",
                    self.deposit_nonce, self
                )));
            }
            return Ok(());
        }
        if self.block_num == 0 {
            return Err(PlasmaError::MalformedPosition(
                "neither a deposit nonce nor a block number is set".to_string(),
            ));
        }
        Ok(())
    }

    /// Fixed-width big-endian binary form, for wire and on-chain use.
    pub fn encode(&self) -> [u8; POSITION_BYTES] {
        let mut out = [0u8; POSITION_BYTES];
        out[0..8].copy_from_slice(&self.block_num.to_be_bytes());
        out[8..10].copy_from_slice(&self.tx_index.to_be_bytes());
        out[10] = self.output_index;
        out[11..19].copy_from_slice(&self.deposit_nonce.to_be_bytes());
        out
    }

    /// Inverse of [`Position::encode`]. Rejects wrong widths and any byte
    /// form violating the shape invariant.
    pub fn decode(bytes: &[u8]) -> Result<Self, PlasmaError> {
        if bytes.len() != POSITION_BYTES {
            return Err(PlasmaError::MalformedPosition(format!(
                "expected {} bytes, got {}",
                POSITION_BYTES,
                bytes.len()
            )));
        }
        let mut block = [0u8; 8];
        block.copy_from_slice(&bytes[0..8]);
        let mut tx = [0u8; 2];
        tx.copy_from_slice(&bytes[8..10]);
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&bytes[11..19]);

        let position = Self {
            block_num: u64::from_be_bytes(block),
            tx_index: u16::from_be_bytes(tx),
            output_index: bytes[10],
            deposit_nonce: u64::from_be_bytes(nonce),
        };
        position.validate()?;
        Ok(position)
    }

    /// The `uint256[4]` quadruple consumed by the rootchain contract's
    /// exited-position query.
    pub fn exit_quadruple(&self) -> [U256; 4] {
        [
            U256::from(self.block_num),
            U256::from(self.tx_index),
            U256::from(self.output_index),
            U256::from(self.deposit_nonce),
        ]
    }

    /// The `uint256[3]` triple used when starting a transaction exit. The
    /// deposit nonce is always zero in that branch and is omitted.
    pub fn exit_triple(&self) -> [U256; 3] {
        [
            U256::from(self.block_num),
            U256::from(self.tx_index),
            U256::from(self.output_index),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}.{}.{}.{})",
            self.block_num, self.tx_index, self.output_index, self.deposit_nonce
        )
    }
}

impl FromStr for Position {
    type Err = PlasmaError;

    /// Parse the string form `(blockNum.txIndex.outputIndex.depositNonce)`.
    /// Parentheses are optional on input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')');
        let fields: Vec<&str> = trimmed.split('.').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(PlasmaError::MalformedPosition(format!(
                "expected 4 fields, got {} in {:?}",
                fields.len(),
                s
            )));
        }

        let field = |i: usize, name: &str| -> Result<u64, PlasmaError> {
            fields[i].parse::<u64>().map_err(|e| {
                PlasmaError::MalformedPosition(format!("{} {:?}: {}", name, fields[i], e))
            })
        };

        let block_num = field(0, "block number")?;
        let tx_index = fields[1].parse::<u16>().map_err(|e| {
            PlasmaError::MalformedPosition(format!("transaction index {:?}: {}", fields[1], e))
        })?;
        let output_index = fields[2].parse::<u8>().map_err(|e| {
            PlasmaError::MalformedPosition(format!("output index {:?}: {}", fields[2], e))
        })?;
        let deposit_nonce = field(3, "deposit nonce")?;

        let position = Self {
            block_num,
            tx_index,
            output_index,
            deposit_nonce,
        };
        position.validate()?;
        Ok(position)
    }
}
