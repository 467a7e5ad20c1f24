//! Genesis bootstrap.
//!
//! The genesis document is produced by an external bootstrapper and lists
//! the initial UTXOs alongside the initial validator. Position fields
//! travel as decimal strings in the document; they are converted to the
//! typed form here and nowhere else.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use web3::types::Address;

use crate::plasma::Position;
use crate::store::{Utxo, UtxoStore};

/// Amount awarded to each bootstrap account.
pub const GENESIS_UTXO_AWARD: u64 = 100;

/// Application state as it appears in the genesis document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(rename = "genvalidator")]
    pub validator: GenesisValidator,
    #[serde(rename = "UTXOs")]
    pub utxos: Vec<GenesisUtxo>,
}

/// The single initial block producer: consensus public key plus the
/// address its fees accrue to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisValidator {
    #[serde(rename = "validator_pubkey")]
    pub cons_pubkey: String,
    #[serde(rename = "fee_address")]
    pub fee_address: String,
}

/// One initial UTXO. `denom` carries the amount as a decimal string, the
/// document's legacy field name for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisUtxo {
    pub address: String,
    pub denom: String,
    pub position: [String; 4],
}

impl GenesisUtxo {
    pub fn new(address: String, amount: u64, position: [String; 4]) -> Self {
        Self {
            address,
            denom: amount.to_string(),
            position,
        }
    }

    /// Convert the document form into a store record. Any unparseable
    /// field is an error; nothing defaults to zero.
    pub fn to_utxo(&self) -> anyhow::Result<Utxo> {
        let owner = Address::from_str(self.address.trim_start_matches("0x"))
            .map_err(|e| anyhow::anyhow!("genesis address {:?}: {e}", self.address))?;
        let amount: u64 = self
            .denom
            .parse()
            .with_context(|| format!("genesis amount {:?}", self.denom))?;

        let field = |i: usize, name: &str| -> anyhow::Result<u64> {
            self.position[i]
                .parse()
                .with_context(|| format!("genesis position {} {:?}", name, self.position[i]))
        };
        let position = Position {
            block_num: field(0, "block number")?,
            tx_index: self.position[1]
                .parse()
                .with_context(|| format!("genesis transaction index {:?}", self.position[1]))?,
            output_index: self.position[2]
                .parse()
                .with_context(|| format!("genesis output index {:?}", self.position[2]))?,
            deposit_nonce: field(3, "deposit nonce")?,
        };
        position.validate()?;

        Ok(Utxo::unspent(owner, amount, position))
    }
}

impl GenesisState {
    /// Bootstrap state awarding each account the standard amount at
    /// successive deposit nonces.
    pub fn with_accounts(validator: GenesisValidator, accounts: &[Address]) -> Self {
        let utxos = accounts
            .iter()
            .enumerate()
            .map(|(i, address)| {
                GenesisUtxo::new(
                    format!("{address:#x}"),
                    GENESIS_UTXO_AWARD,
                    [
                        "0".to_string(),
                        "0".to_string(),
                        "0".to_string(),
                        (i as u64 + 1).to_string(),
                    ],
                )
            })
            .collect();
        Self { validator, utxos }
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("parsing genesis document")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading genesis from {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serializing genesis document")
    }

    /// Turn the document into live UTXO state. Duplicate positions in the
    /// document surface as store errors.
    pub fn build_store(&self) -> anyhow::Result<UtxoStore> {
        let mut store = UtxoStore::new();
        for genesis_utxo in &self.utxos {
            store.put(genesis_utxo.to_utxo()?)?;
        }
        log::info!("genesis loaded {} utxo(s)", store.len());
        Ok(store)
    }
}
