//! Node-side configuration for the rootchain-facing components.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use web3::types::Address;

/// Everything the bridge needs to talk to the rootchain, plus the defaults
/// the exit surface falls back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlasmaConfig {
    /// Ethereum JSON-RPC endpoint.
    pub ethereum_url: String,
    /// Deployed plasma contract.
    pub contract_address: Address,
    /// Rootchain depth under which a deposit or event counts as final.
    pub finality_confirmations: u64,
    /// Upper bound on any single bridge call.
    pub call_timeout_ms: u64,
    /// Default gas limit for exit transactions; overridable per request.
    pub gas_limit: u64,
}

impl Default for PlasmaConfig {
    fn default() -> Self {
        Self {
            ethereum_url: "http://127.0.0.1:8545".to_string(),
            contract_address: Address::from_str("0x5FC8d32690cc91D4c39d9d3abcBD16989F875707")
                .unwrap(),
            finality_confirmations: 16,
            call_timeout_ms: 5_000,
            gas_limit: 21_000,
        }
    }
}

impl PlasmaConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing config from {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(path, raw).with_context(|| format!("writing config to {}", path.display()))
    }
}
