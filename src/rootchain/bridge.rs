//! The narrow client interface over the rootchain contract.
//!
//! The sidechain consults the rootchain for deposit data and exit status,
//! and submits exit claims through it. Everything else about the contract
//! (challenge windows, bond accounting, finalization) stays on the other
//! side of this boundary. The bridge is injected as a capability so the
//! validity pipeline can be exercised without network I/O.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use web3::types::{Address, H256};

use crate::error::PlasmaError;
use crate::plasma::Position;

/// A rootchain deposit event, keyed externally by its contract-assigned
/// nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub owner: Address,
    pub amount: u64,
    /// Rootchain block the deposit was created in.
    pub created_block: u64,
}

/// Outcome of a deposit query. A nonce the contract has never seen is
/// `Unknown`; one that exists but has not reached finality depth is
/// `Pending` and must not be materialized yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositLookup {
    Unknown,
    Pending,
    Finalized(Deposit),
}

/// Per-submission knobs for exit transactions. The bond is fixed by the
/// protocol; the gas limit is the caller's choice.
#[derive(Debug, Clone, Copy)]
pub struct ExitOpts {
    pub gas_limit: u64,
    pub bond: u64,
}

/// Rootchain contract operations the sidechain core consumes. Calls may
/// block on external I/O; implementations bound every call and surface
/// [`PlasmaError::Bridge`] on transport failure or timeout rather than
/// hanging. Retrying is the caller's decision.
#[allow(async_fn_in_trait)]
pub trait RootchainBridge {
    /// Query the deposit registered under `nonce`, reporting whether it has
    /// reached finality depth.
    async fn get_deposit(&self, nonce: u64) -> Result<DepositLookup, PlasmaError>;

    /// True if the rootchain already finalized, or is finalizing, an exit
    /// for this position.
    async fn has_exited(&self, position: &Position) -> Result<bool, PlasmaError>;

    /// Submit an exit claim for a deposit-origin UTXO.
    async fn start_deposit_exit(
        &self,
        nonce: u64,
        committed_fee: u64,
        opts: &ExitOpts,
    ) -> Result<H256, PlasmaError>;

    /// Submit an exit claim for a transaction-origin UTXO, carrying the
    /// transaction bytes, merkle inclusion proof and confirmation
    /// signatures the contract verifies.
    async fn start_transaction_exit(
        &self,
        position: &Position,
        tx_bytes: &[u8],
        proof: &[u8],
        confirm_signatures: &[u8],
        committed_fee: u64,
        opts: &ExitOpts,
    ) -> Result<H256, PlasmaError>;
}

/// An exit claim as recorded by [`MockBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitSubmission {
    Deposit {
        nonce: u64,
        committed_fee: u64,
        bond: u64,
    },
    Transaction {
        position: Position,
        tx_bytes: Vec<u8>,
        proof: Vec<u8>,
        confirm_signatures: Vec<u8>,
        committed_fee: u64,
        bond: u64,
    },
}

/// In-memory bridge for tests: deposits and exited positions are seeded up
/// front, submitted exits are recorded, and the whole thing can be made
/// unreachable to exercise transient-failure paths.
#[derive(Debug, Default)]
pub struct MockBridge {
    deposits: HashMap<u64, Deposit>,
    pending: HashSet<u64>,
    exited: HashSet<Position>,
    unreachable: bool,
    submissions: Mutex<Vec<ExitSubmission>>,
}

impl MockBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bridge whose every call fails with a transport error.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Seed a finalized deposit.
    pub fn with_deposit(mut self, nonce: u64, deposit: Deposit) -> Self {
        self.deposits.insert(nonce, deposit);
        self
    }

    /// Seed a deposit that exists but has not reached finality depth.
    pub fn with_pending_deposit(mut self, nonce: u64) -> Self {
        self.pending.insert(nonce);
        self
    }

    /// Mark a position as already exited on the rootchain.
    pub fn with_exited(mut self, position: Position) -> Self {
        self.exited.insert(position);
        self
    }

    /// Every exit claim submitted through this bridge, in order.
    pub fn submissions(&self) -> Vec<ExitSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    fn check_reachable(&self) -> Result<(), PlasmaError> {
        if self.unreachable {
            return Err(PlasmaError::Bridge("rootchain unreachable".to_string()));
        }
        Ok(())
    }
}

impl RootchainBridge for MockBridge {
    async fn get_deposit(&self, nonce: u64) -> Result<DepositLookup, PlasmaError> {
        self.check_reachable()?;
        if self.pending.contains(&nonce) {
            return Ok(DepositLookup::Pending);
        }
        Ok(self
            .deposits
            .get(&nonce)
            .copied()
            .map_or(DepositLookup::Unknown, DepositLookup::Finalized))
    }

    async fn has_exited(&self, position: &Position) -> Result<bool, PlasmaError> {
        self.check_reachable()?;
        Ok(self.exited.contains(position))
    }

    async fn start_deposit_exit(
        &self,
        nonce: u64,
        committed_fee: u64,
        opts: &ExitOpts,
    ) -> Result<H256, PlasmaError> {
        self.check_reachable()?;
        self.submissions.lock().unwrap().push(ExitSubmission::Deposit {
            nonce,
            committed_fee,
            bond: opts.bond,
        });
        Ok(H256::from_low_u64_be(nonce))
    }

    async fn start_transaction_exit(
        &self,
        position: &Position,
        tx_bytes: &[u8],
        proof: &[u8],
        confirm_signatures: &[u8],
        committed_fee: u64,
        opts: &ExitOpts,
    ) -> Result<H256, PlasmaError> {
        self.check_reachable()?;
        self.submissions
            .lock()
            .unwrap()
            .push(ExitSubmission::Transaction {
                position: *position,
                tx_bytes: tx_bytes.to_vec(),
                proof: proof.to_vec(),
                confirm_signatures: confirm_signatures.to_vec(),
                committed_fee,
                bond: opts.bond,
            });
        Ok(H256::from_low_u64_be(position.block_num))
    }
}
