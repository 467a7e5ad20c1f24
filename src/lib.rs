//! Validity and settlement core of a plasma (two-layer) UTXO sidechain.
//!
//! The sidechain keeps a ledger of unspent transaction outputs whose
//! correctness is verifiable against, and exitable to, a rootchain
//! contract. A candidate spend runs through the validity pipeline, which
//! consults local UTXO state and the rootchain bridge; an admitted spend is
//! applied by marking its inputs spent and creating outputs at freshly
//! allocated positions. Independently, UTXO owners withdraw value back to
//! the rootchain through the exit protocol.
//!
//! Block production, networking, CLI wiring and keystores live outside
//! this crate; the consensus engine is assumed to deliver transactions
//! one at a time in block order.

pub mod config;
pub mod crypto;
pub mod error;
pub mod exit;
pub mod genesis;
pub mod plasma;
pub mod rootchain;
pub mod store;
pub mod validity;

pub use config::PlasmaConfig;
pub use error::PlasmaError;
pub use exit::{
    start_exit, ExitEvidence, ExitInfoSource, ExitRequest, NoTrustedNode, MIN_EXIT_BOND,
};
pub use genesis::{GenesisState, GenesisUtxo, GenesisValidator, GENESIS_UTXO_AWARD};
pub use plasma::{Position, SpendInput, SpendMsg, SpendOutput, SpendTx, Tx};
pub use rootchain::{
    Deposit, DepositLookup, ExitOpts, ExitSubmission, MockBridge, RootchainBridge, Web3Bridge,
};
pub use store::{Utxo, UtxoStore, DENOM};
pub use validity::{apply_spend, check_spend, process_spend, Admission, ResolvedInput};
