//! Error taxonomy for the sidechain core.

use web3::types::Address;

use crate::plasma::Position;

/// Every failure the validity pipeline, store, bridge and exit protocol can
/// surface. `StoreCorruption` is the only fatal variant; everything else
/// rejects a single operation and leaves the ledger untouched.
#[derive(Debug, thiserror::Error)]
pub enum PlasmaError {
    /// A position's field widths or deposit/transaction shape are violated.
    #[error("malformed position: {0}")]
    MalformedPosition(String),

    /// A spend message failed stateless structural validation.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// The store already holds a UTXO at this position.
    #[error("utxo already exists at {0}")]
    DuplicatePosition(Position),

    /// No UTXO exists at this position, on either ledger.
    #[error("no utxo at {0}")]
    UnknownUtxo(Position),

    #[error("utxo at {0} is already spent")]
    AlreadySpent(Position),

    /// The rootchain has finalized, or is finalizing, an exit for this
    /// position; it can no longer be spent.
    #[error("utxo at {0} has already exited")]
    AlreadyExited(Position),

    #[error("utxo at {position} is owned by {owner}, not {claimed}")]
    OwnerMismatch {
        position: Position,
        owner: Address,
        claimed: Address,
    },

    /// Signature recovery failed or recovered an address other than the
    /// claimed input owner.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("input total {inputs} does not equal output total {outputs} plus fee {fee}")]
    BalanceMismatch { inputs: u128, outputs: u128, fee: u64 },

    /// A transaction exit was requested without the named evidence field.
    #[error("missing exit evidence: {0}")]
    MissingExitEvidence(&'static str),

    /// Transport or contract failure talking to the rootchain. Transient;
    /// the caller decides whether to retry.
    #[error("rootchain bridge: {0}")]
    Bridge(String),

    /// The applier observed a store state the pipeline ruled out. Fatal to
    /// block processing.
    #[error("utxo store corrupted: {0}")]
    StoreCorruption(String),
}
