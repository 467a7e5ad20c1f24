//! Transaction admission: the checks a spend must pass before inclusion.
//!
//! The pipeline runs once per candidate transaction, in the serial order
//! the consensus engine dictates, and short-circuits on the first failure.
//! A rejection never aborts block processing for other transactions and
//! never leaves a trace in the store: deposits referenced for the first
//! time are materialized only after every check has passed.

pub mod applier;

use web3::types::Address;

use crate::crypto::recover_address;
use crate::error::PlasmaError;
use crate::plasma::{SpendTx, Tx};
use crate::rootchain::{DepositLookup, RootchainBridge};
use crate::store::{Utxo, UtxoStore};

pub use applier::apply_spend;

/// One admitted input with its store-resolved owner and amount, handed to
/// the applier so it never re-reads the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedInput {
    pub position: crate::plasma::Position,
    pub owner: Address,
    pub amount: u64,
}

/// The pipeline's verdict on an admitted spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub inputs: Vec<ResolvedInput>,
}

/// Run the full admission check against local state and the rootchain.
///
/// Order: structural validation, per-input exit check, per-input
/// existence/ownership resolution, per-input signature recovery, balance.
/// A bridge failure is non-admission for this transaction only; the
/// sidechain cannot safely trust unreachable rootchain state.
pub async fn check_spend<B: RootchainBridge>(
    store: &mut UtxoStore,
    bridge: &B,
    tx: &SpendTx,
) -> Result<Admission, PlasmaError> {
    tx.msg.validate_basic()?;
    let inputs = tx.msg.inputs();
    if tx.sigs.len() != inputs.len() {
        return Err(PlasmaError::Unauthorized(format!(
            "expected {} signatures, got {}",
            inputs.len(),
            tx.sigs.len()
        )));
    }

    // a UTXO that has begun exiting must never be spent again, so this
    // runs before the input is even looked up
    for input in &inputs {
        if bridge.has_exited(&input.position).await? {
            return Err(PlasmaError::AlreadyExited(input.position));
        }
    }

    let mut resolved = Vec::with_capacity(inputs.len());
    let mut materialize = Vec::new();
    for input in &inputs {
        match store.get(&input.position) {
            Some(utxo) => {
                if utxo.spent {
                    return Err(PlasmaError::AlreadySpent(input.position));
                }
                if utxo.owner != input.owner {
                    return Err(PlasmaError::OwnerMismatch {
                        position: input.position,
                        owner: utxo.owner,
                        claimed: input.owner,
                    });
                }
                resolved.push(ResolvedInput {
                    position: input.position,
                    owner: utxo.owner,
                    amount: utxo.amount,
                });
            }
            None if input.position.is_deposit() => {
                let nonce = input.position.deposit_nonce;
                let deposit = match bridge.get_deposit(nonce).await? {
                    DepositLookup::Finalized(deposit) => deposit,
                    DepositLookup::Pending => {
                        return Err(PlasmaError::InvalidTransaction(format!(
                            "deposit {nonce} has not reached rootchain finality"
                        )));
                    }
                    DepositLookup::Unknown => {
                        return Err(PlasmaError::UnknownUtxo(input.position));
                    }
                };
                if deposit.owner != input.owner {
                    return Err(PlasmaError::OwnerMismatch {
                        position: input.position,
                        owner: deposit.owner,
                        claimed: input.owner,
                    });
                }
                materialize.push(Utxo::unspent(deposit.owner, deposit.amount, input.position));
                resolved.push(ResolvedInput {
                    position: input.position,
                    owner: deposit.owner,
                    amount: deposit.amount,
                });
            }
            None => return Err(PlasmaError::UnknownUtxo(input.position)),
        }
    }

    let digest = tx.msg.sign_hash();
    for (input, sig) in inputs.iter().zip(&tx.sigs) {
        let recovered = recover_address(&digest, sig)?;
        if recovered != input.owner {
            return Err(PlasmaError::Unauthorized(format!(
                "signature for input {} recovers to {}, claimed owner is {}",
                input.position, recovered, input.owner
            )));
        }
    }

    let input_total: u128 = resolved.iter().map(|input| input.amount as u128).sum();
    let output_total = tx.msg.output_total();
    if input_total != output_total + tx.msg.fee as u128 {
        return Err(PlasmaError::BalanceMismatch {
            inputs: input_total,
            outputs: output_total,
            fee: tx.msg.fee,
        });
    }

    // admitted: first-spend deposits join the store only now, so every
    // rejection path above left it untouched
    for utxo in materialize {
        log::debug!("materializing finalized deposit at {}", utxo.position);
        store.put(utxo)?;
    }
    Ok(Admission { inputs: resolved })
}

/// Admit and apply one transaction. The closed [`Tx`] enum is matched here;
/// there is no runtime message dispatch.
pub async fn process_spend<B: RootchainBridge>(
    store: &mut UtxoStore,
    bridge: &B,
    tx: &Tx,
) -> Result<Vec<Utxo>, PlasmaError> {
    match tx {
        Tx::Spend(spend) => {
            let admission = check_spend(store, bridge, spend).await?;
            apply_spend(store, &spend.msg, &admission)
        }
    }
}
