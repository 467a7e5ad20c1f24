//! Spend messages and their authenticated transaction wrapper.
//!
//! A spend consumes one or two UTXOs and creates one or two outputs. The
//! first input and output slots are always populated; the second of each is
//! meaningful only when present. The message's canonical byte form doubles
//! as its wire form and as the payload signed by every input owner.

use serde::{Deserialize, Serialize};
use web3::types::Address;

use crate::crypto;
use crate::error::PlasmaError;
use crate::plasma::position::Position;

/// One input slot: the position being spent and the owner claiming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendInput {
    pub owner: Address,
    pub position: Position,
}

/// One output slot: the new owner and the amount assigned to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendOutput {
    pub owner: Address,
    pub amount: u64,
}

/// The body of a sidechain spend. Carries no authentication fields; those
/// live on [`SpendTx`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendMsg {
    pub input0: SpendInput,
    pub input1: Option<SpendInput>,
    pub output0: SpendOutput,
    pub output1: Option<SpendOutput>,
    pub fee: u64,
}

impl SpendMsg {
    /// The populated input slots, first slot first.
    pub fn inputs(&self) -> Vec<SpendInput> {
        let mut inputs = vec![self.input0];
        if let Some(input) = self.input1 {
            inputs.push(input);
        }
        inputs
    }

    /// The populated output slots, first slot first.
    pub fn outputs(&self) -> Vec<SpendOutput> {
        let mut outputs = vec![self.output0];
        if let Some(output) = self.output1 {
            outputs.push(output);
        }
        outputs
    }

    /// Sum of declared output amounts. Widened so two max-value outputs
    /// cannot wrap.
    pub fn output_total(&self) -> u128 {
        self.outputs().iter().map(|o| o.amount as u128).sum()
    }

    /// Stateless structural validation: every populated slot must carry a
    /// real owner, every position must hold its shape, and no input may be
    /// named twice.
    pub fn validate_basic(&self) -> Result<(), PlasmaError> {
        if self.input0.owner == Address::zero() {
            return Err(PlasmaError::InvalidTransaction(
                "first input owner is the zero address".to_string(),
            ));
        }
        self.input0.position.validate()?;

        if let Some(input) = &self.input1 {
            if input.owner == Address::zero() {
                return Err(PlasmaError::InvalidTransaction(
                    "second input owner is the zero address".to_string(),
                ));
            }
            input.position.validate()?;
            if input.position == self.input0.position {
                return Err(PlasmaError::InvalidTransaction(format!(
                    "input position {} named twice",
                    input.position
                )));
            }
        }

        if self.output0.owner == Address::zero() {
            return Err(PlasmaError::InvalidTransaction(
                "first output owner is the zero address".to_string(),
            ));
        }
        if let Some(output) = &self.output1 {
            if output.owner == Address::zero() {
                return Err(PlasmaError::InvalidTransaction(
                    "second output owner is the zero address".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Canonical deterministic serialization, used both as the wire form
    /// and as the payload every input owner signs.
    pub fn sign_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("spend message serialization is infallible")
    }

    /// Digest the signatures commit to.
    pub fn sign_hash(&self) -> [u8; 32] {
        crypto::sign_hash(&self.sign_bytes())
    }
}

/// A spend message plus one 65-byte recoverable signature per populated
/// input, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendTx {
    pub msg: SpendMsg,
    pub sigs: Vec<Vec<u8>>,
}

impl SpendTx {
    /// Sign `msg` with one secret key per populated input, in slot order.
    /// Wallet-side constructor for transactions the pipeline will admit.
    pub fn signed(msg: SpendMsg, keys: &[&secp256k1::SecretKey]) -> Result<Self, PlasmaError> {
        let digest = msg.sign_hash();
        let mut sigs = Vec::with_capacity(keys.len());
        for key in keys {
            sigs.push(crypto::sign_digest(&digest, key)?);
        }
        Ok(Self { msg, sigs })
    }
}

/// The closed set of transaction kinds the handler dispatches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tx {
    Spend(SpendTx),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signer_address;
    use secp256k1::SecretKey;

    fn key(fill: u8) -> SecretKey {
        SecretKey::from_slice(&[fill; 32]).unwrap()
    }

    fn addr(fill: u8) -> Address {
        Address::from_low_u64_be(fill as u64)
    }

    fn single_spend() -> SpendMsg {
        SpendMsg {
            input0: SpendInput {
                owner: addr(0xaa),
                position: Position::deposit(1),
            },
            input1: None,
            output0: SpendOutput {
                owner: addr(0xbb),
                amount: 100,
            },
            output1: None,
            fee: 0,
        }
    }

    #[test]
    fn slots_expand_in_order() {
        let mut msg = single_spend();
        assert_eq!(msg.inputs().len(), 1);
        assert_eq!(msg.outputs().len(), 1);

        msg.input1 = Some(SpendInput {
            owner: addr(0xcc),
            position: Position::transaction(2, 0, 0),
        });
        msg.output1 = Some(SpendOutput {
            owner: addr(0xdd),
            amount: 40,
        });
        assert_eq!(msg.inputs()[1].owner, addr(0xcc));
        assert_eq!(msg.outputs()[1].amount, 40);
        assert_eq!(msg.output_total(), 140);
    }

    #[test]
    fn validate_basic_accepts_well_formed() {
        single_spend().validate_basic().unwrap();
    }

    #[test]
    fn validate_basic_rejects_zero_owners() {
        let mut msg = single_spend();
        msg.input0.owner = Address::zero();
        assert!(matches!(
            msg.validate_basic(),
            Err(PlasmaError::InvalidTransaction(_))
        ));

        let mut msg = single_spend();
        msg.output0.owner = Address::zero();
        assert!(msg.validate_basic().is_err());

        let mut msg = single_spend();
        msg.output1 = Some(SpendOutput {
            owner: Address::zero(),
            amount: 1,
        });
        assert!(msg.validate_basic().is_err());
    }

    #[test]
    fn validate_basic_rejects_duplicate_inputs() {
        let mut msg = single_spend();
        msg.input1 = Some(msg.input0);
        assert!(matches!(
            msg.validate_basic(),
            Err(PlasmaError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn validate_basic_rejects_malformed_positions() {
        let mut msg = single_spend();
        msg.input0.position = Position {
            block_num: 1,
            tx_index: 0,
            output_index: 0,
            deposit_nonce: 5,
        };
        assert!(matches!(
            msg.validate_basic(),
            Err(PlasmaError::MalformedPosition(_))
        ));
    }

    #[test]
    fn sign_bytes_are_deterministic_and_field_sensitive() {
        let msg = single_spend();
        assert_eq!(msg.sign_bytes(), msg.sign_bytes());

        let mut altered = msg.clone();
        altered.fee = 1;
        assert_ne!(msg.sign_bytes(), altered.sign_bytes());
        assert_ne!(msg.sign_hash(), altered.sign_hash());
    }

    #[test]
    fn wire_form_round_trips() {
        let msg = single_spend();
        let decoded: SpendMsg = bincode::deserialize(&msg.sign_bytes()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn signed_tx_recovers_to_signer() {
        let secret = key(0x42);
        let mut msg = single_spend();
        msg.input0.owner = signer_address(&secret);

        let tx = SpendTx::signed(msg, &[&secret]).unwrap();
        assert_eq!(tx.sigs.len(), 1);
        let recovered =
            crate::crypto::recover_address(&tx.msg.sign_hash(), &tx.sigs[0]).unwrap();
        assert_eq!(recovered, tx.msg.input0.owner);
    }
}
