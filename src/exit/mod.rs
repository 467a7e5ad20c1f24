//! Client-side exit protocol.
//!
//! A UTXO owner withdraws value back to the rootchain by submitting an
//! exit claim. Deposit-origin positions exit on their nonce alone;
//! transaction-origin positions must carry the bytes of the transaction
//! that created them, a merkle proof of inclusion and the confirmation
//! signatures of every prior owner. Each invocation makes exactly one
//! submission attempt; retrying is an operator decision. The rootchain
//! contract remains the final arbiter: the status checked here is
//! point-in-time and may change before the claim lands.

use web3::types::{Address, H256};

use crate::error::PlasmaError;
use crate::plasma::Position;
use crate::rootchain::{ExitOpts, RootchainBridge};

/// Bond attached to every exit submission, matching the rootchain
/// contract's minimum.
pub const MIN_EXIT_BOND: u64 = 200_000;

/// The three pieces of evidence a transaction exit must carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitEvidence {
    pub tx_bytes: Vec<u8>,
    pub proof: Vec<u8>,
    pub confirm_signatures: Vec<u8>,
}

impl ExitEvidence {
    /// Decode operator-supplied hex strings as they arrive from the
    /// command surface. Empty strings stay empty; a populated string must
    /// be valid hex, with the `0x` prefix optional.
    pub fn from_hex(
        tx_bytes: &str,
        proof: &str,
        confirm_signatures: &str,
    ) -> anyhow::Result<Self> {
        let decode = |name: &str, raw: &str| -> anyhow::Result<Vec<u8>> {
            if raw.is_empty() {
                return Ok(Vec::new());
            }
            hex::decode(raw.trim_start_matches("0x"))
                .map_err(|e| anyhow::anyhow!("{name} is not valid hex: {e}"))
        };
        Ok(Self {
            tx_bytes: decode("txBytes", tx_bytes)?,
            proof: decode("proof", proof)?,
            confirm_signatures: decode("confirmSignatures", confirm_signatures)?,
        })
    }

    /// All three fields must be present before submission. Reported in a
    /// fixed order so the operator fixes one gap at a time.
    fn require_complete(&self) -> Result<(), PlasmaError> {
        if self.tx_bytes.is_empty() {
            return Err(PlasmaError::MissingExitEvidence("txBytes"));
        }
        if self.proof.is_empty() {
            return Err(PlasmaError::MissingExitEvidence("proof"));
        }
        if self.confirm_signatures.is_empty() {
            return Err(PlasmaError::MissingExitEvidence("confirmSignatures"));
        }
        Ok(())
    }
}

/// One exit attempt, mirroring the external command surface: the exiting
/// account and position, the fee committed in an unfinalized spend of the
/// input, a gas limit, optional explicit evidence overriding whatever a
/// full node reports, and whether the connected full node is trusted.
#[derive(Debug, Clone)]
pub struct ExitRequest {
    pub owner: Address,
    pub position: Position,
    pub committed_fee: u64,
    pub gas_limit: u64,
    pub tx_bytes: Option<Vec<u8>>,
    pub proof: Option<Vec<u8>>,
    pub confirm_signatures: Option<Vec<u8>>,
    pub trust_node: bool,
}

impl ExitRequest {
    pub fn new(owner: Address, position: Position) -> Self {
        Self {
            owner,
            position,
            committed_fee: 0,
            gas_limit: 21_000,
            tx_bytes: None,
            proof: None,
            confirm_signatures: None,
            trust_node: false,
        }
    }
}

/// Where transaction-exit evidence comes from when the operator trusts a
/// connected full node: one round trip returns all three fields.
#[allow(async_fn_in_trait)]
pub trait ExitInfoSource {
    async fn exit_info(
        &self,
        owner: Address,
        position: &Position,
    ) -> Result<ExitEvidence, PlasmaError>;
}

/// Placeholder source for operators running without a trusted full node;
/// querying it is always an error, so evidence must be supplied explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrustedNode;

impl ExitInfoSource for NoTrustedNode {
    async fn exit_info(
        &self,
        _owner: Address,
        _position: &Position,
    ) -> Result<ExitEvidence, PlasmaError> {
        Err(PlasmaError::Bridge(
            "no trusted full node configured".to_string(),
        ))
    }
}

/// Assemble and submit one exit claim.
///
/// The position's own shape picks the branch: deposits exit by nonce,
/// transaction outputs by evidence bundle. A position the rootchain
/// already knows as exited is refused before anything is submitted.
pub async fn start_exit<B, S>(
    bridge: &B,
    node: &S,
    request: &ExitRequest,
) -> Result<H256, PlasmaError>
where
    B: RootchainBridge,
    S: ExitInfoSource,
{
    request.position.validate()?;
    if bridge.has_exited(&request.position).await? {
        return Err(PlasmaError::AlreadyExited(request.position));
    }

    let opts = ExitOpts {
        gas_limit: request.gas_limit,
        bond: MIN_EXIT_BOND,
    };

    if request.position.is_deposit() {
        let hash = bridge
            .start_deposit_exit(request.position.deposit_nonce, request.committed_fee, &opts)
            .await?;
        log::info!(
            "started deposit exit for nonce {} by {}",
            request.position.deposit_nonce,
            request.owner
        );
        return Ok(hash);
    }

    let mut evidence = if request.trust_node {
        node.exit_info(request.owner, &request.position).await?
    } else {
        ExitEvidence::default()
    };
    // explicit values override whatever the full node reported
    if let Some(tx_bytes) = &request.tx_bytes {
        evidence.tx_bytes = tx_bytes.clone();
    }
    if let Some(proof) = &request.proof {
        evidence.proof = proof.clone();
    }
    if let Some(confirm_signatures) = &request.confirm_signatures {
        evidence.confirm_signatures = confirm_signatures.clone();
    }
    evidence.require_complete()?;

    let hash = bridge
        .start_transaction_exit(
            &request.position,
            &evidence.tx_bytes,
            &evidence.proof,
            &evidence.confirm_signatures,
            request.committed_fee,
            &opts,
        )
        .await?;
    log::info!(
        "started transaction exit for {} by {}",
        request.position,
        request.owner
    );
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rootchain::{ExitSubmission, MockBridge};

    fn owner() -> Address {
        Address::from_low_u64_be(0xaa)
    }

    /// Evidence source standing in for a trusted full node.
    struct CannedNode(ExitEvidence);

    impl ExitInfoSource for CannedNode {
        async fn exit_info(
            &self,
            _owner: Address,
            _position: &Position,
        ) -> Result<ExitEvidence, PlasmaError> {
            Ok(self.0.clone())
        }
    }

    fn full_evidence() -> ExitEvidence {
        ExitEvidence {
            tx_bytes: vec![1, 2, 3],
            proof: vec![4; 32],
            confirm_signatures: vec![5; 65],
        }
    }

    #[tokio::test]
    async fn deposit_exit_goes_straight_to_submission() {
        let bridge = MockBridge::new();
        let mut request = ExitRequest::new(owner(), Position::deposit(7));
        request.committed_fee = 3;

        start_exit(&bridge, &NoTrustedNode, &request).await.unwrap();
        assert_eq!(
            bridge.submissions(),
            vec![ExitSubmission::Deposit {
                nonce: 7,
                committed_fee: 3,
                bond: MIN_EXIT_BOND,
            }]
        );
    }

    #[tokio::test]
    async fn missing_evidence_is_reported_in_order() {
        let bridge = MockBridge::new();
        let position = Position::transaction(4, 1, 0);

        // nothing supplied, node untrusted: txBytes first
        let request = ExitRequest::new(owner(), position);
        let err = start_exit(&bridge, &NoTrustedNode, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, PlasmaError::MissingExitEvidence("txBytes")));

        // txBytes supplied: proof next
        let mut request = ExitRequest::new(owner(), position);
        request.tx_bytes = Some(vec![1]);
        let err = start_exit(&bridge, &NoTrustedNode, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, PlasmaError::MissingExitEvidence("proof")));

        // txBytes and proof supplied: confirmation signatures last
        let mut request = ExitRequest::new(owner(), position);
        request.tx_bytes = Some(vec![1]);
        request.proof = Some(vec![2]);
        let err = start_exit(&bridge, &NoTrustedNode, &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlasmaError::MissingExitEvidence("confirmSignatures")
        ));

        // nothing was submitted along the way
        assert!(bridge.submissions().is_empty());
    }

    #[tokio::test]
    async fn trusted_node_supplies_evidence() {
        let bridge = MockBridge::new();
        let position = Position::transaction(4, 1, 0);
        let mut request = ExitRequest::new(owner(), position);
        request.trust_node = true;
        request.gas_limit = 90_000;

        start_exit(&bridge, &CannedNode(full_evidence()), &request)
            .await
            .unwrap();
        assert_eq!(
            bridge.submissions(),
            vec![ExitSubmission::Transaction {
                position,
                tx_bytes: vec![1, 2, 3],
                proof: vec![4; 32],
                confirm_signatures: vec![5; 65],
                committed_fee: 0,
                bond: MIN_EXIT_BOND,
            }]
        );
    }

    #[tokio::test]
    async fn explicit_fields_override_node_evidence() {
        let bridge = MockBridge::new();
        let position = Position::transaction(4, 1, 0);
        let mut request = ExitRequest::new(owner(), position);
        request.trust_node = true;
        request.proof = Some(vec![9; 32]);

        start_exit(&bridge, &CannedNode(full_evidence()), &request)
            .await
            .unwrap();
        match &bridge.submissions()[0] {
            ExitSubmission::Transaction { proof, tx_bytes, .. } => {
                assert_eq!(proof, &vec![9; 32]);
                assert_eq!(tx_bytes, &vec![1, 2, 3]);
            }
            other => panic!("unexpected submission {other:?}"),
        }
    }

    #[tokio::test]
    async fn already_exited_position_is_refused() {
        let position = Position::deposit(7);
        let bridge = MockBridge::new().with_exited(position);
        let request = ExitRequest::new(owner(), position);

        let err = start_exit(&bridge, &NoTrustedNode, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, PlasmaError::AlreadyExited(_)));
        assert!(bridge.submissions().is_empty());
    }

    #[test]
    fn evidence_decodes_from_command_surface_hex() {
        let evidence = ExitEvidence::from_hex("0x010203", "0404", "").unwrap();
        assert_eq!(evidence.tx_bytes, vec![1, 2, 3]);
        assert_eq!(evidence.proof, vec![4, 4]);
        assert!(evidence.confirm_signatures.is_empty());

        assert!(ExitEvidence::from_hex("zz", "", "").is_err());
    }

    #[tokio::test]
    async fn untrusted_node_is_never_queried() {
        // NoTrustedNode errors on use; with trust_node unset and full
        // explicit evidence the exit must still go through
        let bridge = MockBridge::new();
        let position = Position::transaction(4, 1, 0);
        let mut request = ExitRequest::new(owner(), position);
        let evidence = full_evidence();
        request.tx_bytes = Some(evidence.tx_bytes);
        request.proof = Some(evidence.proof);
        request.confirm_signatures = Some(evidence.confirm_signatures);

        start_exit(&bridge, &NoTrustedNode, &request).await.unwrap();
        assert_eq!(bridge.submissions().len(), 1);
    }
}
