//! web3-backed implementation of the rootchain bridge.
//!
//! Calls go out as raw selector-plus-ABI payloads over HTTP RPC; exit
//! submissions are signed locally and sent as raw transactions. Every
//! remote call runs under the configured timeout so a stalled rootchain
//! node surfaces as a bridge error instead of stalling block processing.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use web3::ethabi::{self, ParamType, Token};
use web3::signing::SecretKey;
use web3::transports::Http;
use web3::types::{Address, Bytes, CallRequest, TransactionParameters, H256, U256};
use web3::Web3;

use crate::config::PlasmaConfig;
use crate::crypto::keccak256;
use crate::error::PlasmaError;
use crate::plasma::Position;
use crate::rootchain::bridge::{Deposit, DepositLookup, ExitOpts, RootchainBridge};

const GET_DEPOSIT: &str = "getDeposit(uint256)";
const HAS_TX_BEEN_EXITED: &str = "hasTxBeenExited(uint256[4])";
const START_DEPOSIT_EXIT: &str = "startDepositExit(uint256,uint256)";
const START_TRANSACTION_EXIT: &str = "startTransactionExit(uint256[3],bytes,bytes,bytes,uint256)";

/// Rootchain bridge over an Ethereum JSON-RPC endpoint.
pub struct Web3Bridge {
    web3: Web3<Http>,
    contract: Address,
    signer: SecretKey,
    finality_confirmations: u64,
    call_timeout: Duration,
}

impl Web3Bridge {
    /// Connect to the configured endpoint, signing exit submissions with
    /// the given 32-byte secret key.
    pub fn new(config: &PlasmaConfig, signer_key: &[u8; 32]) -> Result<Self, PlasmaError> {
        let transport = Http::new(&config.ethereum_url)
            .map_err(|e| PlasmaError::Bridge(format!("connecting to rootchain rpc: {e}")))?;
        let signer = SecretKey::from_slice(signer_key)
            .map_err(|e| PlasmaError::Bridge(format!("invalid signer key: {e}")))?;
        Ok(Self {
            web3: Web3::new(transport),
            contract: config.contract_address,
            signer,
            finality_confirmations: config.finality_confirmations,
            call_timeout: Duration::from_millis(config.call_timeout_ms),
        })
    }

    /// Run one remote call under the configured bound.
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, PlasmaError>
    where
        F: Future<Output = web3::error::Result<T>>,
    {
        match timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(PlasmaError::Bridge(format!("{what}: {e}"))),
            Err(_) => Err(PlasmaError::Bridge(format!(
                "{what} timed out after {:?}",
                self.call_timeout
            ))),
        }
    }

    async fn call_contract(&self, what: &str, data: Vec<u8>) -> Result<Vec<u8>, PlasmaError> {
        let request = CallRequest {
            to: Some(self.contract),
            data: Some(Bytes(data)),
            ..Default::default()
        };
        let output = self
            .bounded(what, self.web3.eth().call(request, None))
            .await?;
        Ok(output.0)
    }

    async fn send_contract_tx(
        &self,
        what: &str,
        data: Vec<u8>,
        value: u64,
        gas_limit: u64,
    ) -> Result<H256, PlasmaError> {
        let tx = TransactionParameters {
            to: Some(self.contract),
            gas: gas_limit.into(),
            value: value.into(),
            data: Bytes(data),
            ..Default::default()
        };
        let signed = self
            .bounded(what, self.web3.accounts().sign_transaction(tx, &self.signer))
            .await?;
        let hash = self
            .bounded(
                what,
                self.web3.eth().send_raw_transaction(signed.raw_transaction),
            )
            .await?;
        log::info!("{what} submitted as {hash:#x}");
        Ok(hash)
    }
}

impl RootchainBridge for Web3Bridge {
    async fn get_deposit(&self, nonce: u64) -> Result<DepositLookup, PlasmaError> {
        let data = call_data(GET_DEPOSIT, &[Token::Uint(U256::from(nonce))]);
        let output = self.call_contract("getDeposit", data).await?;

        let tokens = ethabi::decode(
            &[
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::Uint(256),
            ],
            &output,
        )
        .map_err(|e| PlasmaError::Bridge(format!("decoding getDeposit return: {e}")))?;
        let (owner, amount, created_block) = match tokens.as_slice() {
            [Token::Address(owner), Token::Uint(amount), Token::Uint(created)] => {
                (*owner, *amount, *created)
            }
            other => {
                return Err(PlasmaError::Bridge(format!(
                    "unexpected getDeposit return shape: {other:?}"
                )))
            }
        };

        // the contract zeroes unknown nonces
        if owner == Address::zero() {
            return Ok(DepositLookup::Unknown);
        }
        let deposit = Deposit {
            owner,
            amount: u256_to_u64("deposit amount", amount)?,
            created_block: u256_to_u64("deposit block", created_block)?,
        };

        let head = self
            .bounded("eth_blockNumber", self.web3.eth().block_number())
            .await?
            .as_u64();
        if head.saturating_sub(deposit.created_block) < self.finality_confirmations {
            log::debug!(
                "deposit {nonce} created at rootchain block {} not yet final at head {head}",
                deposit.created_block
            );
            return Ok(DepositLookup::Pending);
        }
        Ok(DepositLookup::Finalized(deposit))
    }

    async fn has_exited(&self, position: &Position) -> Result<bool, PlasmaError> {
        let quadruple = position.exit_quadruple().map(Token::Uint).to_vec();
        let data = call_data(HAS_TX_BEEN_EXITED, &[Token::FixedArray(quadruple)]);
        let output = self.call_contract("hasTxBeenExited", data).await?;

        let tokens = ethabi::decode(&[ParamType::Bool], &output)
            .map_err(|e| PlasmaError::Bridge(format!("decoding hasTxBeenExited return: {e}")))?;
        match tokens.as_slice() {
            [Token::Bool(exited)] => Ok(*exited),
            other => Err(PlasmaError::Bridge(format!(
                "unexpected hasTxBeenExited return shape: {other:?}"
            ))),
        }
    }

    async fn start_deposit_exit(
        &self,
        nonce: u64,
        committed_fee: u64,
        opts: &ExitOpts,
    ) -> Result<H256, PlasmaError> {
        let data = call_data(
            START_DEPOSIT_EXIT,
            &[
                Token::Uint(U256::from(nonce)),
                Token::Uint(U256::from(committed_fee)),
            ],
        );
        self.send_contract_tx("startDepositExit", data, opts.bond, opts.gas_limit)
            .await
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
        let triple = position.exit_triple().map(Token::Uint).to_vec();
        let data = call_data(
            START_TRANSACTION_EXIT,
            &[
                Token::FixedArray(triple),
                Token::Bytes(tx_bytes.to_vec()),
                Token::Bytes(proof.to_vec()),
                Token::Bytes(confirm_signatures.to_vec()),
                Token::Uint(U256::from(committed_fee)),
            ],
        );
        self.send_contract_tx("startTransactionExit", data, opts.bond, opts.gas_limit)
            .await
    }
}

/// Selector-plus-arguments payload for a contract call.
fn call_data(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = keccak256(signature.as_bytes())[..4].to_vec();
    data.extend(ethabi::encode(tokens));
    data
}

fn u256_to_u64(what: &str, value: U256) -> Result<u64, PlasmaError> {
    if value > U256::from(u64::MAX) {
        return Err(PlasmaError::Bridge(format!("{what} {value} overflows u64")));
    }
    Ok(value.as_u64())
}
