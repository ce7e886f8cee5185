//! Bridge protocol
//!
//! [`Bridge`] carries the claim protocol shared by every asset: the precondition
//! checks and the `process_message` dispatcher that routes a claim attempt to
//! new-message processing, retry or release based on the destination status.
//! Asset-specific sending lives in the `eth`, `erc20`, `erc721` and `erc1155`
//! submodules.
//!
//! The status read in [`Bridge::before_processing`] and the later submission
//! are not atomic. The client-side check is a fast fail; the bridge contract
//! re-validates status on-chain.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{bump_for_contract, GasLimitConfig, CLAIM_FALLBACK_GAS};
use crate::error::{BridgeError, ChainError, Result};
use crate::evm::contracts::{self, Bridge as BridgeContract};
use crate::evm::{ChainReader, ContractCall, Wallet};
use crate::prover::BridgeProver;
use crate::routing::RoutingMap;
use crate::tokens::TokenResolver;
use crate::types::{BridgeTransaction, Message, MessageStatus, TokenType};

pub mod erc1155;
pub mod erc20;
pub mod erc721;
pub mod eth;


pub use erc1155::Erc1155Bridge;
pub use erc20::Erc20Bridge;
pub use erc721::Erc721Bridge;
pub use eth::EthBridge;

// ============================================================================
// Arguments
// ============================================================================

/// Shared collaborators of every bridge variant
pub struct BridgeContext {
    pub reader: Arc<dyn ChainReader>,
    pub prover: Arc<dyn BridgeProver>,
    pub routing: Arc<RoutingMap>,
    pub tokens: Arc<dyn TokenResolver>,
    pub gas: GasLimitConfig,
}

impl BridgeContext {
    /// Fail with `BridgePaused` if the source bridge is paused
    pub async fn ensure_not_paused(&self, src_chain_id: u64, dest_chain_id: u64) -> Result<()> {
        let src_bridge = self.routing.get(src_chain_id, dest_chain_id)?.bridge_address;
        if self.reader.is_paused(src_chain_id, src_bridge).await? {
            return Err(BridgeError::BridgePaused);
        }
        Ok(())
    }

    async fn is_contract(&self, chain_id: u64, address: Address) -> Result<bool> {
        if address == Address::ZERO {
            return Ok(false);
        }
        Ok(self.reader.is_contract(chain_id, address).await?)
    }
}

/// A claim, retry or release request
#[derive(Clone, Copy)]
pub struct ClaimArgs<'a> {
    pub bridge_tx: &'a BridgeTransaction,
    pub wallet: &'a dyn Wallet,
    /// Final retry: a failing destination call moves the message to FAILED
    pub last_attempt: bool,
    /// Submit new-message claims without simulating first
    pub force: bool,
}

impl<'a> ClaimArgs<'a> {
    pub fn new(bridge_tx: &'a BridgeTransaction, wallet: &'a dyn Wallet) -> Self {
        Self {
            bridge_tx,
            wallet,
            last_attempt: false,
            force: false,
        }
    }
}

/// Asset carried by an outgoing transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Eth {
        amount: U256,
    },
    Erc20 {
        token: Address,
        amount: U256,
    },
    Erc721 {
        token: Address,
        token_ids: Vec<U256>,
    },
    Erc1155 {
        token: Address,
        token_ids: Vec<U256>,
        amounts: Vec<U256>,
    },
}

impl Asset {
    pub fn token_type(&self) -> TokenType {
        match self {
            Asset::Eth { .. } => TokenType::Eth,
            Asset::Erc20 { .. } => TokenType::Erc20,
            Asset::Erc721 { .. } => TokenType::Erc721,
            Asset::Erc1155 { .. } => TokenType::Erc1155,
        }
    }
}

/// An outgoing transfer
#[derive(Clone)]
pub struct BridgeArgs<'a> {
    pub wallet: &'a dyn Wallet,
    pub src_chain_id: u64,
    pub dest_chain_id: u64,
    pub to: Address,
    /// Owner on the destination chain, defaults to `to`
    pub dest_owner: Option<Address>,
    pub fee: U256,
    pub memo: String,
    pub asset: Asset,
}

impl BridgeArgs<'_> {
    pub fn dest_owner(&self) -> Address {
        self.dest_owner.unwrap_or(self.to)
    }

    /// The wallet must sit on the source chain to send
    pub async fn ensure_source_chain(&self) -> Result<()> {
        let connected = connected_chain(self.wallet).await?;
        if connected != self.src_chain_id {
            return Err(BridgeError::WrongChain {
                expected: self.src_chain_id,
                actual: connected,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Bridge Trait
// ============================================================================

#[async_trait]
pub trait Bridge: Send + Sync {
    fn context(&self) -> &BridgeContext;

    fn token_type(&self) -> TokenType;

    async fn estimate_gas(&self, args: &BridgeArgs<'_>) -> Result<u64>;

    /// Send the transfer on the source chain
    async fn bridge(&self, args: &BridgeArgs<'_>) -> Result<TxHash>;

    /// Fail with `InsufficientBalance` if the wallet cannot cover the transfer
    async fn check_balance_to_bridge(&self, args: &BridgeArgs<'_>) -> Result<()>;

    /// Explicit gas for claiming `message`, bypassing estimation
    fn claim_gas_override(&self, _message: &Message) -> Option<u64> {
        None
    }

    // =========================================================================
    // Preconditions
    // =========================================================================

    /// Owner check and destination status read, rejecting settled messages
    async fn before_processing(&self, args: &ClaimArgs<'_>) -> Result<MessageStatus> {
        let (message, msg_hash) = args.bridge_tx.message_and_hash()?;

        let account = args.wallet.address();
        if account != message.src_owner {
            return Err(BridgeError::WrongOwner(format!(
                "{} is not the source owner {}",
                account, message.src_owner
            )));
        }

        let ctx = self.context();
        let dest_bridge = ctx
            .routing
            .get(message.dest_chain_id, message.src_chain_id)?
            .bridge_address;

        let status = ctx
            .reader
            .message_status(message.dest_chain_id, dest_bridge, msg_hash)
            .await?;

        debug!(msg_hash = %msg_hash, status = %status, "Claiming message");

        if status == MessageStatus::Done {
            return Err(BridgeError::status(status, "message already processed"));
        }
        Ok(status)
    }

    /// Wallet must be on the destination chain
    async fn before_claiming(&self, args: &ClaimArgs<'_>, status: MessageStatus) -> Result<()> {
        let (message, _) = args.bridge_tx.message_and_hash()?;

        let connected = connected_chain(args.wallet).await?;
        if connected != message.dest_chain_id {
            return Err(BridgeError::WrongChain {
                expected: message.dest_chain_id,
                actual: connected,
            });
        }

        match status {
            MessageStatus::Done => Err(BridgeError::status(status, "message already processed")),
            MessageStatus::Failed => Err(BridgeError::status(
                status,
                "message has failed and can only be released",
            )),
            _ => Ok(()),
        }
    }

    async fn before_retrying(&self, args: &ClaimArgs<'_>, status: MessageStatus) -> Result<()> {
        self.before_claiming(args, status).await
    }

    /// Wallet must be on the source chain, the refund destination
    async fn before_releasing(&self, args: &ClaimArgs<'_>, status: MessageStatus) -> Result<()> {
        let (message, _) = args.bridge_tx.message_and_hash()?;

        let connected = connected_chain(args.wallet).await?;
        if connected != message.src_chain_id {
            return Err(BridgeError::WrongChain {
                expected: message.src_chain_id,
                actual: connected,
            });
        }

        match status {
            MessageStatus::Done => Err(BridgeError::status(status, "message already processed")),
            MessageStatus::Failed => Ok(()),
            _ => Err(BridgeError::status(
                status,
                "message must fail to release funds",
            )),
        }
    }

    // =========================================================================
    // Dispatcher
    // =========================================================================

    /// Claim, retry or release depending on the destination status
    async fn process_message(&self, args: &ClaimArgs<'_>) -> Result<TxHash> {
        let status = self.before_processing(args).await?;

        let block_number = args
            .bridge_tx
            .send_block_number()
            .ok_or_else(|| BridgeError::process("Blocknumber is not defined"))?;

        debug!(
            tx_hash = %args.bridge_tx.hash,
            status = %status,
            block_number = block_number,
            last_attempt = args.last_attempt,
            "Processing message"
        );

        let result = match status {
            MessageStatus::New => match self.before_claiming(args, status).await {
                Ok(()) => self.process_new_message(args).await,
                Err(e) => Err(e),
            },
            MessageStatus::Retriable => match self.before_retrying(args, status).await {
                Ok(()) => self.retry_message(args).await,
                Err(e) => Err(e),
            },
            MessageStatus::Failed => match self.before_releasing(args, status).await {
                Ok(()) => self.release(args).await,
                Err(e) => Err(e),
            },
            _ => Err(BridgeError::process(
                "Message status not supported for claiming.",
            )),
        };

        result.map_err(|e| match e {
            BridgeError::Chain(ChainError::UserRejected) => BridgeError::UserRejected,
            other => other,
        })
    }

    /// Prove and submit `processMessage` on the destination bridge
    async fn process_new_message(&self, args: &ClaimArgs<'_>) -> Result<TxHash> {
        let ctx = self.context();
        let (message, msg_hash) = args.bridge_tx.message_and_hash()?;
        let proof = ctx.prover.get_encoded_signal_proof(args.bridge_tx).await?;

        let dest_bridge = ctx
            .routing
            .get(message.dest_chain_id, message.src_chain_id)?
            .bridge_address;

        let input = BridgeContract::processMessageCall {
            message: contracts::Message::from(message),
            proof,
        }
        .abi_encode();
        let call = ContractCall::new(dest_bridge, input);

        let mut gas = match self.claim_gas_override(message) {
            Some(gas) => gas,
            None => match args.wallet.estimate_gas(&call).await {
                Ok(gas) => gas,
                Err(e) => {
                    warn!(error = %e, fallback = CLAIM_FALLBACK_GAS, "Failed to estimate gas, using fallback");
                    CLAIM_FALLBACK_GAS
                }
            },
        };

        if ctx.is_contract(message.dest_chain_id, message.to).await? {
            debug!(to = %message.to, "Recipient is a smart contract, increasing gas by 5 percent");
            gas = bump_for_contract(gas);
        }

        let tx_hash = args
            .wallet
            .send(call.with_gas(gas).skip_simulation(args.force))
            .await
            .map_err(|e| {
                BridgeError::from_write(e, |cause| BridgeError::ProcessMessage {
                    reason: "failed to process message".to_string(),
                    cause: Some(cause),
                })
            })?;

        info!(msg_hash = %msg_hash, tx_hash = %tx_hash, gas = gas, "Submitted processMessage");
        Ok(tx_hash)
    }

    /// Submit `retryMessage` on the destination bridge
    async fn retry_message(&self, args: &ClaimArgs<'_>) -> Result<TxHash> {
        let ctx = self.context();
        let (message, msg_hash) = args.bridge_tx.message_and_hash()?;

        let dest_bridge = ctx
            .routing
            .get(message.dest_chain_id, message.src_chain_id)?
            .bridge_address;

        let input = BridgeContract::retryMessageCall {
            message: contracts::Message::from(message),
            isLastAttempt: args.last_attempt,
        }
        .abi_encode();
        let call = ContractCall::new(dest_bridge, input);

        let mut gas = match self.claim_gas_override(message) {
            Some(gas) => gas,
            None => args
                .wallet
                .estimate_gas(&call)
                .await
                .map_err(|e| BridgeError::from_write(e, BridgeError::Retry))?,
        };

        if ctx.is_contract(message.dest_chain_id, message.to).await? {
            debug!(to = %message.to, "Recipient is a smart contract, increasing gas by 5 percent");
            gas = bump_for_contract(gas);
        }

        let tx_hash = args
            .wallet
            .send(call.with_gas(gas))
            .await
            .map_err(|e| BridgeError::from_write(e, BridgeError::Retry))?;

        info!(
            msg_hash = %msg_hash,
            tx_hash = %tx_hash,
            last_attempt = args.last_attempt,
            "Submitted retryMessage"
        );
        Ok(tx_hash)
    }

    /// Prove the failure and submit `recallMessage` on the source bridge
    async fn release(&self, args: &ClaimArgs<'_>) -> Result<TxHash> {
        let ctx = self.context();
        let (message, msg_hash) = args.bridge_tx.message_and_hash()?;
        let proof = ctx
            .prover
            .get_encoded_signal_proof_for_recall(args.bridge_tx)
            .await?;

        let src_bridge = ctx
            .routing
            .get(message.src_chain_id, message.dest_chain_id)?
            .bridge_address;

        let input = BridgeContract::recallMessageCall {
            message: contracts::Message::from(message),
            proof,
        }
        .abi_encode();
        let call = ContractCall::new(src_bridge, input);

        let mut gas = args
            .wallet
            .estimate_gas(&call)
            .await
            .map_err(|e| BridgeError::from_write(e, BridgeError::Release))?;

        if ctx.is_contract(message.src_chain_id, message.from).await? {
            debug!(from = %message.from, "Sender is a smart contract, increasing gas by 5 percent");
            gas = bump_for_contract(gas);
        }

        let tx_hash = args
            .wallet
            .send(call.with_gas(gas))
            .await
            .map_err(|e| BridgeError::from_write(e, BridgeError::Release))?;

        info!(msg_hash = %msg_hash, tx_hash = %tx_hash, "Submitted recallMessage");
        Ok(tx_hash)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// One bridge per asset class, dispatched by [`TokenType`]
pub enum BridgeKind {
    Eth(EthBridge),
    Erc20(Erc20Bridge),
    Erc721(Erc721Bridge),
    Erc1155(Erc1155Bridge),
}

impl BridgeKind {
    pub fn new(token_type: TokenType, ctx: Arc<BridgeContext>) -> Self {
        match token_type {
            TokenType::Eth => BridgeKind::Eth(EthBridge::new(ctx)),
            TokenType::Erc20 => BridgeKind::Erc20(Erc20Bridge::new(ctx)),
            TokenType::Erc721 => BridgeKind::Erc721(Erc721Bridge::new(ctx)),
            TokenType::Erc1155 => BridgeKind::Erc1155(Erc1155Bridge::new(ctx)),
        }
    }

    /// Bridge handling `bridge_tx`'s asset class
    pub fn for_transaction(bridge_tx: &BridgeTransaction, ctx: Arc<BridgeContext>) -> Self {
        Self::new(bridge_tx.token_type, ctx)
    }

    pub fn as_bridge(&self) -> &dyn Bridge {
        match self {
            BridgeKind::Eth(b) => b,
            BridgeKind::Erc20(b) => b,
            BridgeKind::Erc721(b) => b,
            BridgeKind::Erc1155(b) => b,
        }
    }

    pub async fn process_message(&self, args: &ClaimArgs<'_>) -> Result<TxHash> {
        self.as_bridge().process_message(args).await
    }

    pub async fn bridge(&self, args: &BridgeArgs<'_>) -> Result<TxHash> {
        self.as_bridge().bridge(args).await
    }

    pub async fn estimate_gas(&self, args: &BridgeArgs<'_>) -> Result<u64> {
        self.as_bridge().estimate_gas(args).await
    }
}

/// Chain the wallet is connected to
pub(crate) async fn connected_chain(wallet: &dyn Wallet) -> Result<u64> {
    wallet.chain_id().await.map_err(|e| {
        warn!(wallet = %wallet.address(), error = %e, "Wallet did not report a chain");
        BridgeError::WalletNotConnected
    })
}

/// Reject arguments whose asset does not match the bridge
pub(crate) fn unsupported(expected: TokenType, asset: &Asset) -> BridgeError {
    BridgeError::UnsupportedAsset(format!(
        "{} bridge cannot send {}",
        expected,
        asset.token_type()
    ))
}
