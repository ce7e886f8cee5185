//! Native ETH transfers through the bridge contract

use std::sync::Arc;

use alloy::primitives::{TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::info;

use crate::error::{BridgeError, Result};
use crate::evm::contracts::{self, Bridge as BridgeContract};
use crate::evm::ContractCall;
use crate::types::{Message, TokenType};

use super::{unsupported, Asset, Bridge, BridgeArgs, BridgeContext};

pub struct EthBridge {
    ctx: Arc<BridgeContext>,
}

impl EthBridge {
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        Self { ctx }
    }

    fn amount(args: &BridgeArgs<'_>) -> Result<U256> {
        match &args.asset {
            Asset::Eth { amount } => Ok(*amount),
            other => Err(unsupported(TokenType::Eth, other)),
        }
    }

    /// Build the `sendMessage` call, carrying amount plus fee as value
    fn prepare(&self, args: &BridgeArgs<'_>) -> Result<ContractCall> {
        let amount = Self::amount(args)?;
        let owner = args.wallet.address();

        let mut message = Message {
            id: 0,
            from: owner,
            src_chain_id: args.src_chain_id,
            dest_chain_id: args.dest_chain_id,
            src_owner: owner,
            dest_owner: args.dest_owner(),
            to: args.to,
            refund_to: owner,
            value: amount,
            fee: args.fee,
            gas_limit: 0,
            data: Default::default(),
            memo: args.memo.clone(),
        };
        message.gas_limit =
            self.ctx
                .gas
                .message_gas_limit(TokenType::Eth, message.has_relayer_fee(), true);
        message.validate()?;

        let src_bridge = self
            .ctx
            .routing
            .get(args.src_chain_id, args.dest_chain_id)?
            .bridge_address;

        let input = BridgeContract::sendMessageCall {
            message: contracts::Message::from(&message),
        }
        .abi_encode();

        Ok(ContractCall::new(src_bridge, input).with_value(amount.saturating_add(args.fee)))
    }
}

#[async_trait]
impl Bridge for EthBridge {
    fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    fn token_type(&self) -> TokenType {
        TokenType::Eth
    }

    async fn estimate_gas(&self, args: &BridgeArgs<'_>) -> Result<u64> {
        self.ctx
            .ensure_not_paused(args.src_chain_id, args.dest_chain_id)
            .await?;
        let call = self.prepare(args)?;
        args.wallet
            .estimate_gas(&call)
            .await
            .map_err(|e| BridgeError::from_write(e, BridgeError::EstimateGas))
    }

    async fn check_balance_to_bridge(&self, args: &BridgeArgs<'_>) -> Result<()> {
        let amount = Self::amount(args)?;
        let balance = self
            .ctx
            .reader
            .native_balance(args.src_chain_id, args.wallet.address())
            .await?;
        if balance < amount.saturating_add(args.fee) {
            return Err(BridgeError::InsufficientBalance);
        }
        Ok(())
    }

    async fn bridge(&self, args: &BridgeArgs<'_>) -> Result<TxHash> {
        args.ensure_source_chain().await?;
        self.ctx
            .ensure_not_paused(args.src_chain_id, args.dest_chain_id)
            .await?;

        let call = self.prepare(args)?;
        let value = call.value;
        let tx_hash = args.wallet.send(call).await.map_err(|e| {
            BridgeError::from_write(e, |cause| BridgeError::Send {
                asset: TokenType::Eth,
                cause,
            })
        })?;

        info!(
            tx_hash = %tx_hash,
            src_chain_id = args.src_chain_id,
            dest_chain_id = args.dest_chain_id,
            value = %value,
            "Sent ETH message"
        );
        Ok(tx_hash)
    }
}
