//! ERC1155 transfers through the ERC1155 vault
//!
//! Approval is operator-wide (`setApprovalForAll`), not per id. Retrying a
//! RETRIABLE ERC1155 message is not supported yet; release goes through the
//! shared protocol.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{BridgeError, Result};
use crate::evm::contracts::{ERC1155Vault, NftBridgeTransferOp, IERC1155};
use crate::evm::{ContractCall, Wallet};
use crate::types::{Message, TokenType};

use super::{unsupported, Asset, Bridge, BridgeArgs, BridgeContext, ClaimArgs};

pub struct Erc1155Bridge {
    ctx: Arc<BridgeContext>,
}

struct Erc1155Transfer {
    token: Address,
    token_ids: Vec<U256>,
    amounts: Vec<U256>,
}

impl Erc1155Bridge {
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        Self { ctx }
    }

    fn transfer(args: &BridgeArgs<'_>) -> Result<Erc1155Transfer> {
        match &args.asset {
            Asset::Erc1155 {
                token,
                token_ids,
                amounts,
            } => {
                if token_ids.is_empty() || token_ids.len() != amounts.len() {
                    return Err(BridgeError::UnsupportedAsset(format!(
                        "{} token ids with {} amounts",
                        token_ids.len(),
                        amounts.len()
                    )));
                }
                Ok(Erc1155Transfer {
                    token: *token,
                    token_ids: token_ids.clone(),
                    amounts: amounts.clone(),
                })
            }
            other => Err(unsupported(TokenType::Erc1155, other)),
        }
    }

    fn vault(&self, src_chain_id: u64, dest_chain_id: u64) -> Result<Address> {
        Ok(self
            .ctx
            .routing
            .get(src_chain_id, dest_chain_id)?
            .erc1155_vault_address)
    }

    /// Whether `owner` has approved the source vault as operator
    pub async fn is_approved_for_all(
        &self,
        token: Address,
        owner: Address,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<bool> {
        let vault = self.vault(src_chain_id, dest_chain_id)?;
        Ok(self
            .ctx
            .reader
            .erc1155_is_approved_for_all(src_chain_id, token, owner, vault)
            .await?)
    }

    /// Approve the source vault as operator for all of `token`
    pub async fn approve(
        &self,
        wallet: &dyn Wallet,
        token: Address,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<TxHash> {
        if self
            .is_approved_for_all(token, wallet.address(), src_chain_id, dest_chain_id)
            .await?
        {
            return Err(BridgeError::NoApprovalRequired);
        }

        let vault = self.vault(src_chain_id, dest_chain_id)?;
        let input = IERC1155::setApprovalForAllCall {
            operator: vault,
            approved: true,
        }
        .abi_encode();

        let tx_hash = wallet
            .send(ContractCall::new(token, input))
            .await
            .map_err(|e| BridgeError::from_write(e, BridgeError::Approve))?;

        info!(token = %token, operator = %vault, tx_hash = %tx_hash, "Approved ERC1155 operator");
        Ok(tx_hash)
    }

    async fn prepare(&self, args: &BridgeArgs<'_>) -> Result<ContractCall> {
        let transfer = Self::transfer(args)?;
        let info = self
            .ctx
            .tokens
            .resolve(
                transfer.token,
                TokenType::Erc1155,
                args.src_chain_id,
                args.dest_chain_id,
            )
            .await?;

        let op = NftBridgeTransferOp {
            destChainId: args.dest_chain_id,
            destOwner: args.dest_owner(),
            to: args.to,
            fee: args.fee,
            token: transfer.token,
            gasLimit: self.ctx.gas.message_gas_limit(
                TokenType::Erc1155,
                !args.fee.is_zero(),
                info.deployed_on_dest,
            ),
            tokenIds: transfer.token_ids,
            amounts: transfer.amounts,
            refundTo: args.wallet.address(),
            memo: args.memo.clone(),
        };

        let vault = self.vault(args.src_chain_id, args.dest_chain_id)?;
        let input = ERC1155Vault::sendTokenCall { op }.abi_encode();
        Ok(ContractCall::new(vault, input).with_value(args.fee))
    }
}

#[async_trait]
impl Bridge for Erc1155Bridge {
    fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    fn token_type(&self) -> TokenType {
        TokenType::Erc1155
    }

    fn claim_gas_override(&self, message: &Message) -> Option<u64> {
        (message.gas_limit > self.ctx.gas.erc1155_gas_limit_threshold)
            .then_some(u64::from(message.gas_limit))
    }

    async fn estimate_gas(&self, args: &BridgeArgs<'_>) -> Result<u64> {
        self.ctx
            .ensure_not_paused(args.src_chain_id, args.dest_chain_id)
            .await?;
        let call = self.prepare(args).await?;
        args.wallet
            .estimate_gas(&call)
            .await
            .map_err(|e| BridgeError::from_write(e, BridgeError::EstimateGas))
    }

    /// First id's token balance covers its amount and the wallet holds some ETH
    async fn check_balance_to_bridge(&self, args: &BridgeArgs<'_>) -> Result<()> {
        let transfer = Self::transfer(args)?;
        let owner = args.wallet.address();

        let balance = self
            .ctx
            .reader
            .erc1155_balance(args.src_chain_id, transfer.token, owner, transfer.token_ids[0])
            .await?;
        if balance < transfer.amounts[0] {
            return Err(BridgeError::InsufficientBalance);
        }

        let native = self.ctx.reader.native_balance(args.src_chain_id, owner).await?;
        if native.is_zero() {
            return Err(BridgeError::InsufficientBalance);
        }
        Ok(())
    }

    async fn bridge(&self, args: &BridgeArgs<'_>) -> Result<TxHash> {
        args.ensure_source_chain().await?;
        self.ctx
            .ensure_not_paused(args.src_chain_id, args.dest_chain_id)
            .await?;

        let transfer = Self::transfer(args)?;
        let info = self
            .ctx
            .tokens
            .resolve(
                transfer.token,
                TokenType::Erc1155,
                args.src_chain_id,
                args.dest_chain_id,
            )
            .await?;

        if info.is_canonical(transfer.token, args.src_chain_id)
            && !self
                .is_approved_for_all(
                    transfer.token,
                    args.wallet.address(),
                    args.src_chain_id,
                    args.dest_chain_id,
                )
                .await?
        {
            return Err(BridgeError::NotApproved(format!(
                "vault is not an approved operator of {}",
                transfer.token
            )));
        }

        let call = self.prepare(args).await?;
        let tx_hash = args.wallet.send(call).await.map_err(|e| {
            BridgeError::from_write(e, |cause| BridgeError::Send {
                asset: TokenType::Erc1155,
                cause,
            })
        })?;

        info!(
            tx_hash = %tx_hash,
            token = %transfer.token,
            count = transfer.token_ids.len(),
            dest_chain_id = args.dest_chain_id,
            "Sent ERC1155 tokens"
        );
        Ok(tx_hash)
    }

    async fn retry_message(&self, args: &ClaimArgs<'_>) -> Result<TxHash> {
        warn!(tx_hash = %args.bridge_tx.hash, "Retrying ERC1155 messages is not supported");
        Err(BridgeError::NotImplemented(
            "retrying ERC1155 messages".to_string(),
        ))
    }
}
