//! ERC721 transfers through the ERC721 vault

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::info;

use crate::error::{BridgeError, Result};
use crate::evm::contracts::{ERC721Vault, NftBridgeTransferOp, IERC721};
use crate::evm::{ContractCall, Wallet};
use crate::types::TokenType;

use super::{unsupported, Asset, Bridge, BridgeArgs, BridgeContext};

pub struct Erc721Bridge {
    ctx: Arc<BridgeContext>,
}

impl Erc721Bridge {
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        Self { ctx }
    }

    fn token_and_ids(args: &BridgeArgs<'_>) -> Result<(Address, Vec<U256>)> {
        match &args.asset {
            Asset::Erc721 { token, token_ids } => Ok((*token, token_ids.clone())),
            other => Err(unsupported(TokenType::Erc721, other)),
        }
    }

    fn vault(&self, src_chain_id: u64, dest_chain_id: u64) -> Result<Address> {
        Ok(self
            .ctx
            .routing
            .get(src_chain_id, dest_chain_id)?
            .erc721_vault_address)
    }

    /// Whether the source vault is the approved operator of `token_id`
    pub async fn is_approved(
        &self,
        token: Address,
        token_id: U256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<bool> {
        let vault = self.vault(src_chain_id, dest_chain_id)?;
        let approved = self
            .ctx
            .reader
            .erc721_get_approved(src_chain_id, token, token_id)
            .await?;
        Ok(approved == vault)
    }

    /// Approve the source vault for `token_id`
    pub async fn approve(
        &self,
        wallet: &dyn Wallet,
        token: Address,
        token_id: U256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<TxHash> {
        if self
            .is_approved(token, token_id, src_chain_id, dest_chain_id)
            .await?
        {
            return Err(BridgeError::NoApprovalRequired);
        }

        let vault = self.vault(src_chain_id, dest_chain_id)?;
        let input = IERC721::approveCall {
            to: vault,
            tokenId: token_id,
        }
        .abi_encode();

        let tx_hash = wallet
            .send(ContractCall::new(token, input))
            .await
            .map_err(|e| BridgeError::from_write(e, BridgeError::Approve))?;

        info!(token = %token, token_id = %token_id, tx_hash = %tx_hash, "Approved ERC721");
        Ok(tx_hash)
    }

    async fn prepare(&self, args: &BridgeArgs<'_>) -> Result<ContractCall> {
        let (token, token_ids) = Self::token_and_ids(args)?;
        let info = self
            .ctx
            .tokens
            .resolve(token, TokenType::Erc721, args.src_chain_id, args.dest_chain_id)
            .await?;

        let amounts = vec![U256::ZERO; token_ids.len()];
        let op = NftBridgeTransferOp {
            destChainId: args.dest_chain_id,
            destOwner: args.dest_owner(),
            to: args.to,
            fee: args.fee,
            token,
            gasLimit: self.ctx.gas.message_gas_limit(
                TokenType::Erc721,
                !args.fee.is_zero(),
                info.deployed_on_dest,
            ),
            tokenIds: token_ids,
            amounts,
            refundTo: args.wallet.address(),
            memo: args.memo.clone(),
        };

        let vault = self.vault(args.src_chain_id, args.dest_chain_id)?;
        let input = ERC721Vault::sendTokenCall { op }.abi_encode();
        Ok(ContractCall::new(vault, input).with_value(args.fee))
    }
}

#[async_trait]
impl Bridge for Erc721Bridge {
    fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    fn token_type(&self) -> TokenType {
        TokenType::Erc721
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

    /// ERC721 balances are ownership; the vault approval check covers it
    async fn check_balance_to_bridge(&self, args: &BridgeArgs<'_>) -> Result<()> {
        Self::token_and_ids(args)?;
        Ok(())
    }

    async fn bridge(&self, args: &BridgeArgs<'_>) -> Result<TxHash> {
        args.ensure_source_chain().await?;
        self.ctx
            .ensure_not_paused(args.src_chain_id, args.dest_chain_id)
            .await?;

        let (token, token_ids) = Self::token_and_ids(args)?;
        let info = self
            .ctx
            .tokens
            .resolve(token, TokenType::Erc721, args.src_chain_id, args.dest_chain_id)
            .await?;

        if info.is_canonical(token, args.src_chain_id) {
            for token_id in &token_ids {
                if !self
                    .is_approved(token, *token_id, args.src_chain_id, args.dest_chain_id)
                    .await?
                {
                    return Err(BridgeError::NotApproved(format!(
                        "token {} id {} is not approved for the vault",
                        token, token_id
                    )));
                }
            }
        }

        let call = self.prepare(args).await?;
        let tx_hash = args.wallet.send(call).await.map_err(|e| {
            BridgeError::from_write(e, |cause| BridgeError::Send {
                asset: TokenType::Erc721,
                cause,
            })
        })?;

        info!(
            tx_hash = %tx_hash,
            token = %token,
            count = token_ids.len(),
            dest_chain_id = args.dest_chain_id,
            "Sent ERC721 tokens"
        );
        Ok(tx_hash)
    }
}
