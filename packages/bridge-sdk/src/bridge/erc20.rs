//! ERC20 transfers through the ERC20 vault
//!
//! Canonical tokens are escrowed by the vault and need an allowance first.
//! Bridged tokens are burned by the vault, so no allowance is checked.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{BridgeError, Result};
use crate::evm::contracts::{BridgeTransferOp, ERC20Vault, IERC20};
use crate::evm::{ContractCall, Wallet};
use crate::types::{Message, TokenType};

use super::{unsupported, Asset, Bridge, BridgeArgs, BridgeContext};

pub struct Erc20Bridge {
    ctx: Arc<BridgeContext>,
}

impl Erc20Bridge {
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        Self { ctx }
    }

    fn token_and_amount(args: &BridgeArgs<'_>) -> Result<(Address, U256)> {
        match &args.asset {
            Asset::Erc20 { token, amount } => Ok((*token, *amount)),
            other => Err(unsupported(TokenType::Erc20, other)),
        }
    }

    fn vault(&self, src_chain_id: u64, dest_chain_id: u64) -> Result<Address> {
        Ok(self
            .ctx
            .routing
            .get(src_chain_id, dest_chain_id)?
            .erc20_vault_address)
    }

    /// Whether the vault's allowance for `owner` is below `amount`
    pub async fn require_allowance(
        &self,
        token: Address,
        owner: Address,
        amount: U256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<bool> {
        let vault = self.vault(src_chain_id, dest_chain_id)?;
        let allowance = self
            .ctx
            .reader
            .erc20_allowance(src_chain_id, token, owner, vault)
            .await?;
        debug!(token = %token, allowance = %allowance, amount = %amount, "Checked allowance");
        Ok(allowance < amount)
    }

    /// Approve the source vault to spend `amount`
    ///
    /// Fails with `NoAllowanceRequired` when the current allowance already covers it.
    pub async fn approve(
        &self,
        wallet: &dyn Wallet,
        token: Address,
        amount: U256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<TxHash> {
        if !self
            .require_allowance(token, wallet.address(), amount, src_chain_id, dest_chain_id)
            .await?
        {
            return Err(BridgeError::NoAllowanceRequired);
        }

        let vault = self.vault(src_chain_id, dest_chain_id)?;
        let input = IERC20::approveCall {
            spender: vault,
            amount,
        }
        .abi_encode();

        let tx_hash = wallet
            .send(ContractCall::new(token, input))
            .await
            .map_err(|e| BridgeError::from_write(e, BridgeError::Approve))?;

        info!(token = %token, spender = %vault, amount = %amount, tx_hash = %tx_hash, "Approved ERC20");
        Ok(tx_hash)
    }

    async fn prepare(&self, args: &BridgeArgs<'_>) -> Result<ContractCall> {
        let (token, amount) = Self::token_and_amount(args)?;
        let info = self
            .ctx
            .tokens
            .resolve(token, TokenType::Erc20, args.src_chain_id, args.dest_chain_id)
            .await?;

        let gas_limit = self.ctx.gas.message_gas_limit(
            TokenType::Erc20,
            !args.fee.is_zero(),
            info.deployed_on_dest,
        );

        let op = BridgeTransferOp {
            destChainId: args.dest_chain_id,
            destOwner: args.dest_owner(),
            to: args.to,
            fee: args.fee,
            token,
            gasLimit: gas_limit,
            amount,
            refundTo: args.wallet.address(),
            memo: args.memo.clone(),
        };

        let vault = self.vault(args.src_chain_id, args.dest_chain_id)?;
        let input = ERC20Vault::sendTokenCall { op }.abi_encode();
        Ok(ContractCall::new(vault, input).with_value(args.fee))
    }
}

#[async_trait]
impl Bridge for Erc20Bridge {
    fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    fn token_type(&self) -> TokenType {
        TokenType::Erc20
    }

    fn claim_gas_override(&self, message: &Message) -> Option<u64> {
        (message.gas_limit > self.ctx.gas.erc20_gas_limit_threshold)
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

    async fn check_balance_to_bridge(&self, args: &BridgeArgs<'_>) -> Result<()> {
        let (token, amount) = Self::token_and_amount(args)?;
        if token == Address::ZERO {
            return Err(BridgeError::InsufficientBalance);
        }
        let balance = self
            .ctx
            .reader
            .erc20_balance(args.src_chain_id, token, args.wallet.address())
            .await?;
        if balance < amount {
            return Err(BridgeError::InsufficientBalance);
        }
        Ok(())
    }

    async fn bridge(&self, args: &BridgeArgs<'_>) -> Result<TxHash> {
        args.ensure_source_chain().await?;
        self.ctx
            .ensure_not_paused(args.src_chain_id, args.dest_chain_id)
            .await?;

        let (token, amount) = Self::token_and_amount(args)?;
        let info = self
            .ctx
            .tokens
            .resolve(token, TokenType::Erc20, args.src_chain_id, args.dest_chain_id)
            .await?;

        if info.is_canonical(token, args.src_chain_id)
            && self
                .require_allowance(
                    token,
                    args.wallet.address(),
                    amount,
                    args.src_chain_id,
                    args.dest_chain_id,
                )
                .await?
        {
            return Err(BridgeError::InsufficientAllowance);
        }

        let call = self.prepare(args).await?;
        let tx_hash = args.wallet.send(call).await.map_err(|e| {
            BridgeError::from_write(e, |cause| BridgeError::Send {
                asset: TokenType::Erc20,
                cause,
            })
        })?;

        info!(
            tx_hash = %tx_hash,
            token = %token,
            amount = %amount,
            dest_chain_id = args.dest_chain_id,
            "Sent ERC20 token"
        );
        Ok(tx_hash)
    }
}
