//! Chain access seam
//!
//! The bridge protocol only talks to chains through two traits:
//!
//! - [`ChainReader`] - read-only, multi-chain, keyed by chain id
//! - [`Wallet`] - a signer connected to exactly one chain
//!
//! [`EvmChainReader`] and [`EvmWallet`] implement them over HTTP with alloy.
//! All failures leave this module as a classified [`ChainError`].

use std::collections::HashMap;

use alloy::{
    eips::BlockNumberOrTag,
    network::EthereumWallet,
    primitives::{Address, Bytes, TxHash, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{BlockTransactionsKind, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::{reqwest::Url, Client, Http},
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::ChainError;
use crate::evm::contracts::{
    Bridge, ERC1155Vault, ERC20Vault, ERC721Vault, SignalService, IERC1155, IERC20, IERC721,
};
use crate::types::{
    InvocationDelays, MessageStatus, ProofReceipt, SyncedChainData, TokenType, TxReceipt,
};

// ============================================================================
// Contract Call
// ============================================================================

/// A single contract write
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContractCall {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    /// Explicit gas limit; `None` leaves it to the wallet's estimation
    pub gas: Option<u64>,
    /// Submit without an `eth_call` dry run first
    pub skip_simulation: bool,
}

impl ContractCall {
    pub fn new(to: Address, input: impl Into<Bytes>) -> Self {
        Self {
            to,
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn skip_simulation(mut self, skip: bool) -> Self {
        self.skip_simulation = skip;
        self
    }

    fn to_request(&self, from: Address) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .from(from)
            .to(self.to)
            .input(self.input.clone().into())
            .value(self.value);
        tx.gas = self.gas;
        tx
    }
}

/// Canonical origin of a bridged token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalToken {
    pub chain_id: u64,
    pub address: Address,
}

// ============================================================================
// Traits
// ============================================================================

/// Read-only access to every chain the client knows about
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn message_status(
        &self,
        chain_id: u64,
        bridge: Address,
        msg_hash: B256,
    ) -> Result<MessageStatus, ChainError>;

    async fn invocation_delays(
        &self,
        chain_id: u64,
        bridge: Address,
    ) -> Result<InvocationDelays, ChainError>;

    async fn proof_receipt(
        &self,
        chain_id: u64,
        bridge: Address,
        msg_hash: B256,
    ) -> Result<ProofReceipt, ChainError>;

    /// `getSyncedChainData(src_chain_id, kind, block_id)` on `chain_id`'s signal service
    async fn synced_chain_data(
        &self,
        chain_id: u64,
        signal_service: Address,
        src_chain_id: u64,
        kind: B256,
        block_id: u64,
    ) -> Result<SyncedChainData, ChainError>;

    async fn latest_block_timestamp(&self, chain_id: u64) -> Result<u64, ChainError>;

    async fn transaction_receipt(
        &self,
        chain_id: u64,
        hash: TxHash,
    ) -> Result<Option<TxReceipt>, ChainError>;

    async fn is_contract(&self, chain_id: u64, address: Address) -> Result<bool, ChainError>;

    async fn is_paused(&self, chain_id: u64, bridge: Address) -> Result<bool, ChainError>;

    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256, ChainError>;

    async fn erc20_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
    ) -> Result<U256, ChainError>;

    async fn erc20_allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;

    async fn erc721_get_approved(
        &self,
        chain_id: u64,
        token: Address,
        token_id: U256,
    ) -> Result<Address, ChainError>;

    async fn erc1155_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        token_id: U256,
    ) -> Result<U256, ChainError>;

    async fn erc1155_is_approved_for_all(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool, ChainError>;

    /// Canonical origin of `token` according to the vault, `None` when the
    /// token is itself canonical
    async fn bridged_to_canonical(
        &self,
        chain_id: u64,
        vault: Address,
        asset: TokenType,
        token: Address,
    ) -> Result<Option<CanonicalToken>, ChainError>;

    /// Bridged counterpart of `canonical` on `chain_id`, `None` when the vault
    /// has not deployed it yet
    async fn canonical_to_bridged(
        &self,
        chain_id: u64,
        vault: Address,
        asset: TokenType,
        canonical: CanonicalToken,
    ) -> Result<Option<Address>, ChainError>;
}

/// A signer connected to one chain
#[async_trait]
pub trait Wallet: Send + Sync {
    fn address(&self) -> Address;

    /// Chain the wallet is currently connected to
    async fn chain_id(&self) -> Result<u64, ChainError>;

    async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, ChainError>;

    /// Simulate (unless skipped) and submit, returning the transaction hash
    async fn send(&self, call: ContractCall) -> Result<TxHash, ChainError>;
}

// ============================================================================
// Alloy Reader
// ============================================================================

/// [`ChainReader`] backed by one HTTP provider per chain
pub struct EvmChainReader {
    providers: HashMap<u64, RootProvider<Http<Client>>>,
}

impl EvmChainReader {
    /// Build a reader from `(chain_id, rpc_url)` pairs
    pub fn new<'a>(
        rpc_urls: impl IntoIterator<Item = (u64, &'a str)>,
    ) -> Result<Self, ChainError> {
        let mut providers = HashMap::new();
        for (chain_id, rpc_url) in rpc_urls {
            let url: Url = rpc_url
                .parse()
                .map_err(|e| ChainError::Transport(format!("Invalid RPC URL: {}", e)))?;
            providers.insert(chain_id, ProviderBuilder::new().on_http(url));
            info!(rpc_url = %rpc_url, chain_id = chain_id, "Created read-only EVM client");
        }
        Ok(Self { providers })
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.providers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn provider(&self, chain_id: u64) -> Result<&RootProvider<Http<Client>>, ChainError> {
        self.providers
            .get(&chain_id)
            .ok_or(ChainError::UnknownChain(chain_id))
    }
}

#[async_trait]
impl ChainReader for EvmChainReader {
    async fn message_status(
        &self,
        chain_id: u64,
        bridge: Address,
        msg_hash: B256,
    ) -> Result<MessageStatus, ChainError> {
        let contract = Bridge::new(bridge, self.provider(chain_id)?);
        let result = contract.messageStatus(msg_hash).call().await?;
        MessageStatus::from_u8(result.status)
            .ok_or_else(|| ChainError::Other(format!("unknown message status {}", result.status)))
    }

    async fn invocation_delays(
        &self,
        chain_id: u64,
        bridge: Address,
    ) -> Result<InvocationDelays, ChainError> {
        let contract = Bridge::new(bridge, self.provider(chain_id)?);
        let result = contract.getInvocationDelays().call().await?;
        Ok(InvocationDelays {
            preferred: result.preferredDelay.saturating_to(),
            fallback: result.fallbackDelay.saturating_to(),
        })
    }

    async fn proof_receipt(
        &self,
        chain_id: u64,
        bridge: Address,
        msg_hash: B256,
    ) -> Result<ProofReceipt, ChainError> {
        let contract = Bridge::new(bridge, self.provider(chain_id)?);
        let result = contract.proofReceipt(msg_hash).call().await?;
        Ok(ProofReceipt {
            proven_at: result.receivedAt,
            preferred_claimer: result.preferredExecutor,
        })
    }

    async fn synced_chain_data(
        &self,
        chain_id: u64,
        signal_service: Address,
        src_chain_id: u64,
        kind: B256,
        block_id: u64,
    ) -> Result<SyncedChainData, ChainError> {
        let contract = SignalService::new(signal_service, self.provider(chain_id)?);
        let result = contract
            .getSyncedChainData(src_chain_id, kind, block_id)
            .call()
            .await?;
        Ok(SyncedChainData {
            block_id: result.syncedBlockId,
            chain_data: result.chainData,
        })
    }

    async fn latest_block_timestamp(&self, chain_id: u64) -> Result<u64, ChainError> {
        let block = self
            .provider(chain_id)?
            .get_block_by_number(BlockNumberOrTag::Latest, BlockTransactionsKind::Hashes)
            .await?
            .ok_or_else(|| ChainError::Other(format!("no latest block on chain {}", chain_id)))?;
        Ok(block.header.timestamp)
    }

    async fn transaction_receipt(
        &self,
        chain_id: u64,
        hash: TxHash,
    ) -> Result<Option<TxReceipt>, ChainError> {
        let receipt = self
            .provider(chain_id)?
            .get_transaction_receipt(hash)
            .await?;
        Ok(receipt.and_then(|r| {
            r.block_number.map(|block_number| TxReceipt {
                transaction_hash: r.transaction_hash,
                block_number,
                status: r.status(),
            })
        }))
    }

    async fn is_contract(&self, chain_id: u64, address: Address) -> Result<bool, ChainError> {
        let code = self.provider(chain_id)?.get_code_at(address).await?;
        Ok(!code.is_empty())
    }

    async fn is_paused(&self, chain_id: u64, bridge: Address) -> Result<bool, ChainError> {
        let contract = Bridge::new(bridge, self.provider(chain_id)?);
        Ok(contract.paused().call().await?.isPaused)
    }

    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256, ChainError> {
        Ok(self.provider(chain_id)?.get_balance(owner).await?)
    }

    async fn erc20_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
    ) -> Result<U256, ChainError> {
        let contract = IERC20::new(token, self.provider(chain_id)?);
        Ok(contract.balanceOf(owner).call().await?.balance)
    }

    async fn erc20_allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        let contract = IERC20::new(token, self.provider(chain_id)?);
        Ok(contract.allowance(owner, spender).call().await?.remaining)
    }

    async fn erc721_get_approved(
        &self,
        chain_id: u64,
        token: Address,
        token_id: U256,
    ) -> Result<Address, ChainError> {
        let contract = IERC721::new(token, self.provider(chain_id)?);
        Ok(contract.getApproved(token_id).call().await?.operator)
    }

    async fn erc1155_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        token_id: U256,
    ) -> Result<U256, ChainError> {
        let contract = IERC1155::new(token, self.provider(chain_id)?);
        Ok(contract.balanceOf(owner, token_id).call().await?.balance)
    }

    async fn erc1155_is_approved_for_all(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool, ChainError> {
        let contract = IERC1155::new(token, self.provider(chain_id)?);
        Ok(contract
            .isApprovedForAll(owner, operator)
            .call()
            .await?
            .approved)
    }

    async fn bridged_to_canonical(
        &self,
        chain_id: u64,
        vault: Address,
        asset: TokenType,
        token: Address,
    ) -> Result<Option<CanonicalToken>, ChainError> {
        let provider = self.provider(chain_id)?;
        let (canonical_chain, canonical_address) = match asset {
            TokenType::Erc20 => {
                let r = ERC20Vault::new(vault, provider)
                    .bridgedToCanonical(token)
                    .call()
                    .await?;
                (r.chainId, r.addr)
            }
            TokenType::Erc721 => {
                let r = ERC721Vault::new(vault, provider)
                    .bridgedToCanonical(token)
                    .call()
                    .await?;
                (r.chainId, r.addr)
            }
            TokenType::Erc1155 => {
                let r = ERC1155Vault::new(vault, provider)
                    .bridgedToCanonical(token)
                    .call()
                    .await?;
                (r.chainId, r.addr)
            }
            TokenType::Eth => return Ok(None),
        };

        if canonical_address == Address::ZERO {
            return Ok(None);
        }
        Ok(Some(CanonicalToken {
            chain_id: canonical_chain,
            address: canonical_address,
        }))
    }

    async fn canonical_to_bridged(
        &self,
        chain_id: u64,
        vault: Address,
        asset: TokenType,
        canonical: CanonicalToken,
    ) -> Result<Option<Address>, ChainError> {
        let provider = self.provider(chain_id)?;
        let canonical_chain = U256::from(canonical.chain_id);
        let bridged = match asset {
            TokenType::Erc20 => {
                ERC20Vault::new(vault, provider)
                    .canonicalToBridged(canonical_chain, canonical.address)
                    .call()
                    .await?
                    .btoken
            }
            TokenType::Erc721 => {
                ERC721Vault::new(vault, provider)
                    .canonicalToBridged(canonical_chain, canonical.address)
                    .call()
                    .await?
                    .btoken
            }
            TokenType::Erc1155 => {
                ERC1155Vault::new(vault, provider)
                    .canonicalToBridged(canonical_chain, canonical.address)
                    .call()
                    .await?
                    .btoken
            }
            TokenType::Eth => return Ok(None),
        };

        Ok((bridged != Address::ZERO).then_some(bridged))
    }
}

// ============================================================================
// Alloy Wallet
// ============================================================================

/// [`Wallet`] signing with a local private key over HTTP
pub struct EvmWallet {
    rpc_url: Url,
    signer: PrivateKeySigner,
}

impl EvmWallet {
    pub fn new(rpc_url: &str, private_key: &str) -> Result<Self, ChainError> {
        let rpc_url: Url = rpc_url
            .parse()
            .map_err(|e| ChainError::Transport(format!("Invalid RPC URL: {}", e)))?;
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| ChainError::Other(format!("Invalid private key: {}", e)))?;

        info!(
            address = %signer.address(),
            rpc_url = %rpc_url,
            "EVM wallet initialized"
        );

        Ok(Self { rpc_url, signer })
    }
}

#[async_trait]
impl Wallet for EvmWallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        Ok(provider.get_chain_id().await?)
    }

    async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let tx = call.to_request(self.address());
        Ok(provider.estimate_gas(&tx).await?)
    }

    async fn send(&self, call: ContractCall) -> Result<TxHash, ChainError> {
        // Recommended fillers populate nonce, gas and fees
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.clone());

        let tx = call.to_request(self.address());

        if !call.skip_simulation {
            provider.call(&tx).await?;
            debug!(to = %call.to, "Simulation succeeded");
        }

        let pending = provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();

        info!(tx_hash = %tx_hash, to = %call.to, "Transaction sent");

        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_call_builder() {
        let call = ContractCall::new(Address::repeat_byte(1), vec![0xde, 0xad])
            .with_value(U256::from(5u64))
            .with_gas(21_000)
            .skip_simulation(true);

        assert_eq!(call.to, Address::repeat_byte(1));
        assert_eq!(call.input, Bytes::from(vec![0xde, 0xad]));
        assert_eq!(call.value, U256::from(5u64));
        assert_eq!(call.gas, Some(21_000));
        assert!(call.skip_simulation);
    }

    #[test]
    fn test_contract_call_request() {
        let from = Address::repeat_byte(9);
        let call = ContractCall::new(Address::repeat_byte(1), vec![0x01]).with_gas(50_000);
        let tx = call.to_request(from);
        assert_eq!(tx.from, Some(from));
        assert_eq!(tx.gas, Some(50_000));
        assert_eq!(tx.value, Some(U256::ZERO));
    }

    #[test]
    fn test_reader_rejects_bad_url() {
        let result = EvmChainReader::new([(1u64, "not a url")]);
        assert!(matches!(result, Err(ChainError::Transport(_))));
    }

    #[tokio::test]
    async fn test_reader_unknown_chain() {
        let reader = EvmChainReader::new([(1u64, "http://localhost:8545")]).unwrap();
        assert_eq!(reader.chain_ids(), vec![1]);
        let err = reader.latest_block_timestamp(7).await.unwrap_err();
        assert_eq!(err, ChainError::UnknownChain(7));
    }

    #[test]
    fn test_wallet_address_from_key() {
        // Anvil account #0
        let wallet = EvmWallet::new(
            "http://localhost:8545",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        assert_eq!(
            wallet.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }
}
