//! Scriptable in-memory chain reader

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy::primitives::{Address, TxHash, B256, U256};
use async_trait::async_trait;

use crate::error::ChainError;
use crate::evm::{CanonicalToken, ChainReader};
use crate::types::{
    InvocationDelays, MessageStatus, ProofReceipt, SyncedChainData, TokenType, TxReceipt,
};

use super::fixtures::{bridge_on, contracts_on};
use super::lock;

#[derive(Default)]
struct MockChainState {
    statuses: HashMap<(u64, Address, B256), MessageStatus>,
    delays: HashMap<(u64, Address), InvocationDelays>,
    proof_receipts: HashMap<(u64, Address, B256), ProofReceipt>,
    synced_blocks: HashMap<(u64, Address, u64), u64>,
    timestamps: HashMap<u64, u64>,
    receipts: HashMap<(u64, TxHash), TxReceipt>,
    contracts: HashSet<(u64, Address)>,
    paused: HashSet<(u64, Address)>,
    native_balances: HashMap<(u64, Address), U256>,
    erc20_balances: HashMap<(u64, Address, Address), U256>,
    allowances: HashMap<(u64, Address, Address, Address), U256>,
    erc721_approved: HashMap<(u64, Address, U256), Address>,
    erc1155_balances: HashMap<(u64, Address, Address, U256), U256>,
    erc1155_approvals: HashSet<(u64, Address, Address, Address)>,
    canonical: HashMap<(u64, Address), CanonicalToken>,
    bridged: HashMap<(u64, CanonicalTokenKey), Address>,
    failures: HashMap<&'static str, ChainError>,
    calls: HashMap<&'static str, usize>,
    reads: Vec<(&'static str, u64, Address)>,
}

type CanonicalTokenKey = (u64, Address);

/// [`ChainReader`] over in-memory state
///
/// Bridge and signal-service state is keyed by contract address. The short
/// setters target the contracts of [`sample_routing`](super::sample_routing)
/// on that chain; the `_at` setters take the address explicitly. Reads
/// against any other contract see unset state.
///
/// Unset message statuses read as `New`, unset numbers as zero. Any method can
/// be made to fail with [`MockChain::fail`], keyed by the trait method name.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<MockChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    pub fn set_status(&self, chain_id: u64, msg_hash: B256, status: MessageStatus) {
        self.set_status_at(chain_id, bridge_on(chain_id), msg_hash, status);
    }

    pub fn set_status_at(
        &self,
        chain_id: u64,
        bridge: Address,
        msg_hash: B256,
        status: MessageStatus,
    ) {
        lock(&self.state)
            .statuses
            .insert((chain_id, bridge, msg_hash), status);
    }

    pub fn set_delays(&self, chain_id: u64, delays: InvocationDelays) {
        lock(&self.state)
            .delays
            .insert((chain_id, bridge_on(chain_id)), delays);
    }

    pub fn set_proof_receipt(&self, chain_id: u64, msg_hash: B256, receipt: ProofReceipt) {
        lock(&self.state)
            .proof_receipts
            .insert((chain_id, bridge_on(chain_id), msg_hash), receipt);
    }

    /// Latest block of `src_chain_id` synced into `chain_id`'s signal service
    pub fn set_synced_block(&self, chain_id: u64, src_chain_id: u64, block_id: u64) {
        let signal_service = contracts_on(chain_id).signal_service_address;
        lock(&self.state)
            .synced_blocks
            .insert((chain_id, signal_service, src_chain_id), block_id);
    }

    pub fn set_timestamp(&self, chain_id: u64, timestamp: u64) {
        lock(&self.state).timestamps.insert(chain_id, timestamp);
    }

    pub fn set_receipt(&self, chain_id: u64, receipt: TxReceipt) {
        lock(&self.state)
            .receipts
            .insert((chain_id, receipt.transaction_hash), receipt);
    }

    pub fn set_contract(&self, chain_id: u64, address: Address) {
        lock(&self.state).contracts.insert((chain_id, address));
    }

    pub fn set_paused(&self, chain_id: u64, paused: bool) {
        let key = (chain_id, bridge_on(chain_id));
        let mut state = lock(&self.state);
        if paused {
            state.paused.insert(key);
        } else {
            state.paused.remove(&key);
        }
    }

    pub fn set_native_balance(&self, chain_id: u64, owner: Address, balance: U256) {
        lock(&self.state)
            .native_balances
            .insert((chain_id, owner), balance);
    }

    pub fn set_erc20_balance(&self, chain_id: u64, token: Address, owner: Address, balance: U256) {
        lock(&self.state)
            .erc20_balances
            .insert((chain_id, token, owner), balance);
    }

    pub fn set_allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) {
        lock(&self.state)
            .allowances
            .insert((chain_id, token, owner, spender), amount);
    }

    pub fn set_erc721_approved(
        &self,
        chain_id: u64,
        token: Address,
        token_id: U256,
        operator: Address,
    ) {
        lock(&self.state)
            .erc721_approved
            .insert((chain_id, token, token_id), operator);
    }

    pub fn set_erc1155_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        token_id: U256,
        balance: U256,
    ) {
        lock(&self.state)
            .erc1155_balances
            .insert((chain_id, token, owner, token_id), balance);
    }

    pub fn set_erc1155_approved_for_all(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        operator: Address,
    ) {
        lock(&self.state)
            .erc1155_approvals
            .insert((chain_id, token, owner, operator));
    }

    /// Mark `token` on `chain_id` as a bridged copy of `canonical`
    pub fn set_canonical(&self, chain_id: u64, token: Address, canonical: CanonicalToken) {
        lock(&self.state)
            .canonical
            .insert((chain_id, token), canonical);
    }

    /// Mark `canonical` as already deployed on `chain_id` at `bridged`
    pub fn set_bridged(&self, chain_id: u64, canonical: CanonicalToken, bridged: Address) {
        lock(&self.state)
            .bridged
            .insert((chain_id, (canonical.chain_id, canonical.address)), bridged);
    }

    /// Make every call to `method` fail with `error`
    pub fn fail(&self, method: &'static str, error: ChainError) {
        lock(&self.state).failures.insert(method, error);
    }

    pub fn clear_failure(&self, method: &'static str) {
        lock(&self.state).failures.remove(method);
    }

    /// Number of times `method` has been called
    pub fn calls(&self, method: &'static str) -> usize {
        lock(&self.state).calls.get(method).copied().unwrap_or(0)
    }

    /// `(chain_id, contract)` of every bridge or signal-service read of `method`
    pub fn reads(&self, method: &'static str) -> Vec<(u64, Address)> {
        lock(&self.state)
            .reads
            .iter()
            .filter(|(m, _, _)| *m == method)
            .map(|(_, chain_id, contract)| (*chain_id, *contract))
            .collect()
    }

    fn record_read(
        &self,
        method: &'static str,
        chain_id: u64,
        contract: Address,
    ) -> Result<(), ChainError> {
        lock(&self.state).reads.push((method, chain_id, contract));
        self.record(method)
    }

    fn record(&self, method: &'static str) -> Result<(), ChainError> {
        let mut state = lock(&self.state);
        *state.calls.entry(method).or_insert(0) += 1;
        match state.failures.get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn message_status(
        &self,
        chain_id: u64,
        bridge: Address,
        msg_hash: B256,
    ) -> Result<MessageStatus, ChainError> {
        self.record_read("message_status", chain_id, bridge)?;
        Ok(lock(&self.state)
            .statuses
            .get(&(chain_id, bridge, msg_hash))
            .copied()
            .unwrap_or(MessageStatus::New))
    }

    async fn invocation_delays(
        &self,
        chain_id: u64,
        bridge: Address,
    ) -> Result<InvocationDelays, ChainError> {
        self.record_read("invocation_delays", chain_id, bridge)?;
        Ok(lock(&self.state)
            .delays
            .get(&(chain_id, bridge))
            .copied()
            .unwrap_or_default())
    }

    async fn proof_receipt(
        &self,
        chain_id: u64,
        bridge: Address,
        msg_hash: B256,
    ) -> Result<ProofReceipt, ChainError> {
        self.record_read("proof_receipt", chain_id, bridge)?;
        Ok(lock(&self.state)
            .proof_receipts
            .get(&(chain_id, bridge, msg_hash))
            .copied()
            .unwrap_or_default())
    }

    async fn synced_chain_data(
        &self,
        chain_id: u64,
        signal_service: Address,
        src_chain_id: u64,
        _kind: B256,
        _block_id: u64,
    ) -> Result<SyncedChainData, ChainError> {
        self.record_read("synced_chain_data", chain_id, signal_service)?;
        let block_id = lock(&self.state)
            .synced_blocks
            .get(&(chain_id, signal_service, src_chain_id))
            .copied()
            .unwrap_or(0);
        Ok(SyncedChainData {
            block_id,
            chain_data: B256::ZERO,
        })
    }

    async fn latest_block_timestamp(&self, chain_id: u64) -> Result<u64, ChainError> {
        self.record("latest_block_timestamp")?;
        Ok(lock(&self.state)
            .timestamps
            .get(&chain_id)
            .copied()
            .unwrap_or(0))
    }

    async fn transaction_receipt(
        &self,
        chain_id: u64,
        hash: TxHash,
    ) -> Result<Option<TxReceipt>, ChainError> {
        self.record("transaction_receipt")?;
        Ok(lock(&self.state).receipts.get(&(chain_id, hash)).copied())
    }

    async fn is_contract(&self, chain_id: u64, address: Address) -> Result<bool, ChainError> {
        self.record("is_contract")?;
        Ok(lock(&self.state).contracts.contains(&(chain_id, address)))
    }

    async fn is_paused(&self, chain_id: u64, bridge: Address) -> Result<bool, ChainError> {
        self.record_read("is_paused", chain_id, bridge)?;
        Ok(lock(&self.state).paused.contains(&(chain_id, bridge)))
    }

    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256, ChainError> {
        self.record("native_balance")?;
        Ok(lock(&self.state)
            .native_balances
            .get(&(chain_id, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn erc20_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
    ) -> Result<U256, ChainError> {
        self.record("erc20_balance")?;
        Ok(lock(&self.state)
            .erc20_balances
            .get(&(chain_id, token, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn erc20_allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        self.record("erc20_allowance")?;
        Ok(lock(&self.state)
            .allowances
            .get(&(chain_id, token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn erc721_get_approved(
        &self,
        chain_id: u64,
        token: Address,
        token_id: U256,
    ) -> Result<Address, ChainError> {
        self.record("erc721_get_approved")?;
        Ok(lock(&self.state)
            .erc721_approved
            .get(&(chain_id, token, token_id))
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn erc1155_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        token_id: U256,
    ) -> Result<U256, ChainError> {
        self.record("erc1155_balance")?;
        Ok(lock(&self.state)
            .erc1155_balances
            .get(&(chain_id, token, owner, token_id))
            .copied()
            .unwrap_or_default())
    }

    async fn erc1155_is_approved_for_all(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool, ChainError> {
        self.record("erc1155_is_approved_for_all")?;
        Ok(lock(&self.state)
            .erc1155_approvals
            .contains(&(chain_id, token, owner, operator)))
    }

    async fn bridged_to_canonical(
        &self,
        chain_id: u64,
        _vault: Address,
        _asset: TokenType,
        token: Address,
    ) -> Result<Option<CanonicalToken>, ChainError> {
        self.record("bridged_to_canonical")?;
        Ok(lock(&self.state).canonical.get(&(chain_id, token)).copied())
    }

    async fn canonical_to_bridged(
        &self,
        chain_id: u64,
        _vault: Address,
        _asset: TokenType,
        canonical: CanonicalToken,
    ) -> Result<Option<Address>, ChainError> {
        self.record("canonical_to_bridged")?;
        Ok(lock(&self.state)
            .bridged
            .get(&(chain_id, (canonical.chain_id, canonical.address)))
            .copied())
    }
}
