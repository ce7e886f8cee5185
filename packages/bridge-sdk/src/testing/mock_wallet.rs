//! Recording wallet

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use alloy::primitives::{Address, TxHash, B256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

use crate::error::ChainError;
use crate::evm::{ContractCall, Wallet};

use super::lock;

/// Gas returned by [`MockWallet::estimate_gas`] unless overridden
pub const DEFAULT_GAS_ESTIMATE: u64 = 200_000;

/// [`Wallet`] that records every estimate and submission instead of signing
pub struct MockWallet {
    address: Address,
    chain_id: AtomicU64,
    gas_estimate: Mutex<Result<u64, ChainError>>,
    send_error: Mutex<Option<ChainError>>,
    estimated: Mutex<Vec<ContractCall>>,
    sent: Mutex<Vec<ContractCall>>,
    nonce: AtomicU64,
}

impl MockWallet {
    pub fn new(address: Address, chain_id: u64) -> Self {
        Self {
            address,
            chain_id: AtomicU64::new(chain_id),
            gas_estimate: Mutex::new(Ok(DEFAULT_GAS_ESTIMATE)),
            send_error: Mutex::new(None),
            estimated: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            nonce: AtomicU64::new(0),
        }
    }

    /// Switch the connected chain
    pub fn connect(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    /// Fail every chain id read until [`MockWallet::connect`] is called again
    pub fn disconnect(&self) {
        self.chain_id.store(0, Ordering::SeqCst);
    }

    pub fn set_gas_estimate(&self, estimate: Result<u64, ChainError>) {
        *lock(&self.gas_estimate) = estimate;
    }

    /// Make every submission fail with `error`
    pub fn fail_send(&self, error: ChainError) {
        *lock(&self.send_error) = Some(error);
    }

    pub fn sent(&self) -> Vec<ContractCall> {
        lock(&self.sent).clone()
    }

    pub fn estimated(&self) -> Vec<ContractCall> {
        lock(&self.estimated).clone()
    }

    /// Decode the `index`th submitted call as `C`
    pub fn sent_as<C: SolCall>(&self, index: usize) -> Option<(ContractCall, C)> {
        let call = lock(&self.sent).get(index)?.clone();
        let decoded = C::abi_decode(&call.input, true).ok()?;
        Some((call, decoded))
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        match self.chain_id.load(Ordering::SeqCst) {
            0 => Err(ChainError::Transport("wallet is disconnected".to_string())),
            chain_id => Ok(chain_id),
        }
    }

    async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, ChainError> {
        lock(&self.estimated).push(call.clone());
        lock(&self.gas_estimate).clone()
    }

    async fn send(&self, call: ContractCall) -> Result<TxHash, ChainError> {
        if let Some(err) = lock(&self.send_error).clone() {
            return Err(err);
        }
        lock(&self.sent).push(call);
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        let mut hash = B256::ZERO;
        hash.0[24..].copy_from_slice(&nonce.to_be_bytes());
        Ok(hash)
    }
}
