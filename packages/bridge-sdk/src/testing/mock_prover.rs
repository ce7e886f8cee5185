//! Canned proofs and token resolution

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use crate::error::{ProofError, Result};
use crate::evm::CanonicalToken;
use crate::prover::BridgeProver;
use crate::tokens::{TokenInfo, TokenResolver};
use crate::types::TokenType;

use super::lock;

/// [`BridgeProver`] returning fixed proof bytes and recording each request
#[derive(Default)]
pub struct MockProver {
    signal_requests: Mutex<Vec<(B256, u64, u64)>>,
    recall_requests: Mutex<Vec<(B256, u64, u64)>>,
    failure: Mutex<Option<ProofError>>,
}

impl MockProver {
    pub const SIGNAL_PROOF: Bytes = Bytes::from_static(b"signal-proof");
    pub const RECALL_PROOF: Bytes = Bytes::from_static(b"recall-proof");

    pub fn fail(&self, error: ProofError) {
        *lock(&self.failure) = Some(error);
    }

    pub fn signal_requests(&self) -> Vec<(B256, u64, u64)> {
        lock(&self.signal_requests).clone()
    }

    pub fn recall_requests(&self) -> Vec<(B256, u64, u64)> {
        lock(&self.recall_requests).clone()
    }

    fn check(&self) -> std::result::Result<(), ProofError> {
        match lock(&self.failure).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BridgeProver for MockProver {
    async fn encoded_signal_proof(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> std::result::Result<Bytes, ProofError> {
        self.check()?;
        lock(&self.signal_requests).push((msg_hash, src_chain_id, dest_chain_id));
        Ok(Self::SIGNAL_PROOF)
    }

    async fn generate_proof_to_release(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> std::result::Result<Bytes, ProofError> {
        self.check()?;
        lock(&self.recall_requests).push((msg_hash, src_chain_id, dest_chain_id));
        Ok(Self::RECALL_PROOF)
    }
}

/// [`TokenResolver`] over a fixed table; unknown tokens are canonical on the
/// source chain and already deployed on the destination
#[derive(Default)]
pub struct StaticTokenResolver {
    tokens: Mutex<HashMap<Address, TokenInfo>>,
}

impl StaticTokenResolver {
    pub fn insert(&self, token: Address, info: TokenInfo) {
        lock(&self.tokens).insert(token, info);
    }
}

#[async_trait]
impl TokenResolver for StaticTokenResolver {
    async fn resolve(
        &self,
        token: Address,
        _asset: TokenType,
        src_chain_id: u64,
        _dest_chain_id: u64,
    ) -> Result<TokenInfo> {
        Ok(lock(&self.tokens).get(&token).copied().unwrap_or(TokenInfo {
            canonical: CanonicalToken {
                chain_id: src_chain_id,
                address: token,
            },
            deployed_on_dest: true,
        }))
    }
}
