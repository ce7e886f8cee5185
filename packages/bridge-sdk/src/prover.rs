//! Proof provider seam
//!
//! The client never inspects proofs. It asks a [`BridgeProver`] for opaque
//! bytes and passes them straight into `processMessage` / `recallMessage`.

use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;

use crate::error::ProofError;
use crate::types::BridgeTransaction;

#[async_trait]
pub trait BridgeProver: Send + Sync {
    /// Proof that `msg_hash` was sent on the source chain, verifiable on the
    /// destination chain
    async fn encoded_signal_proof(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Bytes, ProofError>;

    /// Proof that `msg_hash` failed on the destination chain, verifiable on
    /// the source chain
    async fn generate_proof_to_release(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Bytes, ProofError>;

    async fn get_encoded_signal_proof(
        &self,
        bridge_tx: &BridgeTransaction,
    ) -> Result<Bytes, ProofError> {
        let (src, dest, msg_hash) = proof_inputs(bridge_tx)?;
        self.encoded_signal_proof(msg_hash, src, dest).await
    }

    async fn get_encoded_signal_proof_for_recall(
        &self,
        bridge_tx: &BridgeTransaction,
    ) -> Result<Bytes, ProofError> {
        let (src, dest, msg_hash) = proof_inputs(bridge_tx)?;
        self.generate_proof_to_release(msg_hash, src, dest).await
    }
}

fn proof_inputs(bridge_tx: &BridgeTransaction) -> Result<(u64, u64, B256), ProofError> {
    let message = bridge_tx
        .message
        .as_ref()
        .ok_or(ProofError::MissingData("message"))?;
    let msg_hash = bridge_tx.msg_hash.ok_or(ProofError::MissingData("msgHash"))?;
    if bridge_tx.send_block_number().is_none() {
        return Err(ProofError::MissingData("block number"));
    }
    Ok((message.src_chain_id, message.dest_chain_id, msg_hash))
}
