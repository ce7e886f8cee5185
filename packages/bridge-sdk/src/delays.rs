//! Invocation-delay and proof-receipt readers
//!
//! After a message is proven on the destination chain, the preferred claimer
//! gets an exclusive window before anyone else may process it. These readers
//! report how much of that window is left.
//!
//! Proof receipts are cached per `msgHash` once a non-zero claimer is
//! recorded; unproven receipts are always re-read. Invocation delays can be
//! cached per chain pair with a TTL, off by default.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::cache::BoundedCache;
use crate::error::{BridgeError, ChainError, Result};
use crate::evm::ChainReader;
use crate::routing::RoutingMap;
use crate::types::{BridgeTransaction, InvocationDelays, ProofReceipt, TxInvocationDelay};

/// Upper bound on cached chain pairs
const DELAY_CACHE_MAX_PAIRS: usize = 256;

pub struct InvocationDelayReader {
    reader: Arc<dyn ChainReader>,
    routing: Arc<RoutingMap>,
    proof_receipts: RwLock<HashMap<B256, ProofReceipt>>,
    delays: Option<Mutex<BoundedCache<(u64, u64), InvocationDelays>>>,
}

impl InvocationDelayReader {
    pub fn new(reader: Arc<dyn ChainReader>, routing: Arc<RoutingMap>) -> Self {
        Self {
            reader,
            routing,
            proof_receipts: RwLock::new(HashMap::new()),
            delays: None,
        }
    }

    /// Cache invocation delays per chain pair for `ttl`; zero disables caching
    pub fn with_delay_cache(mut self, ttl: Duration) -> Self {
        self.delays = (!ttl.is_zero())
            .then(|| Mutex::new(BoundedCache::new(DELAY_CACHE_MAX_PAIRS, ttl)));
        self
    }

    /// `[preferred, fallback]` delays configured on the destination bridge
    pub async fn get_invocation_delays_for_dest_bridge(
        &self,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<InvocationDelays> {
        if let Some(cache) = &self.delays {
            if let Some(delays) = cache.lock().await.get(&(src_chain_id, dest_chain_id)) {
                return Ok(delays);
            }
        }

        let dest_bridge = self
            .routing
            .get(dest_chain_id, src_chain_id)?
            .bridge_address;

        let delays = self
            .reader
            .invocation_delays(dest_chain_id, dest_bridge)
            .await
            .map_err(|e| match e {
                ChainError::Reverted(_) => BridgeError::NoDelaysForBridge {
                    src: src_chain_id,
                    dest: dest_chain_id,
                },
                other => BridgeError::Chain(other),
            })?;

        if let Some(cache) = &self.delays {
            cache
                .lock()
                .await
                .insert((src_chain_id, dest_chain_id), delays);
        }
        Ok(delays)
    }

    /// Proof receipt recorded on the destination bridge for `msg_hash`
    pub async fn get_proof_receipt_for_msg_hash(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<ProofReceipt> {
        if let Some(receipt) = self.proof_receipts.read().await.get(&msg_hash) {
            return Ok(*receipt);
        }

        let dest_bridge = self
            .routing
            .get(dest_chain_id, src_chain_id)?
            .bridge_address;

        let receipt = self
            .reader
            .proof_receipt(dest_chain_id, dest_bridge, msg_hash)
            .await?;

        if receipt.is_proven() {
            debug!(
                msg_hash = %msg_hash,
                proven_at = receipt.proven_at,
                claimer = %receipt.preferred_claimer,
                "Caching proof receipt"
            );
            self.proof_receipts.write().await.insert(msg_hash, receipt);
        }
        Ok(receipt)
    }

    /// Seconds left before the preferred and other claimers may process `bridge_tx`
    ///
    /// Negative values mean the window has already elapsed.
    pub async fn get_invocation_delay_for_tx(
        &self,
        bridge_tx: &BridgeTransaction,
    ) -> Result<TxInvocationDelay> {
        let (message, msg_hash) = bridge_tx.message_and_hash()?;
        let src = message.src_chain_id;
        let dest = message.dest_chain_id;

        let receipt = self.get_proof_receipt_for_msg_hash(msg_hash, src, dest).await?;
        let delays = self.get_invocation_delays_for_dest_bridge(src, dest).await?;
        let now = self.reader.latest_block_timestamp(dest).await?;

        let elapsed = i128::from(now) - i128::from(receipt.proven_at);
        Ok(TxInvocationDelay {
            preferred_delay: remaining(delays.preferred, elapsed),
            not_preferred_delay: remaining(delays.fallback, elapsed),
        })
    }

    /// Drop every cached proof receipt and delay pair
    pub async fn clear(&self) {
        self.proof_receipts.write().await.clear();
        if let Some(cache) = &self.delays {
            cache.lock().await.clear();
        }
    }
}

/// `delay - elapsed`, saturated into `i64`
fn remaining(delay: u64, elapsed: i128) -> i64 {
    let left = i128::from(delay) - elapsed;
    i64::try_from(left).unwrap_or(if left > 0 { i64::MAX } else { i64::MIN })
}
