//! Processability oracle
//!
//! Answers "can a claim, retry or release be taken right now" for a stored
//! [`BridgeTransaction`]. Read failures answer `false`.

use tracing::{debug, warn};

use crate::error::Result;
use crate::evm::ChainReader;
use crate::hash::state_root_key;
use crate::routing::RoutingMap;
use crate::types::{BridgeTransaction, MessageStatus};

/// Whether an action can be taken on `bridge_tx` now
///
/// NEW (or unknown) messages are processable once the destination signal
/// service has synced the source chain up to the send's block.
pub async fn is_transaction_processable(
    reader: &dyn ChainReader,
    routing: &RoutingMap,
    bridge_tx: &BridgeTransaction,
) -> bool {
    let (Some(receipt), Some(message)) = (&bridge_tx.receipt, &bridge_tx.message) else {
        return false;
    };

    match bridge_tx.msg_status {
        Some(MessageStatus::Retriable | MessageStatus::Failed) => return true,
        Some(MessageStatus::Done | MessageStatus::Recalled) => return false,
        _ => {}
    }

    match latest_synced_block(reader, routing, message.src_chain_id, message.dest_chain_id).await {
        Ok(synced) => {
            debug!(
                tx_hash = %bridge_tx.hash,
                synced_block = synced,
                send_block = receipt.block_number,
                "Checked state root sync"
            );
            synced >= receipt.block_number
        }
        Err(e) => {
            warn!(tx_hash = %bridge_tx.hash, error = %e, "Failed to read synced chain data");
            false
        }
    }
}

/// Latest source block whose state root the destination chain has synced
pub async fn latest_synced_block(
    reader: &dyn ChainReader,
    routing: &RoutingMap,
    src_chain_id: u64,
    dest_chain_id: u64,
) -> Result<u64> {
    let signal_service = routing
        .get(dest_chain_id, src_chain_id)?
        .signal_service_address;

    let data = reader
        .synced_chain_data(dest_chain_id, signal_service, src_chain_id, state_root_key(), 0)
        .await?;
    Ok(data.block_id)
}
