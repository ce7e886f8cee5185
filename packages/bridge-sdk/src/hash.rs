//! Hash computation for bridge messages and signals
//!
//! These functions match the bridge and signal service contracts so a client
//! can derive `msgHash` and the signal slots a proof provider has to prove.
//!
//! ```solidity
//! msgHash   = keccak256(abi.encode("TAIKO_MESSAGE", message))
//! slot      = keccak256(abi.encodePacked("SIGNAL", uint64 chainId, address app, bytes32 signal))
//! failed    = msgHash ^ bytes32(uint256(Status.FAILED))
//! ```

use alloy::primitives::{Address, B256};
use alloy::sol_types::SolValue;
use tiny_keccak::{Hasher, Keccak};

use crate::evm::contracts;
use crate::types::Message;

/// Domain separator prefixed to every message before hashing
pub const MESSAGE_DOMAIN: &str = "TAIKO_MESSAGE";

/// Prefix of the packed signal slot preimage
pub const SIGNAL_DOMAIN: &[u8] = b"SIGNAL";

/// On-chain encoding of `Status.FAILED`
const FAILED_STATUS: u8 = 3;

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Key under which signal services store synced state roots
pub fn state_root_key() -> B256 {
    B256::from(keccak256(b"STATE_ROOT"))
}

/// Derive the message hash used as the cross-chain correlation key
pub fn hash_message(message: &Message) -> B256 {
    let encoded =
        (MESSAGE_DOMAIN.to_string(), contracts::Message::from(message)).abi_encode_params();
    B256::from(keccak256(&encoded))
}

/// Storage slot of a signal sent by `app` on `chain_id`
pub fn signal_slot(chain_id: u64, app: Address, signal: B256) -> B256 {
    // abi.encodePacked layout: 6 + 8 + 20 + 32 = 66 bytes
    let mut data = [0u8; 66];
    data[0..6].copy_from_slice(SIGNAL_DOMAIN);
    data[6..14].copy_from_slice(&chain_id.to_be_bytes());
    data[14..34].copy_from_slice(app.as_slice());
    data[34..66].copy_from_slice(signal.as_slice());
    B256::from(keccak256(&data))
}

/// Signal the destination bridge sends once a message is marked FAILED,
/// proven on the source chain to recall the message
pub fn signal_for_failed_message(msg_hash: B256) -> B256 {
    let mut signal = msg_hash;
    signal.0[31] ^= FAILED_STATUS;
    signal
}

/// Format a 32-byte hash as 0x-prefixed hex
pub fn b256_to_hex(value: &B256) -> String {
    format!("0x{}", hex::encode(value.as_slice()))
}

/// Parse a 0x-prefixed (or bare) 32-byte hex hash
pub fn parse_b256(value: &str) -> Result<B256, String> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(stripped).map_err(|e| format!("invalid hex: {}", e))?;
    if bytes.len() != 32 {
        return Err(format!("expected 32 bytes, got {}", bytes.len()));
    }
    Ok(B256::from_slice(&bytes))
}
