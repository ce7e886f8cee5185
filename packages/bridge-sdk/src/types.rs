//! Common types for the bridge message lifecycle
//!
//! This module provides the shared vocabulary of the bridge protocol, the
//! processability oracle and the status poller.

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BridgeError, Result};

// ============================================================================
// Message Status
// ============================================================================

/// Lifecycle status of a bridge message
///
/// `New`, `Retriable`, `Done` and `Failed` are read from the destination bridge.
/// `Recalled` is only ever observed on the source bridge after a release.
/// `Proven` is a client-side annotation layered over `New` once a proof receipt
/// exists and has no on-chain encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    New,
    Retriable,
    Done,
    Failed,
    Recalled,
    Proven,
}

impl MessageStatus {
    /// Every status, on-chain and client-side
    pub const ALL: [MessageStatus; 6] = [
        MessageStatus::New,
        MessageStatus::Retriable,
        MessageStatus::Done,
        MessageStatus::Failed,
        MessageStatus::Recalled,
        MessageStatus::Proven,
    ];

    /// Decode the bridge contract's `Status` enum value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MessageStatus::New),
            1 => Some(MessageStatus::Retriable),
            2 => Some(MessageStatus::Done),
            3 => Some(MessageStatus::Failed),
            4 => Some(MessageStatus::Recalled),
            _ => None,
        }
    }

    /// Encode as the bridge contract's `Status` enum value (None for `Proven`)
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            MessageStatus::New => Some(0),
            MessageStatus::Retriable => Some(1),
            MessageStatus::Done => Some(2),
            MessageStatus::Failed => Some(3),
            MessageStatus::Recalled => Some(4),
            MessageStatus::Proven => None,
        }
    }

    /// `Done` and `Recalled` admit no further action
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Done | MessageStatus::Recalled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::New => "NEW",
            MessageStatus::Retriable => "RETRIABLE",
            MessageStatus::Done => "DONE",
            MessageStatus::Failed => "FAILED",
            MessageStatus::Recalled => "RECALLED",
            MessageStatus::Proven => "PROVEN",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<u8> for MessageStatus {
    type Error = BridgeError;

    fn try_from(value: u8) -> Result<Self> {
        MessageStatus::from_u8(value).ok_or(BridgeError::UnknownStatus(value))
    }
}

// ============================================================================
// Token Type
// ============================================================================

/// Asset class carried by a bridge message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    Eth,
    Erc20,
    Erc721,
    Erc1155,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Eth => "ETH",
            TokenType::Erc20 => "ERC20",
            TokenType::Erc721 => "ERC721",
            TokenType::Erc1155 => "ERC1155",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Message
// ============================================================================

/// The canonical cross-chain instruction
///
/// Mirrors the bridge contract's `Message` struct. `id` is assigned by the
/// contract and stays zero on the client until then.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: u128,
    /// The address, EOA or contract, that interacted with the bridge
    pub from: Address,
    pub src_chain_id: u64,
    pub dest_chain_id: u64,
    /// Owner of the message on the source chain, the only party that may
    /// initiate processing from this client
    pub src_owner: Address,
    /// Owner of the message on the destination chain
    pub dest_owner: Address,
    pub to: Address,
    pub refund_to: Address,
    /// Amount delivered on the destination chain
    pub value: U256,
    /// Relayer fee, zero when the owner claims
    pub fee: U256,
    /// Execution budget on the destination chain; zero means the owner must
    /// process the message
    pub gas_limit: u32,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub memo: String,
}

impl Message {
    /// Source and destination chains must differ
    pub fn validate(&self) -> Result<()> {
        if self.src_chain_id == self.dest_chain_id {
            return Err(BridgeError::InvalidMessage(format!(
                "source and destination chain are both {}",
                self.src_chain_id
            )));
        }
        Ok(())
    }

    /// Whether a relayer (not the owner) is expected to execute the message
    pub fn has_relayer_fee(&self) -> bool {
        !self.fee.is_zero()
    }
}

// ============================================================================
// Contract Readouts
// ============================================================================

/// `[provenAt, preferredClaimer]` as recorded by the destination bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofReceipt {
    pub proven_at: u64,
    pub preferred_claimer: Address,
}

impl ProofReceipt {
    /// A zero claimer means the message has not been proven yet
    pub fn is_proven(&self) -> bool {
        self.preferred_claimer != Address::ZERO
    }
}

/// `[preferredDelay, fallbackDelay]` in seconds, from the destination bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvocationDelays {
    pub preferred: u64,
    pub fallback: u64,
}

/// Seconds remaining before each claimer class may process a message.
/// Negative values mean the window has already elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInvocationDelay {
    pub preferred_delay: i64,
    pub not_preferred_delay: i64,
}

/// Data the destination signal service holds about a synced source chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncedChainData {
    pub block_id: u64,
    pub chain_data: B256,
}

/// The subset of a transaction receipt the lifecycle needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub status: bool,
}

// ============================================================================
// Bridge Transaction
// ============================================================================

/// Client-side record correlating a source-chain send with its
/// destination-chain fate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeTransaction {
    /// Source-chain transaction hash
    pub hash: TxHash,
    pub from: Address,
    pub amount: U256,
    pub symbol: String,
    pub decimals: u8,
    pub src_chain_id: u64,
    pub dest_chain_id: u64,
    pub token_type: TokenType,
    /// Cross-chain correlation key, see [`crate::hash::hash_message`]
    #[serde(default)]
    pub msg_hash: Option<B256>,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub msg_status: Option<MessageStatus>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub receipt: Option<TxReceipt>,
    /// Used for sorting local records
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl BridgeTransaction {
    /// The message together with its hash; both are needed for any action
    pub fn message_and_hash(&self) -> Result<(&Message, B256)> {
        match (&self.message, self.msg_hash) {
            (Some(message), Some(msg_hash)) => Ok((message, msg_hash)),
            _ => Err(BridgeError::MissingMessage),
        }
    }

    /// Source block of the original send, preferring the stored block number
    pub fn send_block_number(&self) -> Option<u64> {
        self.block_number
            .or_else(|| self.receipt.as_ref().map(|r| r.block_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_status_contract_encoding() {
        for value in 0u8..=4 {
            let status = MessageStatus::from_u8(value).unwrap();
            assert_eq!(status.as_u8(), Some(value));
        }
        assert_eq!(MessageStatus::from_u8(5), None);
        assert_eq!(MessageStatus::Proven.as_u8(), None);
    }

    #[test]
    fn test_message_status_try_from_unknown() {
        let err = MessageStatus::try_from(9u8).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownStatus(9)));
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = MessageStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![&MessageStatus::Done, &MessageStatus::Recalled]);
    }

    #[test]
    fn test_message_rejects_same_chain() {
        let message = Message {
            src_chain_id: 7,
            dest_chain_id: 7,
            ..Default::default()
        };
        assert!(message.validate().is_err());

        let message = Message {
            src_chain_id: 1,
            dest_chain_id: 2,
            ..Default::default()
        };
        assert!(message.validate().is_ok());
    }

    #[test]
    fn test_send_block_number_prefers_stored() {
        let mut tx = BridgeTransaction {
            hash: TxHash::repeat_byte(1),
            from: Address::ZERO,
            amount: U256::ZERO,
            symbol: "ETH".to_string(),
            decimals: 18,
            src_chain_id: 1,
            dest_chain_id: 2,
            token_type: TokenType::Eth,
            msg_hash: None,
            message: None,
            msg_status: None,
            block_number: None,
            receipt: Some(TxReceipt {
                transaction_hash: TxHash::repeat_byte(1),
                block_number: 90,
                status: true,
            }),
            timestamp: None,
        };
        assert_eq!(tx.send_block_number(), Some(90));

        tx.block_number = Some(100);
        assert_eq!(tx.send_block_number(), Some(100));

        tx.block_number = None;
        tx.receipt = None;
        assert_eq!(tx.send_block_number(), None);
    }

    #[test]
    fn test_bridge_transaction_json_shape() {
        let json = r#"{
            "hash": "0x0101010101010101010101010101010101010101010101010101010101010101",
            "from": "0x0000000000000000000000000000000000000001",
            "amount": "0x64",
            "symbol": "USDC",
            "decimals": 6,
            "srcChainId": 1,
            "destChainId": 2,
            "tokenType": "ERC20",
            "msgStatus": "RETRIABLE",
            "blockNumber": 42
        }"#;
        let tx: BridgeTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.token_type, TokenType::Erc20);
        assert_eq!(tx.msg_status, Some(MessageStatus::Retriable));
        assert_eq!(tx.amount, U256::from(100u64));
        assert!(tx.message_and_hash().is_err());
    }
}
