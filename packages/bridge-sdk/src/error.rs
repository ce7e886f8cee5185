//! Error types for the bridge client
//!
//! `ChainError` is the single place where raw RPC and wallet failures are
//! classified. Everything above the chain seam matches on its variants instead
//! of inspecting error strings.

use thiserror::Error;

use crate::types::{MessageStatus, TokenType};

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// EIP-1193 "user rejected request" code
pub const USER_REJECTED_CODE: i64 = 4001;

// ============================================================================
// Chain Errors
// ============================================================================

/// Classified failure of a chain read or write
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("insufficient allowance: {0}")]
    InsufficientAllowance(String),

    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no client configured for chain {0}")]
    UnknownChain(u64),

    #[error("{0}")]
    Other(String),
}

impl ChainError {
    /// Classify a wallet or RPC error message
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("denied transaction signature")
            || lower.contains("user rejected")
            || lower.contains("user denied")
        {
            return ChainError::UserRejected;
        }

        if lower.contains("insufficient funds") || lower.contains("exceeds the balance") {
            return ChainError::InsufficientFunds(message.to_string());
        }

        if lower.contains("insufficient allowance") {
            return ChainError::InsufficientAllowance(message.to_string());
        }

        if lower.contains("revert") {
            return ChainError::Reverted(message.to_string());
        }

        if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection")
            || lower.contains("network")
            || lower.contains("too many requests")
            || lower.contains("503")
            || lower.contains("502")
        {
            return ChainError::Transport(message.to_string());
        }

        ChainError::Other(message.to_string())
    }

    /// Classify a JSON-RPC error response
    pub fn from_rpc(code: i64, message: &str) -> Self {
        if code == USER_REJECTED_CODE {
            return ChainError::UserRejected;
        }
        Self::classify(message)
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, ChainError::Reverted(_))
    }
}

impl From<alloy::transports::TransportError> for ChainError {
    fn from(err: alloy::transports::TransportError) -> Self {
        if let Some(payload) = err.as_error_resp() {
            return ChainError::from_rpc(payload.code, &payload.message);
        }
        ChainError::classify(&err.to_string())
    }
}

impl From<alloy::contract::Error> for ChainError {
    fn from(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(e) => e.into(),
            other => ChainError::classify(&other.to_string()),
        }
    }
}

// ============================================================================
// Proof Errors
// ============================================================================

/// Failure to obtain a proof from the proof provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("proof request failed: {0}")]
    Request(String),

    #[error("invalid proof response: {0}")]
    InvalidResponse(String),

    #[error("{0} is not defined")]
    MissingData(&'static str),
}

// ============================================================================
// Bridge Errors
// ============================================================================

/// Errors surfaced by the bridge protocol, processability oracle and poller
#[derive(Error, Debug)]
pub enum BridgeError {
    // Precondition violations, raised before any write
    #[error("wrong owner: {0}")]
    WrongOwner(String),

    #[error("wrong chain: expected {expected}, wallet is connected to {actual}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("message status error: {0}")]
    MessageStatus(String),

    // Missing data
    #[error("message is not defined")]
    MissingMessage,

    #[error("wallet is not connected")]
    WalletNotConnected,

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("unknown message status {0}")]
    UnknownStatus(u8),

    // User interaction
    #[error("user rejected the request")]
    UserRejected,

    // Chain state
    #[error("insufficient allowance")]
    InsufficientAllowance,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("not approved: {0}")]
    NotApproved(String),

    #[error("bridge is paused")]
    BridgePaused,

    #[error("no allowance required")]
    NoAllowanceRequired,

    #[error("no approval required")]
    NoApprovalRequired,

    #[error("no canonical info for token {0}")]
    NoCanonicalInfo(String),

    #[error("no invocation delays configured for bridge {src} -> {dest}")]
    NoDelaysForBridge { src: u64, dest: u64 },

    // Transport and contract reverts, cause preserved
    #[error("process message error: {reason}")]
    ProcessMessage {
        reason: String,
        #[source]
        cause: Option<ChainError>,
    },

    #[error("retry error")]
    Retry(#[source] ChainError),

    #[error("release error")]
    Release(#[source] ChainError),

    #[error("send {asset} error")]
    Send {
        asset: TokenType,
        #[source]
        cause: ChainError,
    },

    #[error("approve error")]
    Approve(#[source] ChainError),

    #[error("failed to estimate gas")]
    EstimateGas(#[source] ChainError),

    // Polling
    #[error("polling error: {0}")]
    Polling(String),

    // Configuration and scope
    #[error("no route configured from chain {src} to chain {dest}")]
    RouteNotConfigured { src: u64, dest: u64 },

    #[error("invalid routing config: {0}")]
    InvalidRouting(String),

    #[error("unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl BridgeError {
    /// Message status not valid for the requested action
    pub fn status(status: MessageStatus, reason: &str) -> Self {
        BridgeError::MessageStatus(format!("{} (status {})", reason, status))
    }

    pub fn process(reason: impl Into<String>) -> Self {
        BridgeError::ProcessMessage {
            reason: reason.into(),
            cause: None,
        }
    }

    /// Wrap a failed write, surfacing user rejection as its own kind
    pub fn from_write(cause: ChainError, wrap: impl FnOnce(ChainError) -> BridgeError) -> Self {
        match cause {
            ChainError::UserRejected => BridgeError::UserRejected,
            other => wrap(other),
        }
    }

    /// Raised before any transaction is submitted
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BridgeError::WrongOwner(_)
                | BridgeError::WrongChain { .. }
                | BridgeError::MessageStatus(_)
        )
    }
}
