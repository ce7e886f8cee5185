//! Bridge SDK: cross-chain message lifecycle client
//!
//! This crate drives bridge messages from send to settlement:
//!
//! - **Types** - `Message`, `MessageStatus`, `BridgeTransaction` and contract readouts
//! - **Hash Computation** - message hashes and signal slots matching contract logic
//! - **Routing** - per chain-pair contract addresses
//! - **EVM Module** - chain reader and wallet seams, alloy clients, contract bindings
//! - **Bridge Module** - claim/retry/release protocol and per-asset send paths
//! - **Processability** - whether an action can be taken on a message now
//! - **Delays** - invocation-delay and proof-receipt readers
//! - **Poller** - per-transaction status polling with broadcast events
//! - **Testing Module** - in-memory chain, wallet and prover
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! bridge-sdk = { path = "../bridge-sdk" }
//! ```
//!
//! ## Feature Flags
//!
//! - `testing` - Enable in-memory collaborators for downstream tests

pub mod bridge;
pub mod cache;
pub mod config;
pub mod delays;
pub mod error;
pub mod evm;
pub mod hash;
pub mod poller;
pub mod processable;
pub mod prover;
pub mod routing;
pub mod tokens;
pub mod types;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used items at the crate root
pub use bridge::{
    Asset, Bridge, BridgeArgs, BridgeContext, BridgeKind, ClaimArgs, Erc1155Bridge, Erc20Bridge,
    Erc721Bridge, EthBridge,
};
pub use config::GasLimitConfig;
pub use delays::InvocationDelayReader;
pub use error::{BridgeError, ChainError, ProofError, Result};
pub use evm::{ChainReader, ContractCall, EvmChainReader, EvmWallet, Wallet};
pub use hash::{hash_message, keccak256, state_root_key};
pub use poller::{PollerConfig, PollerHandle, PollerRegistry, PollingEvent};
pub use processable::is_transaction_processable;
pub use prover::BridgeProver;
pub use routing::{AddressConfig, RoutingMap};
pub use tokens::{TokenInfo, TokenResolver, VaultTokenResolver};
pub use types::{
    BridgeTransaction, InvocationDelays, Message, MessageStatus, ProofReceipt, TokenType,
    TxInvocationDelay, TxReceipt,
};
