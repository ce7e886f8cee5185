//! EVM Chain Support Module
//!
//! This module provides EVM-specific functionality for interacting with the
//! bridge, signal service and vault contracts on EVM-compatible chains.
//!
//! ## Submodules
//!
//! - `client` - Chain reader and wallet traits plus their alloy implementations
//! - `contracts` - Contract bindings using alloy sol! macro

pub mod client;
pub mod contracts;

// Re-export commonly used items
pub use client::{CanonicalToken, ChainReader, ContractCall, EvmChainReader, EvmWallet, Wallet};
pub use contracts::{Bridge, SignalService};
