//! Testing Utilities Module
//!
//! In-memory collaborators for exercising the bridge protocol, the
//! processability oracle and the poller without a node.
//!
//! ## Submodules
//!
//! - `mock_chain` - Scriptable [`ChainReader`](crate::evm::ChainReader) with call counters
//! - `mock_wallet` - Recording [`Wallet`](crate::evm::Wallet)
//! - `mock_prover` - Canned proofs and a static token resolver
//! - `fixtures` - Sample routes, messages and bridge transactions

pub mod fixtures;
pub mod mock_chain;
pub mod mock_prover;
pub mod mock_wallet;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_chain::MockChain;
pub use mock_prover::{MockProver, StaticTokenResolver};
pub use mock_wallet::MockWallet;

use std::sync::{Mutex, MutexGuard};

/// Lock a mock's state, recovering from a panicked test thread
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
