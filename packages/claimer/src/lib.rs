//! Bridge claimer - Library interface
//!
//! Re-exports internal modules for use in integration tests.

pub mod app;
pub mod config;
pub mod prover;
pub mod records;
