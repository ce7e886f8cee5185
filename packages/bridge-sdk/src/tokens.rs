//! Token resolution
//!
//! Answers two questions for the send path: is the token canonical on the
//! source chain (so the vault escrows it and needs an approval), and does its
//! bridged counterpart already exist on the destination chain (which decides
//! the gas budget).

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::evm::{CanonicalToken, ChainReader};
use crate::routing::RoutingMap;
use crate::types::TokenType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub canonical: CanonicalToken,
    /// Whether the bridged token already exists on the destination chain
    pub deployed_on_dest: bool,
}

impl TokenInfo {
    /// `token` on `chain_id` is the canonical token, not a bridged one
    pub fn is_canonical(&self, token: Address, chain_id: u64) -> bool {
        self.canonical.chain_id == chain_id && self.canonical.address == token
    }
}

#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn resolve(
        &self,
        token: Address,
        asset: TokenType,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<TokenInfo>;
}

/// Resolves tokens through the vaults' canonical/bridged mappings
pub struct VaultTokenResolver {
    reader: Arc<dyn ChainReader>,
    routing: Arc<RoutingMap>,
}

impl VaultTokenResolver {
    pub fn new(reader: Arc<dyn ChainReader>, routing: Arc<RoutingMap>) -> Self {
        Self { reader, routing }
    }
}

#[async_trait]
impl TokenResolver for VaultTokenResolver {
    async fn resolve(
        &self,
        token: Address,
        asset: TokenType,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<TokenInfo> {
        let src_vault = self
            .routing
            .get(src_chain_id, dest_chain_id)?
            .vault_for(asset);

        let canonical = self
            .reader
            .bridged_to_canonical(src_chain_id, src_vault, asset, token)
            .await?
            .unwrap_or(CanonicalToken {
                chain_id: src_chain_id,
                address: token,
            });
        // A bridged token must name the chain its canonical lives on
        if canonical.chain_id == 0 {
            return Err(BridgeError::NoCanonicalInfo(token.to_string()));
        }

        let deployed_on_dest = if canonical.chain_id == dest_chain_id {
            true
        } else {
            let dest_vault = self
                .routing
                .get(dest_chain_id, src_chain_id)?
                .vault_for(asset);
            self.reader
                .canonical_to_bridged(dest_chain_id, dest_vault, asset, canonical)
                .await?
                .is_some()
        };

        debug!(
            token = %token,
            canonical_chain = canonical.chain_id,
            canonical_address = %canonical.address,
            deployed_on_dest = deployed_on_dest,
            "Resolved token"
        );

        Ok(TokenInfo {
            canonical,
            deployed_on_dest,
        })
    }
}
