//! Chain registry
//!
//! Maps a `(chain, counterpart)` pair to the contracts deployed on `chain` that
//! bridge to `counterpart`. The destination bridge of a message is therefore
//! `get(dest, src)` and the source bridge is `get(src, dest)`.
//!
//! Loaded from the `configuredBridges` JSON shape:
//!
//! ```json
//! { "configuredBridges": [
//!     { "source": "1", "destination": "167000",
//!       "addresses": { "bridgeAddress": "0x..", "signalServiceAddress": "0x..", ... } } ] }
//! ```

use std::collections::HashMap;
use std::path::Path;

use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::{BridgeError, Result};
use crate::types::TokenType;

/// Contract addresses deployed on one chain for one counterpart chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressConfig {
    pub bridge_address: Address,
    pub erc20_vault_address: Address,
    pub erc721_vault_address: Address,
    pub erc1155_vault_address: Address,
    pub signal_service_address: Address,
    #[serde(default)]
    pub cross_chain_sync_address: Address,
    #[serde(default)]
    pub ether_vault_address: Option<Address>,
}

impl AddressConfig {
    /// Vault handling `asset`; ETH goes through the bridge itself unless an
    /// ether vault is configured
    pub fn vault_for(&self, asset: TokenType) -> Address {
        match asset {
            TokenType::Eth => self.ether_vault_address.unwrap_or(self.bridge_address),
            TokenType::Erc20 => self.erc20_vault_address,
            TokenType::Erc721 => self.erc721_vault_address,
            TokenType::Erc1155 => self.erc1155_vault_address,
        }
    }
}

/// One entry of the `configuredBridges` list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(deserialize_with = "chain_id_from_str_or_num")]
    pub source: u64,
    #[serde(deserialize_with = "chain_id_from_str_or_num")]
    pub destination: u64,
    pub addresses: AddressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguredBridges {
    pub configured_bridges: Vec<BridgeConfig>,
}

fn chain_id_from_str_or_num<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChainIdRepr {
        Num(u64),
        Str(String),
    }

    match ChainIdRepr::deserialize(deserializer)? {
        ChainIdRepr::Num(n) => Ok(n),
        ChainIdRepr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Process-wide, read-only routing table
#[derive(Debug, Clone, Default)]
pub struct RoutingMap {
    routes: HashMap<(u64, u64), AddressConfig>,
}

impl RoutingMap {
    /// Build from configured bridges, rejecting duplicates and unset bridges
    pub fn from_configured(bridges: ConfiguredBridges) -> Result<Self> {
        let mut routes = HashMap::new();
        for item in bridges.configured_bridges {
            if item.source == item.destination {
                return Err(BridgeError::InvalidRouting(format!(
                    "route {} -> {} points at itself",
                    item.source, item.destination
                )));
            }
            if item.addresses.bridge_address == Address::ZERO {
                return Err(BridgeError::InvalidRouting(format!(
                    "route {} -> {} has a zero bridge address",
                    item.source, item.destination
                )));
            }
            if routes
                .insert((item.source, item.destination), item.addresses)
                .is_some()
            {
                return Err(BridgeError::InvalidRouting(format!(
                    "duplicate route {} -> {}",
                    item.source, item.destination
                )));
            }
        }
        Ok(Self { routes })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let bridges: ConfiguredBridges = serde_json::from_str(json)
            .map_err(|e| BridgeError::InvalidRouting(format!("invalid JSON: {}", e)))?;
        Self::from_configured(bridges)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::InvalidRouting(format!("failed to read {}: {}", path.display(), e))
        })?;
        let map = Self::from_json(&json)?;
        info!(path = %path.display(), routes = map.len(), "Loaded routing config");
        Ok(map)
    }

    pub fn insert(&mut self, chain_id: u64, counterpart: u64, addresses: AddressConfig) {
        self.routes.insert((chain_id, counterpart), addresses);
    }

    /// Contracts on `chain_id` that bridge to `counterpart`
    pub fn get(&self, chain_id: u64, counterpart: u64) -> Result<&AddressConfig> {
        self.routes
            .get(&(chain_id, counterpart))
            .ok_or(BridgeError::RouteNotConfigured {
                src: chain_id,
                dest: counterpart,
            })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Every chain id appearing on either side of a route
    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .routes
            .keys()
            .flat_map(|(a, b)| [*a, *b])
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
