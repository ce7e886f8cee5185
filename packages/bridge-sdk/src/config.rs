//! Gas budgets for sending and claiming messages

use serde::{Deserialize, Serialize};

use crate::types::TokenType;

/// Fallback gas for `processMessage` when every estimation fails
pub const CLAIM_FALLBACK_GAS: u64 = 1_300_000;

/// Percentage added to gas estimates when the counterparty is a contract
pub const CONTRACT_GAS_BUMP_PERCENT: u64 = 5;

/// Per-asset gas limits written into outgoing messages, plus the thresholds
/// above which claims force the message's own gas limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GasLimitConfig {
    /// Gas reserved on ETH messages that carry a relayer fee
    pub eth_no_owner_gas_limit: u32,
    pub erc20_deployed_gas_limit: u32,
    pub erc20_not_deployed_gas_limit: u32,
    pub erc721_deployed_gas_limit: u32,
    pub erc721_not_deployed_gas_limit: u32,
    pub erc1155_deployed_gas_limit: u32,
    pub erc1155_not_deployed_gas_limit: u32,
    pub erc20_gas_limit_threshold: u32,
    pub erc1155_gas_limit_threshold: u32,
}

impl Default for GasLimitConfig {
    fn default() -> Self {
        Self {
            eth_no_owner_gas_limit: 140_000,
            erc20_deployed_gas_limit: 200_000,
            erc20_not_deployed_gas_limit: 650_000,
            erc721_deployed_gas_limit: 1_100_000,
            erc721_not_deployed_gas_limit: 2_400_000,
            erc1155_deployed_gas_limit: 1_100_000,
            erc1155_not_deployed_gas_limit: 2_600_000,
            erc20_gas_limit_threshold: 500_000,
            erc1155_gas_limit_threshold: 2_000_000,
        }
    }
}

impl GasLimitConfig {
    /// Gas limit for an outgoing token message
    ///
    /// Without a relayer fee the owner processes the message and no gas is
    /// reserved. With a fee the budget depends on whether the bridged token
    /// already exists on the destination chain.
    pub fn message_gas_limit(&self, asset: TokenType, has_fee: bool, deployed_on_dest: bool) -> u32 {
        if !has_fee {
            return 0;
        }
        match (asset, deployed_on_dest) {
            (TokenType::Eth, _) => self.eth_no_owner_gas_limit,
            (TokenType::Erc20, true) => self.erc20_deployed_gas_limit,
            (TokenType::Erc20, false) => self.erc20_not_deployed_gas_limit,
            (TokenType::Erc721, true) => self.erc721_deployed_gas_limit,
            (TokenType::Erc721, false) => self.erc721_not_deployed_gas_limit,
            (TokenType::Erc1155, true) => self.erc1155_deployed_gas_limit,
            (TokenType::Erc1155, false) => self.erc1155_not_deployed_gas_limit,
        }
    }
}

/// Bump a gas estimate for contract counterparties
pub fn bump_for_contract(gas: u64) -> u64 {
    let bumped = u128::from(gas) * u128::from(100 + CONTRACT_GAS_BUMP_PERCENT) / 100;
    u64::try_from(bumped).unwrap_or(u64::MAX)
}
