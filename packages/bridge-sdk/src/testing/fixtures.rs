//! Sample routes, messages and bridge transactions

use std::sync::Arc;

use alloy::primitives::{address, Address, TxHash, U256};

use crate::bridge::BridgeContext;
use crate::config::GasLimitConfig;
use crate::hash::hash_message;
use crate::routing::{AddressConfig, RoutingMap};
use crate::types::{BridgeTransaction, Message, MessageStatus, TokenType, TxReceipt};

use super::{MockChain, MockProver, StaticTokenResolver};

/// Sender and source owner of sample messages
pub const OWNER: Address = address!("a11ce00000000000000000000000000000000001");

/// Recipient of sample messages
pub const RECIPIENT: Address = address!("b0b0000000000000000000000000000000000002");

/// Block the sample send landed in
pub const SEND_BLOCK: u64 = 100;

const BRIDGE_TAG: u8 = 0xb1;
const ERC20_VAULT_TAG: u8 = 0x20;
const ERC721_VAULT_TAG: u8 = 0x72;
const ERC1155_VAULT_TAG: u8 = 0x11;
const SIGNAL_SERVICE_TAG: u8 = 0x55;

fn tagged(tag: u8, chain_id: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = tag;
    bytes[12..20].copy_from_slice(&chain_id.to_be_bytes());
    Address::from(bytes)
}

/// Contracts deployed on `chain_id` in [`sample_routing`]
pub fn contracts_on(chain_id: u64) -> AddressConfig {
    AddressConfig {
        bridge_address: tagged(BRIDGE_TAG, chain_id),
        erc20_vault_address: tagged(ERC20_VAULT_TAG, chain_id),
        erc721_vault_address: tagged(ERC721_VAULT_TAG, chain_id),
        erc1155_vault_address: tagged(ERC1155_VAULT_TAG, chain_id),
        signal_service_address: tagged(SIGNAL_SERVICE_TAG, chain_id),
        cross_chain_sync_address: Address::ZERO,
        ether_vault_address: None,
    }
}

/// Bridge contract on `chain_id` in [`sample_routing`]
pub fn bridge_on(chain_id: u64) -> Address {
    contracts_on(chain_id).bridge_address
}

/// Routes between chains 1 and 2 in both directions
pub fn sample_routing() -> RoutingMap {
    let mut routing = RoutingMap::default();
    routing.insert(1, 2, contracts_on(1));
    routing.insert(2, 1, contracts_on(2));
    routing
}

pub fn sample_message(src_chain_id: u64, dest_chain_id: u64) -> Message {
    Message {
        id: 0,
        from: OWNER,
        src_chain_id,
        dest_chain_id,
        src_owner: OWNER,
        dest_owner: OWNER,
        to: RECIPIENT,
        refund_to: OWNER,
        value: U256::from(1_000_000_000_000_000_000u128),
        fee: U256::ZERO,
        gas_limit: 0,
        data: Default::default(),
        memo: String::new(),
    }
}

/// A NEW ETH transfer with message, hash, block number and receipt
pub fn sample_bridge_tx(src_chain_id: u64, dest_chain_id: u64) -> BridgeTransaction {
    let message = sample_message(src_chain_id, dest_chain_id);
    let hash = TxHash::with_last_byte(0xee);
    BridgeTransaction {
        hash,
        from: OWNER,
        amount: message.value,
        symbol: "ETH".to_string(),
        decimals: 18,
        src_chain_id,
        dest_chain_id,
        token_type: TokenType::Eth,
        msg_hash: Some(hash_message(&message)),
        message: Some(message),
        msg_status: Some(MessageStatus::New),
        block_number: Some(SEND_BLOCK),
        receipt: Some(TxReceipt {
            transaction_hash: hash,
            block_number: SEND_BLOCK,
            status: true,
        }),
        timestamp: None,
    }
}

/// Context wired to the given mocks over [`sample_routing`]
pub fn sample_context(chain: Arc<MockChain>, prover: Arc<MockProver>) -> Arc<BridgeContext> {
    Arc::new(BridgeContext {
        reader: chain,
        prover,
        routing: Arc::new(sample_routing()),
        tokens: Arc::new(StaticTokenResolver::default()),
        gas: GasLimitConfig::default(),
    })
}
