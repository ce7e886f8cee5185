//! Bridge, signal service and vault ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the contracts the
//! client reads from and writes to.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

use crate::types;

sol! {
    /// Cross-chain message, field order matches IBridge.Message
    #[derive(Debug, PartialEq, Eq)]
    struct Message {
        uint128 id;
        address from;
        uint64 srcChainId;
        uint64 destChainId;
        address srcOwner;
        address destOwner;
        address to;
        address refundTo;
        uint256 value;
        uint256 fee;
        uint32 gasLimit;
        bytes data;
        string memo;
    }

    /// Token transfer request for the ERC20 vault
    #[derive(Debug)]
    struct BridgeTransferOp {
        uint64 destChainId;
        address destOwner;
        address to;
        uint256 fee;
        address token;
        uint32 gasLimit;
        uint256 amount;
        address refundTo;
        string memo;
    }

    /// Token transfer request for the ERC721 and ERC1155 vaults
    #[derive(Debug)]
    struct NftBridgeTransferOp {
        uint64 destChainId;
        address destOwner;
        address to;
        uint256 fee;
        address token;
        uint32 gasLimit;
        uint256[] tokenIds;
        uint256[] amounts;
        address refundTo;
        string memo;
    }

    #[sol(rpc)]
    contract Bridge {
        // ========================================================================
        // Message Lifecycle
        // ========================================================================

        function sendMessage(Message calldata message) external payable returns (bytes32 msgHash, Message memory sentMessage);

        function processMessage(Message calldata message, bytes calldata proof) external;

        function retryMessage(Message calldata message, bool isLastAttempt) external;

        function recallMessage(Message calldata message, bytes calldata proof) external;

        // ========================================================================
        // Queries
        // ========================================================================

        /// Raw `Status` enum value
        function messageStatus(bytes32 msgHash) external view returns (uint8 status);

        function proofReceipt(bytes32 msgHash) external view returns (uint64 receivedAt, address preferredExecutor);

        function getInvocationDelays() external view returns (uint256 preferredDelay, uint256 fallbackDelay);

        function paused() external view returns (bool isPaused);
    }

    #[sol(rpc)]
    contract SignalService {
        function getSyncedChainData(uint64 chainId, bytes32 kind, uint64 blockId) external view returns (uint64 syncedBlockId, bytes32 chainData);
    }

    #[sol(rpc)]
    contract ERC20Vault {
        function sendToken(BridgeTransferOp calldata op) external payable returns (Message memory sentMessage);

        function bridgedToCanonical(address btoken) external view returns (uint64 chainId, address addr, uint8 decimals, string symbol, string name);

        function canonicalToBridged(uint256 chainId, address canonicalAddress) external view returns (address btoken);
    }

    #[sol(rpc)]
    contract ERC721Vault {
        function sendToken(NftBridgeTransferOp calldata op) external payable returns (Message memory sentMessage);

        function bridgedToCanonical(address btoken) external view returns (uint64 chainId, address addr, string symbol, string name);

        function canonicalToBridged(uint256 chainId, address canonicalAddress) external view returns (address btoken);
    }

    #[sol(rpc)]
    contract ERC1155Vault {
        function sendToken(NftBridgeTransferOp calldata op) external payable returns (Message memory sentMessage);

        function bridgedToCanonical(address btoken) external view returns (uint64 chainId, address addr, string symbol, string name);

        function canonicalToBridged(uint256 chainId, address canonicalAddress) external view returns (address btoken);
    }

    #[sol(rpc)]
    contract IERC20 {
        function balanceOf(address account) external view returns (uint256 balance);
        function allowance(address owner, address spender) external view returns (uint256 remaining);
        function approve(address spender, uint256 amount) external returns (bool success);
    }

    #[sol(rpc)]
    contract IERC721 {
        function getApproved(uint256 tokenId) external view returns (address operator);
        function approve(address to, uint256 tokenId) external;
    }

    #[sol(rpc)]
    contract IERC1155 {
        function balanceOf(address account, uint256 id) external view returns (uint256 balance);
        function isApprovedForAll(address account, address operator) external view returns (bool approved);
        function setApprovalForAll(address operator, bool approved) external;
    }
}

impl From<&types::Message> for Message {
    fn from(message: &types::Message) -> Self {
        Message {
            id: message.id,
            from: message.from,
            srcChainId: message.src_chain_id,
            destChainId: message.dest_chain_id,
            srcOwner: message.src_owner,
            destOwner: message.dest_owner,
            to: message.to,
            refundTo: message.refund_to,
            value: message.value,
            fee: message.fee,
            gasLimit: message.gas_limit,
            data: message.data.clone(),
            memo: message.memo.clone(),
        }
    }
}

impl From<Message> for types::Message {
    fn from(message: Message) -> Self {
        types::Message {
            id: message.id,
            from: message.from,
            src_chain_id: message.srcChainId,
            dest_chain_id: message.destChainId,
            src_owner: message.srcOwner,
            dest_owner: message.destOwner,
            to: message.to,
            refund_to: message.refundTo,
            value: message.value,
            fee: message.fee,
            gas_limit: message.gasLimit,
            data: message.data,
            memo: message.memo,
        }
    }
}
