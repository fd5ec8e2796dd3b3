//! Minimal on-chain interfaces the SDK needs to read state and build
//! calldata. Defined inline with `sol!` (rather than loaded from Foundry
//! JSON artifacts) since this workspace has no accompanying `contracts/`
//! directory — the same approach the teacher uses for `IBalancesReader`.

use alloy::sol;

sol! {
    /// The subset of the invariant transaction data the transaction
    /// manager contract needs on both `prepare` and `fulfill`/`cancel`.
    #[derive(Debug)]
    struct InvariantTransactionDataSol {
        address receivingChainTxManagerAddress;
        address user;
        address router;
        address initiator;
        address sendingAssetId;
        address receivingAssetId;
        address sendingChainFallback;
        address callTo;
        address receivingAddress;
        uint256 sendingChainId;
        uint256 receivingChainId;
        bytes32 callDataHash;
        bytes32 transactionId;
    }

    /// The on-chain transaction manager contract (external collaborator;
    /// this SDK never deploys or owns it, only calls into it).
    #[sol(rpc)]
    #[derive(Debug)]
    interface ITransactionManager {
        function routerBalances(address router, address assetId) external view returns (uint256);

        function prepare(
            InvariantTransactionDataSol invariantData,
            uint256 amount,
            uint256 expiry,
            bytes calldata encryptedCallData,
            bytes calldata encodedBid,
            bytes calldata bidSignature
        ) external payable returns (bytes32);

        function fulfill(
            InvariantTransactionDataSol invariantData,
            uint256 amount,
            uint256 relayerFee,
            bytes calldata signature,
            bytes calldata callData
        ) external returns (bytes32);

        function cancel(
            InvariantTransactionDataSol invariantData,
            uint256 amount,
            uint256 relayerFee,
            bytes calldata signature
        ) external returns (bytes32);
    }

    /// Minimal ERC-20 surface needed for liquidity checks and approvals.
    #[sol(rpc)]
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address who) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Price oracle used to convert the gas cost of a fulfill call into
    /// the receiving asset's units.
    #[sol(rpc)]
    #[derive(Debug)]
    interface IPriceOracle {
        function getTokenPrice(address token) external view returns (uint256);
    }
}

impl From<&crate::types::InvariantTransactionData> for InvariantTransactionDataSol {
    fn from(d: &crate::types::InvariantTransactionData) -> Self {
        Self {
            receivingChainTxManagerAddress: d.receiving_chain_tx_manager_address,
            user: d.user,
            router: d.router,
            initiator: d.initiator,
            sendingAssetId: d.sending_asset_id,
            receivingAssetId: d.receiving_asset_id,
            sendingChainFallback: d.sending_chain_fallback,
            callTo: d.call_to,
            receivingAddress: d.receiving_address,
            sendingChainId: alloy::primitives::U256::from(d.sending_chain_id),
            receivingChainId: alloy::primitives::U256::from(d.receiving_chain_id),
            callDataHash: d.call_data_hash,
            transactionId: d.transaction_id,
        }
    }
}
