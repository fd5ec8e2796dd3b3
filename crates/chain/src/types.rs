//! Chain-facing data types shared by `ChainGate` and its callers.

use alloy::primitives::{Address, Bytes, ChainId, U256};
use serde::{Deserialize, Serialize};

/// A submittable transaction request. `ChainGate` only ever *builds* these;
/// submitting them to the network is the caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRequest {
    pub chain_id: ChainId,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    pub gas: GasFees,
}

/// Gas pricing carried on a [`TxRequest`], grounded on the teacher's
/// `GasPricingModel` (legacy vs EIP-1559).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum GasFees {
    Legacy { gas_price: u128 },
    Eip1559 { max_fee_per_gas: u128, max_priority_fee_per_gas: u128 },
}

/// Invariant transaction data, identical on both chains and covered by the
/// router's bid signature (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantTransactionData {
    pub receiving_chain_tx_manager_address: Address,
    pub user: Address,
    pub router: Address,
    pub initiator: Address,
    pub sending_asset_id: Address,
    pub receiving_asset_id: Address,
    pub sending_chain_fallback: Address,
    pub call_to: Address,
    pub receiving_address: Address,
    pub sending_chain_id: ChainId,
    pub receiving_chain_id: ChainId,
    pub call_data_hash: alloy::primitives::B256,
    pub transaction_id: alloy::primitives::B256,
}

impl InvariantTransactionData {
    /// `sendingChainId != receivingChainId` and `sendingChainFallback == user`.
    pub fn is_structurally_valid(&self) -> bool {
        self.sending_chain_id != self.receiving_chain_id
            && self.sending_chain_fallback == self.user
    }
}

/// Parameters for `preparePrepareRequest`.
#[derive(Debug, Clone)]
pub struct PrepareParams {
    pub tx_data: InvariantTransactionData,
    pub amount: U256,
    pub expiry: u64,
    pub encrypted_call_data: Bytes,
    pub bid_signature: Bytes,
    pub encoded_bid: Bytes,
}

/// Parameters for `prepareFulfillRequest`.
#[derive(Debug, Clone)]
pub struct FulfillParams {
    pub tx_data: InvariantTransactionData,
    pub amount: U256,
    pub relayer_fee: U256,
    pub signature: Bytes,
    pub call_data: Bytes,
}

/// Parameters for `prepareCancelRequest`.
#[derive(Debug, Clone)]
pub struct CancelParams {
    pub tx_data: InvariantTransactionData,
    pub amount: U256,
    pub relayer_fee: U256,
    pub signature: Bytes,
}
