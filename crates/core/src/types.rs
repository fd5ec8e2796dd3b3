//! Orchestrator-level data model (spec.md §3) not already owned by
//! `xtransfer-chain` (`InvariantTransactionData`, `TxRequest`, ...) or
//! `xtransfer-api` (`AuctionBid`, `AuctionResponse`, ...).

use std::collections::HashSet;

use alloy::primitives::{Address, Bytes, B256, U256};
use xtransfer_chain::InvariantTransactionData;

/// Caller-supplied parameters for `getTransferQuote` (spec.md §4.6). This
/// carries the *raw* call data as a hex string, before it is hashed into
/// `callDataHash` and (if non-empty) encrypted into `encryptedCallData`.
#[derive(Debug, Clone)]
pub struct QuoteParams {
    pub user: Address,
    pub initiator: Address,
    pub sending_chain_id: u64,
    pub sending_asset_id: Address,
    pub amount: U256,
    pub receiving_chain_id: u64,
    pub receiving_asset_id: Address,
    pub receiving_address: Address,
    pub slippage_tolerance: String,
    pub expiry: Option<u64>,
    pub dry_run: bool,
    pub preferred_routers: Option<HashSet<Address>>,
    /// Hex-encoded call data, `"0x"` when there is none.
    pub call_data: String,
    pub call_to: Address,
}

/// A receiver-chain "prepared" event delivered by the indexer, validated
/// before the orchestrator acts on it (spec.md §4.1 `validatePrepareEvent`).
#[derive(Debug, Clone)]
pub struct PrepareEvent {
    pub transaction_id: B256,
    pub tx_data: InvariantTransactionData,
    pub amount: U256,
    pub caller: Address,
}

/// Caller-supplied parameters for `cancel` (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub tx_data: InvariantTransactionData,
    pub amount: U256,
    pub relayer_fee: U256,
    pub signature: Bytes,
}

/// The transfer state machine's granular status (spec.md §4.6, supplemented
/// per SPEC_FULL.md §3 with `Quoted`/`SenderPrepared`/`ReceiverPrepared`
/// beyond the 5-way sketch in spec.md §3's `TransferState.status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Quoting,
    Quoted,
    SenderPrepared,
    ReceiverPrepared,
    Fulfilled,
    Cancelled,
    Failed,
}

impl TransferStatus {
    /// Whether this status is one of the three terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Fulfilled | TransferStatus::Cancelled | TransferStatus::Failed)
    }
}
