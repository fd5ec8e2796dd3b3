//! `TransferError`: the error surface of [`crate::orchestrator::TransferOrchestrator`]
//! and [`crate::validation`]. One variant per kind named in spec.md §7.

use alloy::primitives::ChainId;
use thiserror::Error;
use xtransfer_api::AuctionError;
use xtransfer_chain::ChainError;

pub type Result<T> = std::result::Result<T, TransferError>;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid param at {path}: {msg}")]
    InvalidParamStructure { path: String, msg: String },

    #[error("chain {0} is not configured")]
    ChainNotConfigured(ChainId),

    #[error("invalid slippage tolerance: {0}")]
    InvalidSlippage(String),

    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("invalid callTo: {0} is not a contract on chain {1}")]
    InvalidCallTo(alloy::primitives::Address, ChainId),

    #[error("call data encryption failed: {0}")]
    EncryptionError(String),

    #[error("subgraphs not synced for chain(s): {0:?}")]
    SubgraphsNotSynced(Vec<ChainId>),

    #[error("no transaction manager configured for chain {0}")]
    NoTransactionManager(ChainId),

    #[error("no price oracle configured for chain {0}")]
    NoPriceOracle(ChainId),

    #[error("no bids received")]
    NoBids,

    #[error("no valid bids: {reasons:?}")]
    NoValidBids { reasons: Vec<String> },

    #[error("auction failed: {0}")]
    UnknownAuctionError(String),

    #[error("bid signature missing or invalid")]
    InvalidBidSignature,

    #[error("meta-tx fulfillment timed out waiting for the receiver event")]
    MetaTxTimeout,

    #[error("rpc call failed: {0}")]
    RpcError(#[source] anyhow::Error),
}

impl From<AuctionError> for TransferError {
    fn from(e: AuctionError) -> Self {
        match e {
            AuctionError::NoBids => TransferError::NoBids,
            AuctionError::NoValidBids { reasons } => TransferError::NoValidBids { reasons },
            AuctionError::UnknownAuctionError(cause) => TransferError::UnknownAuctionError(cause),
        }
    }
}

impl From<ChainError> for TransferError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::ChainNotConfigured(id) => TransferError::ChainNotConfigured(id),
            ChainError::NoTransactionManager(id) => TransferError::NoTransactionManager(id),
            ChainError::NoPriceOracle(id) => TransferError::NoPriceOracle(id),
            ChainError::Rpc(cause) => TransferError::RpcError(cause),
        }
    }
}
