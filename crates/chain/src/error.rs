//! Error kinds surfaced by `ChainGate`.

use alloy::primitives::ChainId;
use thiserror::Error;

/// Failures from reading or preparing a call against a configured chain.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain {0} is not configured")]
    ChainNotConfigured(ChainId),

    #[error("no transaction manager configured for chain {0}")]
    NoTransactionManager(ChainId),

    #[error("no price oracle configured for chain {0}")]
    NoPriceOracle(ChainId),

    #[error("rpc call failed: {0}")]
    Rpc(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChainError>;
