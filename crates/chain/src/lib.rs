//! Chain-facing primitives for the cross-chain transfer orchestrator:
//! `ChainGate` (C3) — the read/write port over configured chains — plus
//! the ABI plumbing (`contracts`), canonical bid cryptography (`crypto`,
//! C2), and the bundled chain registry it relies on.

pub mod contracts;
pub mod crypto;
mod error;
mod gate;
pub mod registry;
mod types;

pub use error::{ChainError, Result};
pub use gate::{ChainEntryConfig, ChainGate};
pub use crypto::{decode_bid, encode_bid};
pub use registry::RegistryEntry;
pub use types::{
    CancelParams, FulfillParams, GasFees, InvariantTransactionData, PrepareParams, TxRequest,
};
