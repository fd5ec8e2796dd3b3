//! Client-side coordinator for a trust-minimized, hash/time-locked
//! cross-chain asset transfer protocol: the transfer-orchestration state
//! machine and auction protocol client (spec.md §1).
//!
//! This crate owns `ValidationKit` (C1), `TransferOrchestrator` (C6) and
//! its state machine, and workspace-level configuration; `BidCrypto` (C2)
//! and `ChainGate` (C3) live in `xtransfer-chain`, `AuctionClient` (C5),
//! `IndexerGate` (C4) and `EventMux` (C7) live in `xtransfer-api`.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod types;
pub mod validation;

pub use config::{ChainConfigEntry, GasConfig, Network, SdkConfig, META_TX_TIMEOUT};
pub use error::{Result, TransferError};
pub use orchestrator::{CallDataEncryptor, FulfillOutcome, NoopEncryptor, TransferOrchestrator};
pub use types::{CancelRequest, PrepareEvent, QuoteParams, TransferStatus};

pub use xtransfer_api::AUCTION_TIMEOUT;
pub use xtransfer_chain::crypto::{decode_bid, encode_bid};
