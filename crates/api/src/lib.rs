//! Bus-driven auction protocol, subgraph access, and event subscriptions
//! for the cross-chain transfer orchestrator.

pub mod auction;
pub mod bus;
pub mod events;
pub mod indexer;
pub mod types;

pub use auction::{AuctionClient, AuctionError, AuctionPolicy, AUCTION_TIMEOUT, METATX_REQUEST_SUBJECT};
pub use bus::{BusError, BusMessage, BusSubscription, LocalBus, MessageBus};
pub use events::{EventMux, IndexerEvent, RegistrationToken};
pub use indexer::{ActiveTransaction, ChainIndexerConfig, HistoricalTransaction, IndexerGate, SubgraphSyncRecord};
pub use types::{AuctionBid, AuctionRequestPayload, AuctionRequestWire, AuctionResponse, AuctionResponseWire, MetaTxRequestWire};
