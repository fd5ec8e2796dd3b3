//! Auction wire types (spec.md §3, §6).

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use xtransfer_chain::crypto::BidFields;

/// A router's offer describing what it will deliver on the receiving chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionBid {
    pub user: Address,
    pub router: Address,
    pub initiator: Address,
    pub sending_chain_id: u64,
    pub sending_asset_id: Address,
    #[serde(with = "u256_decimal")]
    pub amount: U256,
    pub receiving_chain_id: u64,
    pub receiving_asset_id: Address,
    #[serde(with = "u256_decimal")]
    pub amount_received: U256,
    pub receiving_address: Address,
    pub transaction_id: B256,
    pub expiry: u64,
    pub call_data_hash: B256,
    pub call_to: Address,
    pub encrypted_call_data: Bytes,
    pub bid_expiry: u64,
}

impl AuctionBid {
    /// Project onto the crypto crate's encoding-only field set.
    pub fn to_bid_fields(&self) -> BidFields {
        BidFields {
            user: self.user,
            router: self.router,
            initiator: self.initiator,
            sending_chain_id: self.sending_chain_id,
            sending_asset_id: self.sending_asset_id,
            amount: self.amount,
            receiving_chain_id: self.receiving_chain_id,
            receiving_asset_id: self.receiving_asset_id,
            amount_received: self.amount_received,
            receiving_address: self.receiving_address,
            transaction_id: self.transaction_id,
            expiry: self.expiry,
            call_data_hash: self.call_data_hash,
            call_to: self.call_to,
            encrypted_call_data: self.encrypted_call_data.clone(),
            bid_expiry: self.bid_expiry,
        }
    }
}

/// A winning (or candidate) bid together with its router signature and the
/// gas cost of fulfilling it, denominated in the receiving token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionResponse {
    pub bid: AuctionBid,
    pub bid_signature: Bytes,
    #[serde(with = "u256_decimal")]
    pub gas_fee_in_receiving_token: U256,
}

/// The payload half of `AuctionRequest{inboxId, payload}` (spec.md §6): what
/// routers need to form a competing bid. Quote-level validation happens
/// before this is built; this type only carries already-validated data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionRequestPayload {
    pub user: Address,
    pub initiator: Address,
    pub sending_chain_id: u64,
    pub sending_asset_id: Address,
    #[serde(with = "u256_decimal")]
    pub amount: U256,
    pub receiving_chain_id: u64,
    pub receiving_asset_id: Address,
    pub receiving_address: Address,
    pub slippage_tolerance: String,
    pub expiry: Option<u64>,
    pub dry_run: bool,
    pub call_data_hash: B256,
    pub call_to: Address,
    pub encrypted_call_data: Bytes,
}

/// Wire envelope published on the `auction.request` subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRequestWire {
    pub inbox_id: String,
    pub payload: AuctionRequestPayload,
}

/// Wire envelope received on the shared `auction.response` subject; the
/// `inbox` field is how one subscription dispatches to many in-flight
/// auctions (spec.md §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionResponseWire {
    pub inbox: String,
    pub data: Option<AuctionResponse>,
    pub err: Option<String>,
}

/// `MetaTxRequest{type, relayerFee, to, chainId, data}` published on
/// `metatx.request` for the relayer fulfill path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaTxRequestWire {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "u256_decimal")]
    pub relayer_fee: U256,
    pub to: Address,
    pub chain_id: u64,
    pub data: Bytes,
}

/// Serialize `U256` as a decimal string, per spec.md §6's numeric semantics.
mod u256_decimal {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuctionBid {
        AuctionBid {
            user: Address::repeat_byte(1),
            router: Address::repeat_byte(2),
            initiator: Address::repeat_byte(1),
            sending_chain_id: 1,
            sending_asset_id: Address::repeat_byte(3),
            amount: U256::from(1000u64),
            receiving_chain_id: 137,
            receiving_asset_id: Address::repeat_byte(4),
            amount_received: U256::from(990u64),
            receiving_address: Address::repeat_byte(5),
            transaction_id: B256::repeat_byte(6),
            expiry: 1_900_000_000,
            call_data_hash: B256::ZERO,
            call_to: Address::ZERO,
            encrypted_call_data: Bytes::new(),
            bid_expiry: 1_900_000_000,
        }
    }

    #[test]
    fn bid_round_trips_through_json() {
        let bid = sample();
        let json = serde_json::to_string(&bid).unwrap();
        let decoded: AuctionBid = serde_json::from_str(&json).unwrap();
        assert_eq!(bid, decoded);
    }
}
