//! `AuctionClient` (C5): the algorithmic heart — collects, validates, and
//! ranks router bids over a bounded time window on the message bus.
//!
//! Grounded on the teacher's `scanner.rs` timed-collection loop (poll until
//! a deadline, accumulate candidates, then act) and `LiqdClient`'s
//! validate-then-rank opportunity selection.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use xtransfer_chain::crypto::recover_bid_signer;
use xtransfer_chain::ChainGate;

use crate::bus::{BusError, MessageBus};
use crate::types::{AuctionRequestPayload, AuctionRequestWire, AuctionResponse, AuctionResponseWire};

/// Bid collection window (spec.md §5); doubled under `PreferredRouters`.
pub const AUCTION_TIMEOUT: Duration = Duration::from_secs(6);

const AUCTION_REQUEST_SUBJECT: &str = "auction.request";

/// Publish subject for the relayer meta-tx fulfill path (spec.md §6).
pub const METATX_REQUEST_SUBJECT: &str = "metatx.request";
const AUCTION_RESPONSE_SUBJECT: &str = "auction.response";

/// How an auction selects its winner (spec.md §4.5).
#[derive(Debug, Clone)]
pub enum AuctionPolicy {
    /// Accept the first non-error bid, no validation gate.
    DryRun,
    /// Wait up to `2 x AUCTION_TIMEOUT` for the first *valid* bid from a
    /// router in `set`.
    PreferredRouters(HashSet<Address>),
    /// Collect every bid for the full window, then validate and rank.
    OpenAuction,
}

#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("no bids received")]
    NoBids,
    #[error("no valid bids: {reasons:?}")]
    NoValidBids { reasons: Vec<String> },
    #[error("auction failed: {0}")]
    UnknownAuctionError(String),
}

impl From<BusError> for AuctionError {
    fn from(e: BusError) -> Self {
        AuctionError::UnknownAuctionError(e.to_string())
    }
}

/// Collects, validates, and ranks bids for one auction.
pub struct AuctionClient {
    bus: Arc<dyn MessageBus>,
    chain: Arc<ChainGate>,
}

impl AuctionClient {
    pub fn new(bus: Arc<dyn MessageBus>, chain: Arc<ChainGate>) -> Self {
        Self { bus, chain }
    }

    /// Run one auction to completion per `policy` (spec.md §4.5 steps 1-7).
    #[instrument(skip(self, payload, slippage_tolerance))]
    pub async fn run_auction(
        &self,
        payload: AuctionRequestPayload,
        slippage_tolerance: &str,
        policy: AuctionPolicy,
    ) -> Result<AuctionResponse, AuctionError> {
        let inbox_id = hex::encode(B256::random());
        let mut sub = self.bus.subscribe(AUCTION_RESPONSE_SUBJECT).await?;

        let requested_amount = payload.amount;
        let wire = AuctionRequestWire { inbox_id: inbox_id.clone(), payload };
        let body = serde_json::to_vec(&wire)
            .map_err(|e| AuctionError::UnknownAuctionError(e.to_string()))?;
        self.bus.publish(AUCTION_REQUEST_SUBJECT, body).await?;

        let window = match policy {
            AuctionPolicy::PreferredRouters(_) => AUCTION_TIMEOUT * 2,
            _ => AUCTION_TIMEOUT,
        };
        let deadline = Instant::now() + window;

        let mut accepted: Vec<AuctionResponse> = Vec::new();
        let mut reasons: Vec<String> = Vec::new();
        let mut any_bid_seen = false;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            let next = match tokio::time::timeout(remaining, sub.recv()).await {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(_) => break,
            };

            let envelope: AuctionResponseWire = match serde_json::from_slice(&next.payload) {
                Ok(e) => e,
                Err(_) => continue,
            };
            if envelope.inbox != inbox_id {
                continue;
            }
            if let Some(err) = envelope.err {
                debug!(reason = %err, "auction response carried an error, ignoring");
                continue;
            }
            let Some(response) = envelope.data else { continue };
            any_bid_seen = true;

            match &policy {
                AuctionPolicy::DryRun => return Ok(response),
                AuctionPolicy::PreferredRouters(set) => {
                    if !set.contains(&response.bid.router) {
                        continue;
                    }
                    match self.validate(&response, slippage_tolerance, requested_amount).await {
                        Ok(()) => return Ok(response),
                        Err(reason) => reasons.push(reason),
                    }
                }
                AuctionPolicy::OpenAuction => accepted.push(response),
            }
        }

        if matches!(policy, AuctionPolicy::OpenAuction) {
            let candidates = std::mem::take(&mut accepted);
            for response in candidates {
                match self.validate(&response, slippage_tolerance, requested_amount).await {
                    Ok(()) => accepted.push(response),
                    Err(reason) => reasons.push(reason),
                }
            }
            let accepted = rank_by_amount_received(accepted);
            if let Some(winner) = accepted.into_iter().next() {
                return Ok(winner);
            }
        }

        if !any_bid_seen {
            return Err(AuctionError::NoBids);
        }
        Err(AuctionError::NoValidBids { reasons })
    }

    /// Validation gate (spec.md §4.5 step 5): signature, liquidity, slippage.
    async fn validate(
        &self,
        response: &AuctionResponse,
        slippage_tolerance: &str,
        requested_amount: U256,
    ) -> Result<(), String> {
        let bid = &response.bid;

        let recovered = recover_bid_signer(&bid.to_bid_fields(), &response.bid_signature)
            .map_err(|_| "Invalid router signature on bid".to_string())?;
        if recovered != bid.router {
            return Err("Invalid router signature on bid".to_string());
        }

        let liquidity = self
            .chain
            .router_liquidity(bid.receiving_chain_id, bid.router, bid.receiving_asset_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "router liquidity read failed");
                "Error getting router liquidity".to_string()
            })?;
        if liquidity < bid.amount_received {
            return Err("Router's liquidity low".to_string());
        }

        if !passes_slippage_gate(
            requested_amount,
            response.gas_fee_in_receiving_token,
            bid.amount_received,
            slippage_tolerance,
        ) {
            return Err("Invalid bid price".to_string());
        }

        Ok(())
    }
}

/// Rank validated candidates by `amountReceived` descending (spec.md §8,
/// testable property 3). A stable sort keeps ties in arrival order.
fn rank_by_amount_received(mut candidates: Vec<AuctionResponse>) -> Vec<AuctionResponse> {
    candidates.sort_by_key(|c| std::cmp::Reverse(c.bid.amount_received));
    candidates
}

/// Slippage gate (spec.md §4.5 step 5c): the lower bound is anchored to the
/// amount the user asked to send, not the bid's own `amountReceived` —
/// otherwise an under-quoted bid would always clear a bound computed from
/// itself. Returns `false` (reject) on an unparseable `slippage_tolerance`.
fn passes_slippage_gate(requested_amount: U256, gas_fee: U256, amount_received: U256, slippage_tolerance: &str) -> bool {
    let Some(centipercent) = parse_slippage_centipercent(slippage_tolerance) else {
        return false;
    };
    let amt_minus_gas = requested_amount.saturating_sub(gas_fee);
    let lower_bound = amt_minus_gas * U256::from(10_000 - centipercent) / U256::from(10_000u64);
    amount_received >= lower_bound
}

/// Parse a decimal-percent string with up to two fractional digits into
/// hundredths-of-a-percent (e.g. `"0.10"` -> `10`, `"15.00"` -> `1500`).
fn parse_slippage_centipercent(s: &str) -> Option<u64> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, "00"),
    };
    let whole: u64 = whole.parse().ok()?;
    let frac = format!("{frac:0<2}");
    let frac: u64 = frac.get(..2)?.parse().ok()?;
    Some(whole * 100 + frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;
    use crate::types::AuctionBid;
    use alloy::primitives::Bytes;
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;
    use xtransfer_chain::crypto::encode_bid;
    use xtransfer_chain::{ChainEntryConfig, GasFees};

    fn gate() -> Arc<ChainGate> {
        Arc::new(
            ChainGate::new(vec![
                ChainEntryConfig {
                    chain_id: 1,
                    rpc_url: "http://127.0.0.1:8545".to_string(),
                    transaction_manager: Some(Address::repeat_byte(0xAB)),
                    price_oracle: Some(Address::repeat_byte(0xCD)),
                    default_gas_limit: 500_000,
                    gas: GasFees::Legacy { gas_price: 1 },
                },
                ChainEntryConfig {
                    chain_id: 137,
                    rpc_url: "http://127.0.0.1:8546".to_string(),
                    transaction_manager: Some(Address::repeat_byte(0xEF)),
                    price_oracle: Some(Address::repeat_byte(0x12)),
                    default_gas_limit: 500_000,
                    gas: GasFees::Legacy { gas_price: 1 },
                },
            ])
            .unwrap(),
        )
    }

    fn signed_bid(router: &PrivateKeySigner, amount_received: u64) -> AuctionResponse {
        let bid = AuctionBid {
            user: Address::repeat_byte(1),
            router: router.address(),
            initiator: Address::repeat_byte(1),
            sending_chain_id: 1,
            sending_asset_id: Address::ZERO,
            amount: U256::from(1000u64),
            receiving_chain_id: 137,
            receiving_asset_id: Address::ZERO,
            amount_received: U256::from(amount_received),
            receiving_address: Address::repeat_byte(2),
            transaction_id: B256::repeat_byte(9),
            expiry: 1_900_000_000,
            call_data_hash: alloy::primitives::keccak256([]),
            call_to: Address::ZERO,
            encrypted_call_data: Bytes::new(),
            bid_expiry: 1_900_000_000,
        };
        let digest = alloy::primitives::keccak256(encode_bid(&bid.to_bid_fields()));
        let sig = router.sign_hash_sync(&digest).unwrap();
        let sig_bytes: [u8; 65] = sig.into();
        AuctionResponse {
            bid,
            bid_signature: Bytes::from(sig_bytes.to_vec()),
            gas_fee_in_receiving_token: U256::ZERO,
        }
    }

    fn sample_payload() -> AuctionRequestPayload {
        AuctionRequestPayload {
            user: Address::repeat_byte(1),
            initiator: Address::repeat_byte(1),
            sending_chain_id: 1,
            sending_asset_id: Address::ZERO,
            amount: U256::from(1000u64),
            receiving_chain_id: 137,
            receiving_asset_id: Address::ZERO,
            receiving_address: Address::repeat_byte(2),
            slippage_tolerance: "0.10".to_string(),
            expiry: None,
            dry_run: false,
            call_data_hash: alloy::primitives::keccak256([]),
            call_to: Address::ZERO,
            encrypted_call_data: Bytes::new(),
        }
    }

    #[test]
    fn slippage_gate_rejects_an_under_quoted_bid() {
        // spec.md §8, S2: requested amount 100, gas fee 1, slippage 0.10%.
        // A bid quoting amountReceived=50 clears the bound; one quoting 40
        // does not, independent of the bid's own amountReceived.
        let requested_amount = U256::from(100u64);
        let gas_fee = U256::from(1u64);
        assert!(passes_slippage_gate(requested_amount, gas_fee, U256::from(99u64), "0.10"));
        assert!(!passes_slippage_gate(requested_amount, gas_fee, U256::from(40u64), "0.10"));
    }

    #[test]
    fn parses_slippage_strings() {
        assert_eq!(parse_slippage_centipercent("0.10"), Some(10));
        assert_eq!(parse_slippage_centipercent("15.00"), Some(1500));
        assert_eq!(parse_slippage_centipercent("0.01"), Some(1));
    }

    #[tokio::test]
    async fn no_bids_when_window_elapses_silently() {
        let bus: Arc<dyn MessageBus> = Arc::new(LocalBus::new());
        bus.connect().await.unwrap();
        let client = AuctionClient::new(bus, gate());

        let result = tokio::time::timeout(
            Duration::from_secs(7),
            client.run_auction(sample_payload(), "0.10", AuctionPolicy::DryRun),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(AuctionError::NoBids)));
    }

    #[test]
    fn ranking_is_stable_and_descending_with_arrival_order_tiebreak() {
        let low = PrivateKeySigner::random();
        let tied_first = PrivateKeySigner::random();
        let tied_second = PrivateKeySigner::random();

        let a = signed_bid(&low, 90);
        let b = signed_bid(&tied_first, 100);
        let c = signed_bid(&tied_second, 100);
        let ranked = rank_by_amount_received(vec![a.clone(), b.clone(), c.clone()]);

        assert_eq!(ranked[0].bid.router, b.bid.router);
        assert_eq!(ranked[1].bid.router, c.bid.router);
        assert_eq!(ranked[2].bid.router, a.bid.router);
    }

    // `AuctionPolicy::OpenAuction` validation also checks a router's
    // on-chain liquidity, which requires a real `ChainGate` RPC endpoint —
    // exercised end to end against a local chain, not in the default suite.
    #[tokio::test]
    #[ignore = "requires a live chain RPC for the liquidity check"]
    async fn open_auction_ranks_by_amount_received_descending() {
        let bus: Arc<dyn MessageBus> = Arc::new(LocalBus::new());
        bus.connect().await.unwrap();

        let mut request_sub = bus.subscribe(AUCTION_REQUEST_SUBJECT).await.unwrap();
        let client = AuctionClient::new(Arc::clone(&bus), gate());
        let auction = tokio::spawn(async move {
            client.run_auction(sample_payload(), "0.10", AuctionPolicy::OpenAuction).await
        });

        let msg = request_sub.recv().await.unwrap();
        let wire: AuctionRequestWire = serde_json::from_slice(&msg.payload).unwrap();

        let low = PrivateKeySigner::random();
        let high = PrivateKeySigner::random();
        for (signer, amount) in [(&low, 100u64), (&high, 101u64)] {
            let resp = signed_bid(signer, amount);
            let envelope = AuctionResponseWire { inbox: wire.inbox_id.clone(), data: Some(resp), err: None };
            bus.publish(AUCTION_RESPONSE_SUBJECT, serde_json::to_vec(&envelope).unwrap()).await.unwrap();
        }

        let winner = auction.await.unwrap().unwrap();
        assert_eq!(winner.bid.amount_received, U256::from(101u64));
    }
}
