//! `TransferOrchestrator` (C6): the top-level coordinator — end-to-end
//! quote → prepare → fulfill/cancel state machine (spec.md §4.6).
//!
//! Grounded on the teacher's `Liquidator` (`liquidator.rs`): one struct
//! holding every collaborator port (`ChainGate`/`AuctionClient`/
//! `IndexerGate`/`EventMux`), `#[instrument]`'d public operations that
//! validate first and touch I/O second, warnings on soft failures,
//! errors propagated with `?`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, Bytes, ChainId, B256, U256};
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use xtransfer_api::{
    AuctionClient, AuctionPolicy, AuctionRequestPayload, AuctionResponse, EventMux, IndexerEvent,
    IndexerGate, MessageBus, METATX_REQUEST_SUBJECT,
};
use xtransfer_chain::crypto::encode_bid;
use xtransfer_chain::{CancelParams, ChainGate, FulfillParams, InvariantTransactionData, PrepareParams, TxRequest};

use crate::config::META_TX_TIMEOUT;
use crate::error::{Result, TransferError};
use crate::types::{CancelRequest, PrepareEvent, QuoteParams};
use crate::validation;

/// Fetches a user's call-data encryption key and performs the encryption
/// spec.md §4.6 step 4 delegates to the wallet (an external collaborator
/// per spec.md §1, named here only by interface).
#[async_trait]
pub trait CallDataEncryptor: Send + Sync {
    async fn encrypt(&self, user: Address, call_data: &[u8]) -> anyhow::Result<Bytes>;
}

/// Passthrough encryptor for tests and the demo binary: returns the call
/// data unchanged. A real wallet integration replaces this.
pub struct NoopEncryptor;

#[async_trait]
impl CallDataEncryptor for NoopEncryptor {
    async fn encrypt(&self, _user: Address, call_data: &[u8]) -> anyhow::Result<Bytes> {
        Ok(Bytes::copy_from_slice(call_data))
    }
}

/// Result of `fulfill_transfer` (spec.md §4.6): either a directly
/// submittable request, or confirmation that a relayer fulfilled on our
/// behalf.
#[derive(Debug, Clone)]
pub enum FulfillOutcome {
    Direct(TxRequest),
    RelayedByMetaTx { transaction_id: B256 },
}

/// The end-to-end coordinator: quote → prepare → fulfill/cancel.
pub struct TransferOrchestrator {
    chain: Arc<ChainGate>,
    indexer: Arc<IndexerGate>,
    auction: AuctionClient,
    events: Arc<EventMux>,
    bus: Arc<dyn MessageBus>,
    encryptor: Arc<dyn CallDataEncryptor>,
    messaging_connected: AtomicBool,
}

impl TransferOrchestrator {
    pub fn new(
        chain: Arc<ChainGate>,
        indexer: Arc<IndexerGate>,
        bus: Arc<dyn MessageBus>,
        events: Arc<EventMux>,
        encryptor: Arc<dyn CallDataEncryptor>,
    ) -> Self {
        let auction = AuctionClient::new(Arc::clone(&bus), Arc::clone(&chain));
        Self { chain, indexer, auction, events, bus, encryptor, messaging_connected: AtomicBool::new(false) }
    }

    /// Connect the shared message bus if not already connected (spec.md
    /// §9, testable property 5: calling this twice is a no-op).
    #[instrument(skip(self))]
    pub async fn connect_messaging(&self) -> Result<()> {
        if self.messaging_connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.bus.connect().await.map_err(|e| TransferError::UnknownAuctionError(e.to_string()))?;
        self.messaging_connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_messaging_connected(&self) -> bool {
        self.messaging_connected.load(Ordering::SeqCst)
    }

    /// `getTransferQuote` (spec.md §4.6).
    #[instrument(skip(self, params))]
    pub async fn get_transfer_quote(&self, params: QuoteParams) -> Result<AuctionResponse> {
        validation::validate_quote_params(&params)?;

        for chain_id in [params.sending_chain_id, params.receiving_chain_id] {
            if !self.chain.is_configured(chain_id) {
                return Err(TransferError::ChainNotConfigured(chain_id));
            }
        }

        let mut unsynced = Vec::new();
        for chain_id in [params.sending_chain_id, params.receiving_chain_id] {
            if !self.indexer.sync_status(chain_id).await.synced {
                unsynced.push(chain_id);
            }
        }
        if !unsynced.is_empty() {
            return Err(TransferError::SubgraphsNotSynced(unsynced));
        }

        let stripped = params.call_data.strip_prefix("0x").unwrap_or(&params.call_data);
        let call_data_bytes = hex::decode(stripped)
            .map_err(|e| TransferError::InvalidParamStructure { path: "callData".to_string(), msg: e.to_string() })?;
        let call_data_hash = keccak256(&call_data_bytes);
        let encrypted_call_data = if call_data_bytes.is_empty() {
            Bytes::new()
        } else {
            self.encryptor
                .encrypt(params.user, &call_data_bytes)
                .await
                .map_err(|e| TransferError::EncryptionError(e.to_string()))?
        };

        self.connect_messaging().await?;

        let payload = AuctionRequestPayload {
            user: params.user,
            initiator: params.initiator,
            sending_chain_id: params.sending_chain_id,
            sending_asset_id: params.sending_asset_id,
            amount: params.amount,
            receiving_chain_id: params.receiving_chain_id,
            receiving_asset_id: params.receiving_asset_id,
            receiving_address: params.receiving_address,
            slippage_tolerance: params.slippage_tolerance.clone(),
            expiry: params.expiry,
            dry_run: params.dry_run,
            call_data_hash,
            call_to: params.call_to,
            encrypted_call_data,
        };

        let policy = if params.dry_run {
            AuctionPolicy::DryRun
        } else if let Some(preferred) = params.preferred_routers {
            AuctionPolicy::PreferredRouters(preferred)
        } else {
            AuctionPolicy::OpenAuction
        };

        let response = self.auction.run_auction(payload, &params.slippage_tolerance, policy).await?;
        info!(router = %response.bid.router, amount_received = %response.bid.amount_received, "quote resolved");
        Ok(response)
    }

    /// `approveForPrepare`: passthrough to `ChainGate.approveIfNeeded`,
    /// no-op for the native asset.
    #[instrument(skip(self, response))]
    pub async fn approve_for_prepare(&self, response: &AuctionResponse, infinite: bool) -> Result<Option<TxRequest>> {
        let bid = &response.bid;
        Ok(self
            .chain
            .approve_if_needed(bid.sending_chain_id, bid.user, bid.sending_asset_id, bid.amount, infinite)
            .await?)
    }

    /// `prepareTransfer` (spec.md §4.6).
    #[instrument(skip(self, response))]
    pub async fn prepare_transfer(&self, response: &AuctionResponse) -> Result<TxRequest> {
        validation::validate_auction_bid(&response.bid)?;
        for chain_id in [response.bid.sending_chain_id, response.bid.receiving_chain_id] {
            if !self.chain.is_configured(chain_id) {
                return Err(TransferError::ChainNotConfigured(chain_id));
            }
        }

        let mut unsynced = Vec::new();
        for chain_id in [response.bid.sending_chain_id, response.bid.receiving_chain_id] {
            if !self.indexer.sync_status(chain_id).await.synced {
                unsynced.push(chain_id);
            }
        }
        if !unsynced.is_empty() {
            return Err(TransferError::SubgraphsNotSynced(unsynced));
        }

        if response.bid_signature.is_empty() {
            return Err(TransferError::InvalidBidSignature);
        }

        let bid = &response.bid;
        if bid.call_to != self.chain.native_asset() {
            let is_contract = self.chain.is_contract(bid.receiving_chain_id, bid.call_to).await?;
            if !is_contract {
                return Err(TransferError::InvalidCallTo(bid.call_to, bid.receiving_chain_id));
            }
        }

        let receiving_chain_tx_manager_address = self.chain.tx_manager_address(bid.receiving_chain_id)?;
        let tx_data = InvariantTransactionData {
            receiving_chain_tx_manager_address,
            user: bid.user,
            router: bid.router,
            initiator: bid.initiator,
            sending_asset_id: bid.sending_asset_id,
            receiving_asset_id: bid.receiving_asset_id,
            sending_chain_fallback: bid.user,
            call_to: bid.call_to,
            receiving_address: bid.receiving_address,
            sending_chain_id: bid.sending_chain_id,
            receiving_chain_id: bid.receiving_chain_id,
            call_data_hash: bid.call_data_hash,
            transaction_id: bid.transaction_id,
        };

        let params = PrepareParams {
            tx_data,
            amount: bid.amount,
            expiry: bid.expiry,
            encrypted_call_data: bid.encrypted_call_data.clone(),
            bid_signature: response.bid_signature.clone(),
            encoded_bid: Bytes::from(encode_bid(&bid.to_bid_fields())),
        };

        Ok(self.chain.prepare_prepare_request(bid.sending_chain_id, &params)?)
    }

    /// `fulfillTransfer` (spec.md §4.6). `use_relayers=true` publishes a
    /// meta-tx request and waits (concurrently) for the indexer's
    /// `ReceiverTransactionFulfilled` event, up to `META_TX_TIMEOUT`.
    #[instrument(skip(self, fulfill_signature, decrypted_call_data))]
    pub async fn fulfill_transfer(
        &self,
        event: &PrepareEvent,
        fulfill_signature: Bytes,
        decrypted_call_data: Bytes,
        relayer_fee: U256,
        use_relayers: bool,
    ) -> Result<FulfillOutcome> {
        validation::validate_prepare_event(event)?;

        let params = FulfillParams {
            tx_data: event.tx_data.clone(),
            amount: event.amount,
            relayer_fee,
            signature: fulfill_signature,
            call_data: decrypted_call_data,
        };

        if !use_relayers {
            let tx = self.chain.prepare_fulfill_request(event.tx_data.receiving_chain_id, &params)?;
            return Ok(FulfillOutcome::Direct(tx));
        }

        let tx = self.chain.prepare_fulfill_request(event.tx_data.receiving_chain_id, &params)?;
        let wire = xtransfer_api::MetaTxRequestWire {
            kind: "Fulfill".to_string(),
            relayer_fee,
            to: tx.to,
            chain_id: tx.chain_id,
            data: tx.data,
        };
        let body = serde_json::to_vec(&wire)
            .map_err(|e| TransferError::UnknownAuctionError(e.to_string()))?;

        let transaction_id = event.transaction_id;
        let wait_fut = self.events.wait_for(IndexerEvent::ReceiverTransactionFulfilled, META_TX_TIMEOUT, move |payload| {
            payload_transaction_id(payload) == Some(transaction_id)
        });
        let publish_fut = self.bus.publish(METATX_REQUEST_SUBJECT, body);

        let (fulfilled, published) = tokio::join!(wait_fut, publish_fut);
        published.map_err(|e| TransferError::UnknownAuctionError(e.to_string()))?;

        match fulfilled {
            Some(_) => Ok(FulfillOutcome::RelayedByMetaTx { transaction_id }),
            None => Err(TransferError::MetaTxTimeout),
        }
    }

    /// `cancel` (spec.md §4.6).
    #[instrument(skip(self, cancel))]
    pub async fn cancel(&self, cancel: &CancelRequest, chain_id: ChainId) -> Result<TxRequest> {
        validation::validate_cancel(cancel)?;
        if !self.chain.is_configured(chain_id) {
            return Err(TransferError::ChainNotConfigured(chain_id));
        }
        let params = CancelParams {
            tx_data: cancel.tx_data.clone(),
            amount: cancel.amount,
            relayer_fee: cancel.relayer_fee,
            signature: cancel.signature.clone(),
        };
        Ok(self.chain.prepare_cancel_request(chain_id, &params)?)
    }

    /// `estimateFulfillFee`: zero from `ChainGate` is a soft failure the
    /// caller turns into `InvalidParamStructure` (spec.md §4.6).
    #[instrument(skip(self, signature))]
    pub async fn estimate_fulfill_fee(
        &self,
        tx_data: &InvariantTransactionData,
        signature: Bytes,
        relayer_fee: U256,
    ) -> Result<U256> {
        let params = FulfillParams {
            tx_data: tx_data.clone(),
            amount: U256::ZERO,
            relayer_fee,
            signature,
            call_data: Bytes::new(),
        };
        let fee = self.chain.calculate_gas_in_token_for_fulfill(tx_data.receiving_chain_id, &params).await;
        if fee.is_zero() {
            warn!(chain_id = tx_data.receiving_chain_id, "fulfill fee estimate came back zero");
            return Err(TransferError::InvalidParamStructure {
                path: "estimateFulfillFee".to_string(),
                msg: "chain gate returned a zero fee estimate".to_string(),
            });
        }
        Ok(fee)
    }
}

fn payload_transaction_id(payload: &serde_json::Value) -> Option<B256> {
    let s = payload.get("transactionId")?.as_str()?;
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped).ok()?;
    B256::try_from(bytes.as_slice()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtransfer_api::{AuctionBid, LocalBus};
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

    fn orchestrator() -> TransferOrchestrator {
        let bus: Arc<dyn MessageBus> = Arc::new(LocalBus::new());
        TransferOrchestrator::new(gate(), Arc::new(IndexerGate::new(vec![])), bus, Arc::new(EventMux::new()), Arc::new(NoopEncryptor))
    }

    fn sample_bid() -> AuctionBid {
        AuctionBid {
            user: Address::repeat_byte(1),
            router: Address::repeat_byte(2),
            initiator: Address::repeat_byte(1),
            sending_chain_id: 1,
            sending_asset_id: Address::ZERO,
            amount: U256::from(1000u64),
            receiving_chain_id: 137,
            receiving_asset_id: Address::ZERO,
            amount_received: U256::from(990u64),
            receiving_address: Address::repeat_byte(2),
            transaction_id: B256::repeat_byte(9),
            expiry: 1_900_000_000,
            call_data_hash: keccak256([]),
            call_to: Address::ZERO,
            encrypted_call_data: Bytes::new(),
            bid_expiry: 1_900_000_000,
        }
    }

    fn sample_quote() -> QuoteParams {
        QuoteParams {
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
            dry_run: true,
            preferred_routers: None,
            call_data: "0x".to_string(),
            call_to: Address::ZERO,
        }
    }

    #[tokio::test]
    async fn connect_messaging_is_idempotent() {
        let orchestrator = orchestrator();
        assert!(!orchestrator.is_messaging_connected());
        orchestrator.connect_messaging().await.unwrap();
        orchestrator.connect_messaging().await.unwrap();
        assert!(orchestrator.is_messaging_connected());
    }

    #[tokio::test]
    async fn quote_rejects_an_unconfigured_chain() {
        let orchestrator = orchestrator();
        let params = QuoteParams { receiving_chain_id: 999_999, ..sample_quote() };
        let err = orchestrator.get_transfer_quote(params).await.unwrap_err();
        assert!(matches!(err, TransferError::ChainNotConfigured(999_999)));
    }

    #[tokio::test]
    async fn quote_rejects_a_malformed_slippage_before_any_io() {
        let orchestrator = orchestrator();
        let params = QuoteParams { slippage_tolerance: "99".to_string(), ..sample_quote() };
        let err = orchestrator.get_transfer_quote(params).await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidSlippage(_)));
    }

    #[tokio::test]
    async fn prepare_rejects_when_subgraphs_not_synced() {
        let orchestrator = orchestrator();
        let response = AuctionResponse {
            bid: sample_bid(),
            bid_signature: Bytes::from_static(&[1u8; 65]),
            gas_fee_in_receiving_token: U256::ZERO,
        };
        let err = orchestrator.prepare_transfer(&response).await.unwrap_err();
        assert!(matches!(err, TransferError::SubgraphsNotSynced(chains) if chains == vec![1, 137]));
    }

    // The remaining `prepareTransfer` branches (missing signature, invalid
    // `callTo`, successful request construction) sit behind the "both
    // chains synced" gate (spec.md §4.6 step 1), which only resolves
    // `true` against a real subgraph endpoint — not exercised in the
    // default suite.

    #[tokio::test]
    #[ignore = "requires synced subgraphs for both chains"]
    async fn prepare_rejects_a_missing_bid_signature() {
        let orchestrator = orchestrator();
        let response = AuctionResponse { bid: sample_bid(), bid_signature: Bytes::new(), gas_fee_in_receiving_token: U256::ZERO };
        let err = orchestrator.prepare_transfer(&response).await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidBidSignature));
    }

    #[tokio::test]
    #[ignore = "requires a live chain RPC for the is_contract check and synced subgraphs"]
    async fn prepare_rejects_a_noncontract_call_to() {
        let orchestrator = orchestrator();
        let mut bid = sample_bid();
        bid.call_to = Address::repeat_byte(0x44);
        let response = AuctionResponse { bid, bid_signature: Bytes::from_static(&[1u8; 65]), gas_fee_in_receiving_token: U256::ZERO };
        let err = orchestrator.prepare_transfer(&response).await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidCallTo(_, 137)));
    }

    #[tokio::test]
    #[ignore = "requires synced subgraphs for both chains"]
    async fn prepare_builds_a_request_whose_invariant_data_satisfies_testable_property_4() {
        let orchestrator = orchestrator();
        let response = AuctionResponse { bid: sample_bid(), bid_signature: Bytes::from_static(&[1u8; 65]), gas_fee_in_receiving_token: U256::ZERO };
        let tx = orchestrator.prepare_transfer(&response).await.unwrap();
        assert_eq!(tx.chain_id, 1);
        assert_eq!(tx.to, Address::repeat_byte(0xAB));
    }

    #[tokio::test]
    async fn approve_for_prepare_is_a_no_op_for_the_native_asset() {
        let orchestrator = orchestrator();
        let response = AuctionResponse { bid: sample_bid(), bid_signature: Bytes::from_static(&[1u8; 65]), gas_fee_in_receiving_token: U256::ZERO };
        let approval = orchestrator.approve_for_prepare(&response, false).await.unwrap();
        assert!(approval.is_none());
    }

    #[tokio::test]
    async fn cancel_rejects_an_unconfigured_chain() {
        let orchestrator = orchestrator();
        let bid = sample_bid();
        let cancel = CancelRequest {
            tx_data: InvariantTransactionData {
                receiving_chain_tx_manager_address: Address::repeat_byte(0xEF),
                user: bid.user,
                router: bid.router,
                initiator: bid.initiator,
                sending_asset_id: bid.sending_asset_id,
                receiving_asset_id: bid.receiving_asset_id,
                sending_chain_fallback: bid.user,
                call_to: bid.call_to,
                receiving_address: bid.receiving_address,
                sending_chain_id: bid.sending_chain_id,
                receiving_chain_id: bid.receiving_chain_id,
                call_data_hash: bid.call_data_hash,
                transaction_id: bid.transaction_id,
            },
            amount: U256::from(1u64),
            relayer_fee: U256::ZERO,
            signature: Bytes::new(),
        };
        let err = orchestrator.cancel(&cancel, 999_999).await.unwrap_err();
        assert!(matches!(err, TransferError::ChainNotConfigured(999_999)));
    }

    #[tokio::test]
    async fn fulfill_transfer_times_out_without_a_matching_indexer_event() {
        let bus: Arc<dyn MessageBus> = Arc::new(LocalBus::new());
        bus.connect().await.unwrap();
        let orchestrator = TransferOrchestrator::new(
            gate(),
            Arc::new(IndexerGate::new(vec![])),
            bus,
            Arc::new(EventMux::new()),
            Arc::new(NoopEncryptor),
        );

        let bid = sample_bid();
        let event = PrepareEvent {
            transaction_id: bid.transaction_id,
            tx_data: InvariantTransactionData {
                receiving_chain_tx_manager_address: Address::repeat_byte(0xEF),
                user: bid.user,
                router: bid.router,
                initiator: bid.initiator,
                sending_asset_id: bid.sending_asset_id,
                receiving_asset_id: bid.receiving_asset_id,
                sending_chain_fallback: bid.user,
                call_to: bid.call_to,
                receiving_address: bid.receiving_address,
                sending_chain_id: bid.sending_chain_id,
                receiving_chain_id: bid.receiving_chain_id,
                call_data_hash: bid.call_data_hash,
                transaction_id: bid.transaction_id,
            },
            amount: U256::from(1u64),
            caller: bid.user,
        };

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            orchestrator.fulfill_transfer(&event, Bytes::from_static(&[1u8; 65]), Bytes::new(), U256::ZERO, false),
        )
        .await
        .unwrap();

        assert!(matches!(result, Ok(FulfillOutcome::Direct(_))));
    }
}
