//! `IndexerGate` (C4): subgraph freshness and transfer enumeration.
//!
//! Grounded on the teacher's `BlockAnaliticaClient` (`blockanalitica.rs`):
//! a thin `reqwest::Client` wrapper, one struct per endpoint shape, `?`
//! propagation through `anyhow::Result` at the HTTP boundary, and
//! `#[instrument]` + `debug!`/`info!` around each fetch.

use std::collections::HashMap;

use alloy::primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// `{synced, syncedBlock, latestBlock}` (spec.md §3). A chain is *stale*
/// when `latestBlock - syncedBlock > buffer`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SubgraphSyncRecord {
    pub synced: bool,
    pub synced_block: u64,
    pub latest_block: u64,
}

impl SubgraphSyncRecord {
    pub fn is_stale(&self, buffer: u64) -> bool {
        self.latest_block.saturating_sub(self.synced_block) > buffer
    }
}

/// A transfer the indexer has observed prepared on the sending chain but not
/// yet fulfilled or cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveTransaction {
    pub transaction_id: B256,
    pub user: Address,
    pub router: Address,
    pub sending_chain_id: u64,
    pub receiving_chain_id: u64,
    pub status: String,
}

/// A terminal (fulfilled/cancelled) transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalTransaction {
    pub transaction_id: B256,
    pub user: Address,
    pub router: Address,
    pub sending_chain_id: u64,
    pub receiving_chain_id: u64,
    pub status: String,
}

/// Per-chain subgraph endpoint and staleness tolerance.
#[derive(Debug, Clone)]
pub struct ChainIndexerConfig {
    pub chain_id: u64,
    pub subgraph_url: String,
    pub sync_buffer: u64,
}

#[derive(Debug, Clone)]
struct ChainEndpoint {
    url: String,
    sync_buffer: u64,
}

/// Subgraph freshness checks and transfer enumeration across all configured
/// chains.
#[derive(Debug, Clone)]
pub struct IndexerGate {
    client: reqwest::Client,
    chains: HashMap<u64, ChainEndpoint>,
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SyncStatusData {
    #[serde(rename = "syncStatus")]
    sync_status: SubgraphSyncRecord,
}

#[derive(Debug, Deserialize)]
struct ActiveTransactionsData {
    #[serde(rename = "activeTransactions")]
    active_transactions: Vec<ActiveTransaction>,
}

#[derive(Debug, Deserialize)]
struct HistoricalTransactionsData {
    #[serde(rename = "historicalTransactions")]
    historical_transactions: Vec<HistoricalTransaction>,
}

impl IndexerGate {
    pub fn new(entries: Vec<ChainIndexerConfig>) -> Self {
        let chains = entries
            .into_iter()
            .map(|e| (e.chain_id, ChainEndpoint { url: e.subgraph_url, sync_buffer: e.sync_buffer }))
            .collect();
        Self { client: reqwest::Client::new(), chains }
    }

    /// `syncStatus(chainId)`; default `{synced:false, 0, 0}` for an
    /// unconfigured chain or a failed request, matching spec.md §4.4.
    #[instrument(skip(self))]
    pub async fn sync_status(&self, chain_id: u64) -> SubgraphSyncRecord {
        let Some(endpoint) = self.chains.get(&chain_id) else {
            return SubgraphSyncRecord::default();
        };
        match self.query_sync_status(endpoint).await {
            Ok(mut record) => {
                record.synced = record.synced && !record.is_stale(endpoint.sync_buffer);
                record
            }
            Err(e) => {
                debug!(chain_id, error = %e, "subgraph sync status request failed");
                SubgraphSyncRecord::default()
            }
        }
    }

    async fn query_sync_status(&self, endpoint: &ChainEndpoint) -> Result<SubgraphSyncRecord> {
        let body = serde_json::json!({
            "query": "{ syncStatus { synced syncedBlock latestBlock } }"
        });
        let envelope: GraphQlEnvelope<SyncStatusData> = self
            .client
            .post(&endpoint.url)
            .json(&body)
            .send()
            .await
            .context("subgraph request failed")?
            .json()
            .await
            .context("subgraph response was not valid JSON")?;
        Ok(envelope.data.map(|d| d.sync_status).unwrap_or_default())
    }

    /// `activeTransactions()` across all configured chains.
    #[instrument(skip(self))]
    pub async fn active_transactions(&self) -> Vec<ActiveTransaction> {
        let mut all = Vec::new();
        for (chain_id, endpoint) in &self.chains {
            match self.query_active(endpoint).await {
                Ok(mut txs) => all.append(&mut txs),
                Err(e) => debug!(chain_id, error = %e, "active transactions request failed"),
            }
        }
        all
    }

    async fn query_active(&self, endpoint: &ChainEndpoint) -> Result<Vec<ActiveTransaction>> {
        let body = serde_json::json!({
            "query": "{ activeTransactions { transactionId user router sendingChainId receivingChainId status } }"
        });
        let envelope: GraphQlEnvelope<ActiveTransactionsData> =
            self.client.post(&endpoint.url).json(&body).send().await?.json().await?;
        Ok(envelope.data.map(|d| d.active_transactions).unwrap_or_default())
    }

    /// `historicalTransactions()` across all configured chains.
    #[instrument(skip(self))]
    pub async fn historical_transactions(&self) -> Vec<HistoricalTransaction> {
        let mut all = Vec::new();
        for (chain_id, endpoint) in &self.chains {
            match self.query_historical(endpoint).await {
                Ok(mut txs) => all.append(&mut txs),
                Err(e) => debug!(chain_id, error = %e, "historical transactions request failed"),
            }
        }
        all
    }

    async fn query_historical(&self, endpoint: &ChainEndpoint) -> Result<Vec<HistoricalTransaction>> {
        let body = serde_json::json!({
            "query": "{ historicalTransactions { transactionId user router sendingChainId receivingChainId status } }"
        });
        let envelope: GraphQlEnvelope<HistoricalTransactionsData> =
            self.client.post(&endpoint.url).json(&body).send().await?.json().await?;
        Ok(envelope.data.map(|d| d.historical_transactions).unwrap_or_default())
    }
}
