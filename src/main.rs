//! Cross-chain transfer SDK demo
//!
//! Wires up a `TransferOrchestrator` from environment configuration and
//! runs a single quote against whatever chains/messaging endpoint are
//! reachable. Intended as a runnable example of the SDK's wiring, not a
//! production client.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use xtransfer_api::{EventMux, LocalBus, MessageBus};
use xtransfer_core::{
    ChainConfigEntry, GasConfig, Network, NoopEncryptor, QuoteParams, SdkConfig, TransferOrchestrator,
};

/// Environment variable names.
mod env {
    pub const NETWORK: &str = "XTRANSFER_NETWORK";
    pub const SENDING_CHAIN_ID: &str = "XTRANSFER_SENDING_CHAIN_ID";
    pub const SENDING_RPC_URL: &str = "XTRANSFER_SENDING_RPC_URL";
    pub const RECEIVING_CHAIN_ID: &str = "XTRANSFER_RECEIVING_CHAIN_ID";
    pub const RECEIVING_RPC_URL: &str = "XTRANSFER_RECEIVING_RPC_URL";
    pub const USER: &str = "XTRANSFER_USER";
    pub const AMOUNT: &str = "XTRANSFER_AMOUNT";
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,xtransfer_core=debug")))
        .init();

    info!("Starting cross-chain transfer demo");

    let mut config = load_config()?;
    config.expand_env_vars();

    let chain_gate = Arc::new(config.build_chain_gate().context("building ChainGate from config")?);
    let indexer_gate = Arc::new(config.build_indexer_gate());
    let bus: Arc<dyn MessageBus> = Arc::new(LocalBus::new());
    let events = Arc::new(EventMux::new());

    let orchestrator = TransferOrchestrator::new(chain_gate, indexer_gate, bus, events, Arc::new(NoopEncryptor));
    orchestrator.connect_messaging().await?;
    info!("Messaging connected");

    let params = quote_params_from_env()?;
    info!(
        sending_chain_id = params.sending_chain_id,
        receiving_chain_id = params.receiving_chain_id,
        amount = %params.amount,
        "Requesting quote"
    );

    let quote = orchestrator.get_transfer_quote(params).await?;
    info!(
        router = %quote.bid.router,
        amount_received = %quote.bid.amount_received,
        "Quote resolved"
    );

    Ok(())
}

fn load_config() -> Result<SdkConfig> {
    let network = match std::env::var(env::NETWORK).as_deref() {
        Ok("mainnet") => Network::Mainnet,
        Ok("testnet") => Network::Testnet,
        _ => Network::Local,
    };

    let sending_chain_id: u64 = get_env(env::SENDING_CHAIN_ID)?.parse().context("parsing sending chain id")?;
    let receiving_chain_id: u64 = get_env(env::RECEIVING_CHAIN_ID)?.parse().context("parsing receiving chain id")?;

    let chains = vec![
        ChainConfigEntry {
            chain_id: sending_chain_id,
            rpc_url: get_env(env::SENDING_RPC_URL)?,
            transaction_manager: None,
            price_oracle: None,
            subgraph_url: None,
            subgraph_sync_buffer: 25,
            default_gas_limit: 500_000,
            gas: GasConfig::default(),
        },
        ChainConfigEntry {
            chain_id: receiving_chain_id,
            rpc_url: get_env(env::RECEIVING_RPC_URL)?,
            transaction_manager: None,
            price_oracle: None,
            subgraph_url: None,
            subgraph_sync_buffer: 25,
            default_gas_limit: 500_000,
            gas: GasConfig::default(),
        },
    ];

    Ok(SdkConfig::new(network, chains))
}

fn quote_params_from_env() -> Result<QuoteParams> {
    let user: alloy::primitives::Address = get_env(env::USER)?.parse().context("parsing user address")?;
    let sending_chain_id: u64 = get_env(env::SENDING_CHAIN_ID)?.parse()?;
    let receiving_chain_id: u64 = get_env(env::RECEIVING_CHAIN_ID)?.parse()?;
    let amount: alloy::primitives::U256 = get_env(env::AMOUNT)?.parse().context("parsing amount")?;

    Ok(QuoteParams {
        user,
        initiator: user,
        sending_chain_id,
        sending_asset_id: alloy::primitives::Address::ZERO,
        amount,
        receiving_chain_id,
        receiving_asset_id: alloy::primitives::Address::ZERO,
        receiving_address: user,
        slippage_tolerance: "0.10".to_string(),
        expiry: None,
        dry_run: true,
        preferred_routers: None,
        call_data: "0x".to_string(),
        call_to: alloy::primitives::Address::ZERO,
    })
}

fn get_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("Missing env var: {}", name))
}

fn print_banner() {
    println!(
        r#"
    ═╗ ╦╔╦╗╦═╗╔═╗╔╗╔╔═╗╔═╗╔═╗╦═╗
    ╔╩╦╝ ║ ╠╦╝╠═╣║║║╚═╗╠╣ ║╣ ╠╦╝
    ╩ ╚═ ╩ ╩╚═╩ ╩╝╚╝╚═╝╚  ╚═╝╩╚═
    Cross-Chain Transfer SDK v0.1.0
    "#
    );
}
