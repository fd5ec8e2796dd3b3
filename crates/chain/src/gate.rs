//! `ChainGate` (C3): thin read/write port over configured chains.
//!
//! Grounded on the teacher's `ProviderManager`/`TransactionSender`: a
//! provider is built fresh per call from a stored RPC URL (matching
//! `crates/chain/src/provider.rs`'s `ProviderBuilder::new().on_http(...)`
//! pattern) rather than held open, and every read returns a `Result`
//! rather than panicking on transport failure.

use std::collections::HashMap;

use alloy::primitives::{Address, ChainId, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::sol_types::SolCall;
use tracing::{debug, instrument, warn};

use crate::contracts::{IERC20, IPriceOracle, ITransactionManager, InvariantTransactionDataSol};
use crate::error::{ChainError, Result};
use crate::registry;
use crate::types::{CancelParams, FulfillParams, GasFees, PrepareParams, TxRequest};

/// Per-chain configuration supplied by the caller. Unset addresses are
/// resolved from the bundled [`registry`].
#[derive(Debug, Clone)]
pub struct ChainEntryConfig {
    pub chain_id: ChainId,
    pub rpc_url: String,
    pub transaction_manager: Option<Address>,
    pub price_oracle: Option<Address>,
    /// Gas limit used when estimation is skipped (kept simple/explicit,
    /// matching the teacher's pre-computed `DEFAULT_LIQUIDATION_GAS_LIMIT`).
    pub default_gas_limit: u64,
    pub gas: GasFees,
}

#[derive(Debug, Clone)]
struct ResolvedChain {
    rpc_url: String,
    transaction_manager: Address,
    price_oracle: Address,
    default_gas_limit: u64,
    gas: GasFees,
}

/// Thin read/write port over one or more chains.
#[derive(Debug)]
pub struct ChainGate {
    chains: HashMap<ChainId, ResolvedChain>,
}

impl ChainGate {
    /// Resolve and store configuration for every chain. Fails fast if an
    /// address is neither explicitly configured nor present in the
    /// bundled registry (spec.md §6).
    pub fn new(entries: Vec<ChainEntryConfig>) -> Result<Self> {
        let mut chains = HashMap::with_capacity(entries.len());

        for entry in entries {
            let registry_entry = registry::lookup(entry.chain_id);

            let transaction_manager = entry
                .transaction_manager
                .or_else(|| registry_entry.map(|e| e.transaction_manager))
                .ok_or(ChainError::NoTransactionManager(entry.chain_id))?;

            let price_oracle = entry
                .price_oracle
                .or_else(|| registry_entry.map(|e| e.price_oracle))
                .ok_or(ChainError::NoPriceOracle(entry.chain_id))?;

            chains.insert(
                entry.chain_id,
                ResolvedChain {
                    rpc_url: entry.rpc_url,
                    transaction_manager,
                    price_oracle,
                    default_gas_limit: entry.default_gas_limit,
                    gas: entry.gas,
                },
            );
        }

        Ok(Self { chains })
    }

    fn resolved(&self, chain_id: ChainId) -> Result<&ResolvedChain> {
        self.chains
            .get(&chain_id)
            .ok_or(ChainError::ChainNotConfigured(chain_id))
    }

    pub fn is_configured(&self, chain_id: ChainId) -> bool {
        self.chains.contains_key(&chain_id)
    }

    /// Native asset sentinel (the zero address), used for `approveIfNeeded`'s
    /// no-op path and amount accounting in `prepareTransfer`.
    pub fn native_asset(&self) -> Address {
        Address::ZERO
    }

    /// `transactionManagerAddress` accessor.
    pub fn tx_manager_address(&self, chain_id: ChainId) -> Result<Address> {
        Ok(self.resolved(chain_id)?.transaction_manager)
    }

    fn provider_for(
        &self,
        chain_id: ChainId,
    ) -> Result<(impl Provider + Clone, &ResolvedChain)> {
        let resolved = self.resolved(chain_id)?;
        let provider = ProviderBuilder::new()
            .on_http(resolved.rpc_url.parse().map_err(|e| ChainError::Rpc(anyhow::anyhow!("{e}")))?);
        Ok((provider, resolved))
    }

    /// Code-at-address check, used by `prepareTransfer` to validate
    /// `callTo` when it is not the zero address.
    #[instrument(skip(self))]
    pub async fn is_contract(&self, chain_id: ChainId, address: Address) -> Result<bool> {
        let (provider, _) = self.provider_for(chain_id)?;
        let code = provider
            .get_code_at(address)
            .await
            .map_err(|e| ChainError::Rpc(anyhow::anyhow!(e)))?;
        Ok(!code.is_empty())
    }

    /// Router liquidity for an asset on the receiving chain, read from
    /// the transaction manager's internal router balance ledger.
    #[instrument(skip(self))]
    pub async fn router_liquidity(
        &self,
        chain_id: ChainId,
        router: Address,
        asset: Address,
    ) -> Result<U256> {
        let (provider, resolved) = self.provider_for(chain_id)?;
        let contract = ITransactionManager::new(resolved.transaction_manager, &provider);
        let balance = contract
            .routerBalances(router, asset)
            .call()
            .await
            .map_err(|e| ChainError::Rpc(anyhow::anyhow!(e)))?;
        Ok(balance._0)
    }

    /// Returns `Some(TxRequest)` for an ERC-20 approval if the current
    /// allowance is insufficient, `None` if the asset is native or the
    /// allowance already covers `amount`.
    #[instrument(skip(self))]
    pub async fn approve_if_needed(
        &self,
        chain_id: ChainId,
        owner: Address,
        asset: Address,
        amount: U256,
        infinite: bool,
    ) -> Result<Option<TxRequest>> {
        if asset == self.native_asset() {
            return Ok(None);
        }

        let (provider, resolved) = self.provider_for(chain_id)?;
        let spender = resolved.transaction_manager;
        let contract = IERC20::new(asset, &provider);

        let current = contract
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| ChainError::Rpc(anyhow::anyhow!(e)))?
            ._0;

        if current >= amount {
            debug!(asset = %asset, current = %current, "allowance sufficient");
            return Ok(None);
        }

        let approve_amount = if infinite { U256::MAX } else { amount };
        let data = IERC20::approveCall { spender, amount: approve_amount }.abi_encode();

        Ok(Some(TxRequest {
            chain_id,
            to: asset,
            data: data.into(),
            value: U256::ZERO,
            gas_limit: 60_000,
            gas: resolved.gas,
        }))
    }

    #[instrument(skip(self, params))]
    pub fn prepare_prepare_request(&self, chain_id: ChainId, params: &PrepareParams) -> Result<TxRequest> {
        let resolved = self.resolved(chain_id)?;
        let invariant: InvariantTransactionDataSol = (&params.tx_data).into();
        let data = ITransactionManager::prepareCall {
            invariantData: invariant,
            amount: params.amount,
            expiry: U256::from(params.expiry),
            encryptedCallData: params.encrypted_call_data.clone(),
            encodedBid: params.encoded_bid.clone(),
            bidSignature: params.bid_signature.clone(),
        }
        .abi_encode();

        let value = if params.tx_data.sending_asset_id == self.native_asset() {
            params.amount
        } else {
            U256::ZERO
        };

        Ok(TxRequest {
            chain_id,
            to: resolved.transaction_manager,
            data: data.into(),
            value,
            gas_limit: resolved.default_gas_limit,
            gas: resolved.gas,
        })
    }

    #[instrument(skip(self, params))]
    pub fn prepare_fulfill_request(&self, chain_id: ChainId, params: &FulfillParams) -> Result<TxRequest> {
        let resolved = self.resolved(chain_id)?;
        let invariant: InvariantTransactionDataSol = (&params.tx_data).into();
        let data = ITransactionManager::fulfillCall {
            invariantData: invariant,
            amount: params.amount,
            relayerFee: params.relayer_fee,
            signature: params.signature.clone(),
            callData: params.call_data.clone(),
        }
        .abi_encode();

        Ok(TxRequest {
            chain_id,
            to: resolved.transaction_manager,
            data: data.into(),
            value: U256::ZERO,
            gas_limit: resolved.default_gas_limit,
            gas: resolved.gas,
        })
    }

    #[instrument(skip(self, params))]
    pub fn prepare_cancel_request(&self, chain_id: ChainId, params: &CancelParams) -> Result<TxRequest> {
        let resolved = self.resolved(chain_id)?;
        let invariant: InvariantTransactionDataSol = (&params.tx_data).into();
        let data = ITransactionManager::cancelCall {
            invariantData: invariant,
            amount: params.amount,
            relayerFee: params.relayer_fee,
            signature: params.signature.clone(),
        }
        .abi_encode();

        Ok(TxRequest {
            chain_id,
            to: resolved.transaction_manager,
            data: data.into(),
            value: U256::ZERO,
            gas_limit: resolved.default_gas_limit,
            gas: resolved.gas,
        })
    }

    /// Converts the estimated gas cost of a `fulfill` call into the
    /// receiving asset's units via the chain's price oracle. Returns zero
    /// on any failure rather than raising — per spec.md §7 this is a
    /// "soft" signal the caller (`estimateFulfillFee`) turns into
    /// `InvalidParamStructure`.
    #[instrument(skip(self, params))]
    pub async fn calculate_gas_in_token_for_fulfill(
        &self,
        chain_id: ChainId,
        params: &FulfillParams,
    ) -> U256 {
        let Ok((provider, resolved)) = self.provider_for(chain_id) else {
            return U256::ZERO;
        };

        let Ok(gas_price) = provider.get_gas_price().await else {
            warn!(chain_id, "failed to fetch gas price for fulfill estimate");
            return U256::ZERO;
        };

        let contract = IPriceOracle::new(resolved.price_oracle, &provider);
        let Ok(price) = contract
            .getTokenPrice(params.tx_data.receiving_asset_id)
            .call()
            .await
        else {
            warn!(chain_id, "failed to read price oracle for fulfill estimate");
            return U256::ZERO;
        };

        // gas_cost_wei * token_price / 1e18, matching the 18-decimal fixed
        // point convention price oracles typically return.
        let gas_cost_wei = U256::from(resolved.default_gas_limit) * U256::from(gas_price);
        (gas_cost_wei * price._0) / U256::from(10u64).pow(U256::from(18u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;

    fn sample_config(chain_id: ChainId) -> ChainEntryConfig {
        ChainEntryConfig {
            chain_id,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            transaction_manager: Some(Address::repeat_byte(0xAB)),
            price_oracle: Some(Address::repeat_byte(0xCD)),
            default_gas_limit: 500_000,
            gas: GasFees::Legacy { gas_price: 1_000_000_000 },
        }
    }

    #[test]
    fn rejects_unknown_chain_without_registry_entry() {
        let entry = ChainEntryConfig {
            transaction_manager: None,
            price_oracle: None,
            ..sample_config(999_999)
        };
        let err = ChainGate::new(vec![entry]).unwrap_err();
        assert!(matches!(err, ChainError::NoTransactionManager(_)));
    }

    #[test]
    fn resolves_address_from_bundled_registry_when_unset() {
        let entry = ChainEntryConfig { transaction_manager: None, price_oracle: None, ..sample_config(1) };
        let gate = ChainGate::new(vec![entry]).unwrap();
        assert!(gate.is_configured(1));
    }

    #[test]
    fn unconfigured_chain_is_reported() {
        let gate = ChainGate::new(vec![sample_config(1)]).unwrap();
        assert!(!gate.is_configured(137));
    }

    #[test]
    fn prepare_request_attaches_native_value_only_for_native_asset() {
        let gate = ChainGate::new(vec![sample_config(1)]).unwrap();
        let tx_data = crate::types::InvariantTransactionData {
            receiving_chain_tx_manager_address: Address::repeat_byte(1),
            user: Address::repeat_byte(2),
            router: Address::repeat_byte(3),
            initiator: Address::repeat_byte(2),
            sending_asset_id: gate.native_asset(),
            receiving_asset_id: Address::repeat_byte(4),
            sending_chain_fallback: Address::repeat_byte(2),
            call_to: Address::ZERO,
            receiving_address: Address::repeat_byte(5),
            sending_chain_id: 1,
            receiving_chain_id: 137,
            call_data_hash: alloy::primitives::keccak256([]),
            transaction_id: alloy::primitives::B256::repeat_byte(9),
        };
        let params = PrepareParams {
            tx_data,
            amount: U256::from(42u64),
            expiry: 1_900_000_000,
            encrypted_call_data: Bytes::new(),
            bid_signature: Bytes::new(),
            encoded_bid: Bytes::new(),
        };
        let tx = gate.prepare_prepare_request(1, &params).unwrap();
        assert_eq!(tx.value, U256::from(42u64));
    }
}
