//! `ValidationKit` (C1): schema validation, expiry/slippage bounds, address
//! normalization. Pure predicates — no I/O, no RPC (spec.md §4.1).

use std::str::FromStr;

use alloy::primitives::Address;
use chrono::Utc;

use crate::error::TransferError;
use crate::types::{CancelRequest, PrepareEvent, QuoteParams};

/// Lower/upper slippage tolerance bounds, inclusive, as percent strings.
const MIN_SLIPPAGE_PERCENT: f64 = 0.01;
const MAX_SLIPPAGE_PERCENT: f64 = 15.00;

/// `now + 2d1h` / `now + 4d`, the valid window for a quote's `expiry`.
const MIN_EXPIRY_BUFFER_SECS: i64 = 2 * 24 * 3600 + 3600;
const MAX_EXPIRY_BUFFER_SECS: i64 = 4 * 24 * 3600;

/// Parse and checksum an address, rejecting malformed input.
pub fn validate_address(path: &str, s: &str) -> Result<Address, TransferError> {
    Address::from_str(s).map_err(|e| TransferError::InvalidParamStructure {
        path: path.to_string(),
        msg: format!("not a valid address: {e}"),
    })
}

/// EIP-55 checksum form of an address.
pub fn normalize_address(address: Address) -> String {
    address.to_checksum(None)
}

/// `slippageTolerance` must parse as a percent with at most two fractional
/// digits and lie within `[0.01, 15.00]` inclusive.
pub fn validate_slippage(slippage_tolerance: &str) -> Result<(), TransferError> {
    let value: f64 = slippage_tolerance
        .parse()
        .map_err(|_| TransferError::InvalidSlippage(slippage_tolerance.to_string()))?;
    if !(MIN_SLIPPAGE_PERCENT..=MAX_SLIPPAGE_PERCENT).contains(&value) {
        return Err(TransferError::InvalidSlippage(slippage_tolerance.to_string()));
    }
    Ok(())
}

/// An `expiry` (unix seconds), if supplied, must be at least `now + 2d1h`
/// and at most `now + 4d` away (spec.md §4.1, scenario S6).
pub fn validate_expiry(expiry: Option<u64>) -> Result<(), TransferError> {
    let Some(expiry) = expiry else { return Ok(()) };
    let now = Utc::now().timestamp();
    let expiry = expiry as i64;
    let delta = expiry - now;
    if !(MIN_EXPIRY_BUFFER_SECS..=MAX_EXPIRY_BUFFER_SECS).contains(&delta) {
        return Err(TransferError::InvalidExpiry(format!(
            "expiry {expiry} is {delta}s from now, outside [{MIN_EXPIRY_BUFFER_SECS}, {MAX_EXPIRY_BUFFER_SECS}]"
        )));
    }
    Ok(())
}

/// `callData` must be `"0x"` or a well-formed hex string.
fn validate_call_data_hex(call_data: &str) -> Result<(), TransferError> {
    let stripped = call_data.strip_prefix("0x").unwrap_or(call_data);
    if stripped.is_empty() {
        return Ok(());
    }
    hex::decode(stripped).map_err(|e| TransferError::InvalidParamStructure {
        path: "callData".to_string(),
        msg: format!("not valid hex: {e}"),
    })?;
    Ok(())
}

/// `validateQuoteParams` (spec.md §4.1).
pub fn validate_quote_params(params: &QuoteParams) -> Result<(), TransferError> {
    if params.sending_chain_id == params.receiving_chain_id {
        return Err(TransferError::InvalidParamStructure {
            path: "sendingChainId".to_string(),
            msg: "must differ from receivingChainId".to_string(),
        });
    }
    if params.amount.is_zero() {
        return Err(TransferError::InvalidParamStructure {
            path: "amount".to_string(),
            msg: "must be greater than zero".to_string(),
        });
    }
    validate_slippage(&params.slippage_tolerance)?;
    validate_expiry(params.expiry)?;
    validate_call_data_hex(&params.call_data)?;
    Ok(())
}

/// `validateAuctionBid` (spec.md §4.1): structural + numeric ranges plus
/// `bidExpiry > now`. Schema correctness only — signature, liquidity and
/// slippage-versus-gas checks belong to `AuctionClient` (spec.md §4.5).
pub fn validate_auction_bid(bid: &xtransfer_api::AuctionBid) -> Result<(), TransferError> {
    if bid.sending_chain_id == bid.receiving_chain_id {
        return Err(TransferError::InvalidParamStructure {
            path: "bid.sendingChainId".to_string(),
            msg: "must differ from receivingChainId".to_string(),
        });
    }
    if bid.amount.is_zero() || bid.amount_received.is_zero() {
        return Err(TransferError::InvalidParamStructure {
            path: "bid.amount".to_string(),
            msg: "amount and amountReceived must be greater than zero".to_string(),
        });
    }
    let now = Utc::now().timestamp() as u64;
    if bid.bid_expiry <= now {
        return Err(TransferError::InvalidParamStructure {
            path: "bid.bidExpiry".to_string(),
            msg: "bid has already expired".to_string(),
        });
    }
    Ok(())
}

/// `validatePrepareEvent` (spec.md §4.1): the indexer-delivered prepare
/// event must describe structurally valid invariant transaction data.
pub fn validate_prepare_event(event: &PrepareEvent) -> Result<(), TransferError> {
    if !event.tx_data.is_structurally_valid() {
        return Err(TransferError::InvalidParamStructure {
            path: "event.txData".to_string(),
            msg: "sendingChainFallback must equal user and chains must differ".to_string(),
        });
    }
    if event.amount.is_zero() {
        return Err(TransferError::InvalidParamStructure {
            path: "event.amount".to_string(),
            msg: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// `validateCancel` (spec.md §4.1).
pub fn validate_cancel(cancel: &CancelRequest) -> Result<(), TransferError> {
    if !cancel.tx_data.is_structurally_valid() {
        return Err(TransferError::InvalidParamStructure {
            path: "cancel.txData".to_string(),
            msg: "sendingChainFallback must equal user and chains must differ".to_string(),
        });
    }
    if cancel.amount.is_zero() {
        return Err(TransferError::InvalidParamStructure {
            path: "cancel.amount".to_string(),
            msg: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
