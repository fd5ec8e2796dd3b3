//! `BidCrypto` (C2): canonical bid encoding, router-signature recovery,
//! and the fulfill hash-to-sign.
//!
//! Grounded on spec.md §6: every field is ABI-encoded in a fixed order and
//! hashed with keccak256; recovery uses standard secp256k1 ecrecover over
//! that hash. `alloy`'s `PrimitiveSignature` (aliased here as `Signature`)
//! does the recovery; `sol!` produces the ABI-encoded tuple.

use alloy::primitives::{keccak256, Address, Bytes, PrimitiveSignature as Signature, B256, U256};
use alloy::sol;
use alloy::sol_types::SolValue;
use thiserror::Error;

sol! {
    /// Tuple mirroring the exact field order of spec.md §6's canonical bid
    /// encoding. `abi_encode()` on a `sol!` struct produces the same bytes
    /// as `abi.encode(field0, field1, ...)` would in Solidity.
    struct BidEncoding {
        address user;
        address router;
        address initiator;
        uint256 sendingChainId;
        address sendingAssetId;
        uint256 amount;
        uint256 receivingChainId;
        address receivingAssetId;
        uint256 amountReceived;
        address receivingAddress;
        bytes32 transactionId;
        uint256 expiry;
        bytes32 callDataHash;
        address callTo;
        bytes encryptedCallData;
        uint256 bidExpiry;
    }

    /// Tuple for the fulfill hash-to-sign (spec.md §6).
    struct FulfillEncoding {
        bytes32 transactionId;
        uint256 relayerFee;
        uint256 receivingChainId;
        address txManagerAddress;
    }
}

/// Fields of an `AuctionBid` needed for canonical encoding. Kept separate
/// from any higher-level `AuctionBid` type so this crate has no upward
/// dependency on `xtransfer-core`/`xtransfer-api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidFields {
    pub user: Address,
    pub router: Address,
    pub initiator: Address,
    pub sending_chain_id: u64,
    pub sending_asset_id: Address,
    pub amount: U256,
    pub receiving_chain_id: u64,
    pub receiving_asset_id: Address,
    pub amount_received: U256,
    pub receiving_address: Address,
    pub transaction_id: B256,
    pub expiry: u64,
    pub call_data_hash: B256,
    pub call_to: Address,
    pub encrypted_call_data: Bytes,
    pub bid_expiry: u64,
}

#[derive(Debug, Error)]
pub enum BidCryptoError {
    #[error("malformed signature")]
    MalformedSignature,
    #[error("signature recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Encode a bid to canonical bytes (§6). Signing `keccak256` of this is
/// what a router's `bidSignature` covers.
pub fn encode_bid(bid: &BidFields) -> Vec<u8> {
    BidEncoding {
        user: bid.user,
        router: bid.router,
        initiator: bid.initiator,
        sendingChainId: U256::from(bid.sending_chain_id),
        sendingAssetId: bid.sending_asset_id,
        amount: bid.amount,
        receivingChainId: U256::from(bid.receiving_chain_id),
        receivingAssetId: bid.receiving_asset_id,
        amountReceived: bid.amount_received,
        receivingAddress: bid.receiving_address,
        transactionId: bid.transaction_id,
        expiry: U256::from(bid.expiry),
        callDataHash: bid.call_data_hash,
        callTo: bid.call_to,
        encryptedCallData: bid.encrypted_call_data.clone(),
        bidExpiry: U256::from(bid.bid_expiry),
    }
    .abi_encode()
}

/// Structural inverse of [`encode_bid`] (spec.md §8, testable property 2).
/// Not used by the orchestration flow itself — only to check the
/// encode/decode round trip from outside this crate.
pub fn decode_bid(encoded: &[u8]) -> Result<BidFields, BidCryptoError> {
    let decoded = <BidEncoding as SolValue>::abi_decode(encoded, true)
        .map_err(|e| BidCryptoError::RecoveryFailed(e.to_string()))?;
    Ok(BidFields {
        user: decoded.user,
        router: decoded.router,
        initiator: decoded.initiator,
        sending_chain_id: decoded.sendingChainId.to::<u64>(),
        sending_asset_id: decoded.sendingAssetId,
        amount: decoded.amount,
        receiving_chain_id: decoded.receivingChainId.to::<u64>(),
        receiving_asset_id: decoded.receivingAssetId,
        amount_received: decoded.amountReceived,
        receiving_address: decoded.receivingAddress,
        transaction_id: decoded.transactionId,
        expiry: decoded.expiry.to::<u64>(),
        call_data_hash: decoded.callDataHash,
        call_to: decoded.callTo,
        encrypted_call_data: decoded.encryptedCallData,
        bid_expiry: decoded.bidExpiry.to::<u64>(),
    })
}

/// Recover the signer address from a bid and its 65-byte signature.
/// A malformed signature or recovery failure is *not* fatal to the
/// auction — callers treat it as a rejected bid, per spec.md §7.
pub fn recover_bid_signer(bid: &BidFields, signature: &[u8]) -> Result<Address, BidCryptoError> {
    let sig = Signature::try_from(signature).map_err(|_| BidCryptoError::MalformedSignature)?;
    let digest = keccak256(encode_bid(bid));
    sig.recover_address_from_prehash(&digest)
        .map_err(|e| BidCryptoError::RecoveryFailed(e.to_string()))
}

/// `keccak256(abi.encode(transactionId, relayerFee, receivingChainId, txManagerAddress))`.
pub fn fulfill_hash_to_sign(
    transaction_id: B256,
    relayer_fee: U256,
    receiving_chain_id: u64,
    tx_manager_address: Address,
) -> B256 {
    let encoded = FulfillEncoding {
        transactionId: transaction_id,
        relayerFee: relayer_fee,
        receivingChainId: U256::from(receiving_chain_id),
        txManagerAddress: tx_manager_address,
    }
    .abi_encode();
    keccak256(encoded)
}
