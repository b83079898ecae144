//! ============================================================================
//! Core Types - Shared domain types for the market client
//! ============================================================================
//! Everything contract-facing stays in smallest-unit integers (U256);
//! decimal strings exist only at the display boundary.
//! ============================================================================

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MarketError;

/// Parse and validate a 20-byte chain address before any network use.
///
/// Accepts `0x`-prefixed hex; alloy renders it EIP-55 checksummed on display.
pub fn parse_address(input: &str) -> Result<Address, MarketError> {
    Address::from_str(input.trim()).map_err(|_| MarketError::InvalidAddress(input.trim().to_string()))
}

/// Resolved ERC-20 metadata, immutable once read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
}

/// A holder's token balance, raw plus display form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Balance in the token's smallest unit
    pub raw: U256,
    pub decimals: u8,
    pub symbol: String,
    /// Lossless decimal rendering of `raw` (display only)
    pub formatted: String,
}

/// Ledger-computed price for a proposed mint or burn.
///
/// Valid only for the instant it was read; the royalty component is already
/// embedded in `reserve_amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Token quantity the quote was taken for (smallest units)
    pub token_amount: U256,
    /// Reserve cost (mint) or refund (burn), royalty included
    pub reserve_amount: U256,
    pub royalty: U256,
}

/// A broadcast transaction awaiting settlement.
///
/// Owned by the operation that created it; consumed by `await_settlement`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTx {
    pub hash: B256,
    pub submitted_at: DateTime<Utc>,
}

/// Confirmed inclusion of a transaction that succeeded on-chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Result of an allowance reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowanceOutcome {
    /// False when the recorded allowance already covered the requirement
    pub approved: bool,
    pub tx_hash: Option<B256>,
}

/// Settled buy or sell, with the slippage bound that guarded it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub tx_hash: B256,
    /// Token quantity minted or burned (smallest units)
    pub token_amount: U256,
    /// `max_reserve` ceiling (buy) or `min_refund` floor (sell)
    pub reserve_bound: U256,
    /// Post-settlement balance refresh; None when the best-effort read failed
    pub balance: Option<TokenBalance>,
}

/// Phase of a mutating market flow, readable while the flow is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OperationPhase {
    Idle = 0,
    Quoting = 1,
    Approving = 2,
    Submitting = 3,
    Confirming = 4,
    Done = 5,
    Failed = 6,
}

impl OperationPhase {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Quoting,
            2 => Self::Approving,
            3 => Self::Submitting,
            4 => Self::Confirming,
            5 => Self::Done,
            6 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// One step of a piecewise-constant price curve (ascending `range_to`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurveStep {
    /// Cumulative supply threshold this price applies up to (smallest units)
    pub range_to: u128,
    /// Unit price in reserve-token smallest units
    pub price: u128,
}

/// Read-only snapshot of a token's curve state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveView {
    pub steps: Vec<CurveStep>,
    pub max_supply: u128,
    pub next_mint_price: u128,
}

/// Parameters for creating a new curve-backed token.
///
/// Amounts are human decimal strings; they are parsed at the reserve token's
/// decimals when the creation flow runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenParams {
    pub name: String,
    pub symbol: String,
    pub max_supply: String,
    pub price_start: String,
    pub price_end: String,
    #[serde(default)]
    pub mint_royalty_bps: u16,
    #[serde(default)]
    pub burn_royalty_bps: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_valid() {
        let addr = parse_address("0x299c30DD5974BF4D5bFE42C340CA40462816AB07").unwrap();
        assert_eq!(
            format!("{addr}"),
            "0x299c30DD5974BF4D5bFE42C340CA40462816AB07"
        );
    }

    #[test]
    fn test_parse_address_case_insensitive_equal() {
        let lower = parse_address("0x299c30dd5974bf4d5bfe42c340ca40462816ab07").unwrap();
        let mixed = parse_address("0x299c30DD5974BF4D5bFE42C340CA40462816AB07").unwrap();
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(parse_address("").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not-an-address").is_err());
        assert!(parse_address("0xZZc30DD5974BF4D5bFE42C340CA40462816AB07").is_err());
    }
}
