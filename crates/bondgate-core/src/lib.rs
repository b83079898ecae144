//! ============================================================================
//! BONDGATE-CORE: Bonding-Curve Market Client
//! ============================================================================
//! This crate holds all chain-facing logic for the bondgate client:
//! - Chain gateway over EVM JSON-RPC via alloy (reads, writes, settlement)
//! - Bonding-curve market flows: quote, approve, mint/burn with slippage
//!   guards, token creation
//! - Token-gated access decisions derived from fresh balance reads
//! ============================================================================

pub mod abi;
pub mod access;
pub mod allowance;
pub mod balance;
pub mod config;
pub mod error;
pub mod gateway;
pub mod market;
pub mod metadata;
pub mod retry;
pub mod types;
pub mod units;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types for convenience
pub use access::{AccessGate, FeatureThreshold, GateConfig, GateDecision};
pub use allowance::AllowanceReconciler;
pub use balance::BalanceService;
pub use config::MarketConfig;
pub use error::MarketError;
pub use gateway::{ChainGateway, EvmGateway};
pub use market::BondingCurveMarket;
pub use metadata::TokenMetadataResolver;
pub use types::*;

// Chain primitives used across the public API
pub use alloy::primitives::{Address, B256, U256};
