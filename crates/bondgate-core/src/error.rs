//! Error taxonomy for the market client.
//!
//! Every failure is scoped to the operation that raised it; nothing here is
//! fatal to the process. Recoverable conditions (no wallet, rejected
//! signature, transport noise) are distinct variants so callers can present
//! them differently from a ledger-level revert.

use serde::{Deserialize, Serialize};

/// Errors surfaced at the operation boundaries (buy / sell / create / approve)
/// and by the individual services beneath them.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum MarketError {
    /// No signer capability is present: a normal state, user must connect
    #[error("no wallet configured - set BONDGATE_PRIVATE_KEY to sign transactions")]
    WalletUnavailable,

    /// The signer declined to sign; retry is allowed
    #[error("signature request rejected by the wallet")]
    UserRejected,

    /// Caller input error, raised before any network call
    #[error("invalid amount '{0}': expected a positive decimal number")]
    InvalidAmount(String),

    /// The address did not resolve to a token this market manages
    #[error("unknown token {0}: metadata resolution failed or not bond-managed")]
    UnknownToken(String),

    /// Caller input error, raised before any network call
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// A read-only contract call failed after retries
    #[error("contract read failed: {0}")]
    ContractRead(String),

    /// The ledger included the transaction and rejected it
    #[error("transaction reverted: {}", reason.as_deref().unwrap_or("no reason returned"))]
    TransactionReverted { reason: Option<String> },

    /// Transport-level failure; the operation may be retried
    #[error("network error: {0}")]
    Network(String),

    /// A mutating flow is already holding the session; rejected, not queued
    #[error("another market operation is in flight - wait for it to settle")]
    OperationInFlight,
}
