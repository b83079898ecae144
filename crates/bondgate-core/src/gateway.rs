//! ============================================================================
//! Chain Gateway - Uniform Ledger Read/Write Access
//! ============================================================================
//! One seam for everything that touches the chain:
//! - call: read-only eth_call, retried with backoff on transport noise
//! - submit: sign and broadcast a transaction (requires the wallet)
//! - await_settlement: poll for the receipt until a terminal outcome
//!
//! Components receive the gateway as an explicitly constructed service
//! object (trait object), so tests substitute a scripted fake per call.
//! ============================================================================

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;

use crate::config::MarketConfig;
use crate::error::MarketError;
use crate::retry::{calculate_delay, classify_error, extract_revert_reason, ErrorKind, RetryConfig};
use crate::types::{PendingTx, Settlement};

/// Uniform read/write access to the ledger.
///
/// `call` has no side effect and may be retried freely. `submit` requires an
/// authenticated signer; its absence is a recoverable condition, not a crash.
/// `await_settlement` blocks the calling flow until the ledger reports the
/// transaction included, surfacing a revert as a distinguishable failure.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Execute a read-only contract call and return the raw result
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, MarketError>;

    /// Sign and broadcast a transaction carrying `data` (and optional value)
    async fn submit(&self, to: Address, data: Bytes, value: U256) -> Result<PendingTx, MarketError>;

    /// Wait for the transaction's terminal outcome: settled or reverted
    async fn await_settlement(&self, pending: PendingTx) -> Result<Settlement, MarketError>;

    /// Address of the configured signer, if any
    fn signer_address(&self) -> Option<Address>;
}

/// Gateway over an EVM JSON-RPC endpoint via alloy, with an optional
/// locally-held signer key.
pub struct EvmGateway {
    provider: DynProvider,
    signer: Option<Address>,
    retry: RetryConfig,
}

impl EvmGateway {
    /// Build a gateway from configuration. The key never leaves the process.
    pub fn connect(config: &MarketConfig) -> anyhow::Result<Self> {
        let url: Url = config
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("invalid RPC URL '{}': {}", config.rpc_url, e))?;

        let (provider, signer) = match config.private_key.as_deref() {
            Some(key) => {
                let signer: PrivateKeySigner = key
                    .trim()
                    .parse()
                    .map_err(|e| anyhow!("invalid BONDGATE_PRIVATE_KEY: {e}"))?;
                let address = signer.address();
                let wallet = EthereumWallet::from(signer);
                let provider = ProviderBuilder::new()
                    .wallet(wallet)
                    .connect_http(url)
                    .erased();
                (provider, Some(address))
            }
            None => {
                let provider = ProviderBuilder::new().connect_http(url).erased();
                (provider, None)
            }
        };

        match signer {
            Some(address) => info!("gateway connected with wallet {address}"),
            None => info!("gateway connected read-only (no wallet configured)"),
        }

        Ok(Self {
            provider,
            signer,
            retry: RetryConfig::default(),
        })
    }

    /// Override the retry/polling policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl ChainGateway for EvmGateway {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, MarketError> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        let mut last_error = String::new();

        for attempt in 0..self.retry.max_read_retries {
            if attempt > 0 {
                let delay = calculate_delay(attempt - 1, &self.retry);
                debug!("read retry {} after {:?}", attempt, delay);
                sleep(delay).await;
            }

            match self.provider.call(request.clone()).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    let error_str = e.to_string();
                    match classify_error(&error_str) {
                        // A reverting read is a property of the contract
                        // state, not the transport; retrying won't help
                        ErrorKind::Reverted => return Err(MarketError::ContractRead(error_str)),
                        ErrorKind::UserRejected => return Err(MarketError::UserRejected),
                        ErrorKind::RateLimited => {
                            warn!("rate limited on read, backing off");
                            sleep(Duration::from_millis(self.retry.max_delay_ms)).await;
                        }
                        ErrorKind::Retryable => {}
                    }
                    warn!("read attempt {} failed: {}", attempt + 1, error_str);
                    last_error = error_str;
                }
            }
        }

        Err(MarketError::Network(format!(
            "read failed after {} attempts: {}",
            self.retry.max_read_retries, last_error
        )))
    }

    async fn submit(&self, to: Address, data: Bytes, value: U256) -> Result<PendingTx, MarketError> {
        let from = self.signer.ok_or(MarketError::WalletUnavailable)?;

        let mut request = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(data);
        if !value.is_zero() {
            request = request.with_value(value);
        }

        match self.provider.send_transaction(request).await {
            Ok(pending) => {
                let hash = *pending.tx_hash();
                info!("transaction broadcast: {hash}");
                Ok(PendingTx {
                    hash,
                    submitted_at: Utc::now(),
                })
            }
            Err(e) => {
                let error_str = e.to_string();
                warn!("broadcast failed: {error_str}");
                Err(match classify_error(&error_str) {
                    ErrorKind::Reverted => MarketError::TransactionReverted {
                        reason: extract_revert_reason(&error_str),
                    },
                    ErrorKind::UserRejected => MarketError::UserRejected,
                    _ => MarketError::Network(error_str),
                })
            }
        }
    }

    /// Polls until a receipt exists. Once a transaction is broadcast the flow
    /// commits to its terminal outcome; there is deliberately no poll cap, so
    /// a node that never answers hangs the wait (known limitation).
    async fn await_settlement(&self, pending: PendingTx) -> Result<Settlement, MarketError> {
        info!("awaiting settlement for {}", pending.hash);
        let mut attempt: u64 = 0;

        loop {
            sleep(Duration::from_millis(self.retry.poll_interval_ms)).await;
            attempt += 1;

            match self.provider.get_transaction_receipt(pending.hash).await {
                Ok(Some(receipt)) => {
                    if receipt.status() {
                        info!(
                            "transaction settled: {} (poll attempt {})",
                            pending.hash, attempt
                        );
                        return Ok(Settlement {
                            tx_hash: pending.hash,
                            block_number: receipt.block_number,
                        });
                    }
                    warn!("transaction reverted on-chain: {}", pending.hash);
                    return Err(MarketError::TransactionReverted { reason: None });
                }
                Ok(None) => {
                    debug!("not yet included (poll attempt {})", attempt);
                }
                Err(e) => {
                    // Transport errors during polling are not terminal
                    warn!("receipt poll {} failed: {}", attempt, e);
                }
            }
        }
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_read_only() {
        let gateway = EvmGateway::connect(&MarketConfig::default()).unwrap();
        assert!(gateway.signer_address().is_none());
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        let config = MarketConfig {
            rpc_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(EvmGateway::connect(&config).is_err());
    }

    #[test]
    fn test_connect_rejects_bad_key() {
        let config = MarketConfig {
            private_key: Some("0xnot-a-key".to_string()),
            ..Default::default()
        };
        assert!(EvmGateway::connect(&config).is_err());
    }

    #[tokio::test]
    async fn test_submit_without_wallet_fails_before_rpc() {
        let gateway = EvmGateway::connect(&MarketConfig::default()).unwrap();
        let result = gateway
            .submit(Address::ZERO, Bytes::new(), U256::ZERO)
            .await;
        assert!(matches!(result, Err(MarketError::WalletUnavailable)));
    }
}
