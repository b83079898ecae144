//! ============================================================================
//! Allowance Reconciler - Spender Authorization Before Transfers
//! ============================================================================
//! Ensures a spender may move at least the required amount of a token on
//! behalf of an owner. The recorded allowance is read fresh on every call
//! (it can change out-of-band); a transaction is submitted only when the
//! current authorization is insufficient, and then for exactly the required
//! amount - never unlimited.
//!
//! Callers serialize access per (owner, spender, token): the market's busy
//! flag covers every flow that reconciles.
//! ============================================================================

use std::sync::Arc;
use tracing::{debug, info};

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use crate::abi::{decode_err, erc20};
use crate::error::MarketError;
use crate::gateway::ChainGateway;
use crate::types::AllowanceOutcome;

/// Reconciles ERC-20 spender authorizations
pub struct AllowanceReconciler {
    gateway: Arc<dyn ChainGateway>,
}

impl AllowanceReconciler {
    pub fn new(gateway: Arc<dyn ChainGateway>) -> Self {
        Self { gateway }
    }

    /// Authorize `spender` for at least `required` of `owner`'s `token`.
    ///
    /// Idempotent for a satisfied allowance: repeated calls submit zero
    /// transactions until the recorded authorization drops below `required`.
    pub async fn ensure_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        required: U256,
    ) -> Result<AllowanceOutcome, MarketError> {
        let current_raw = self
            .gateway
            .call(
                token,
                Bytes::from(erc20::allowanceCall { owner, spender }.abi_encode()),
            )
            .await?;
        let current = erc20::allowanceCall::abi_decode_returns(&current_raw).map_err(decode_err)?;

        if current >= required {
            debug!("allowance {current} already covers {required}, no transaction");
            return Ok(AllowanceOutcome {
                approved: false,
                tx_hash: None,
            });
        }

        info!("approving {spender} for {required} (current allowance {current})");
        let pending = self
            .gateway
            .submit(
                token,
                Bytes::from(
                    erc20::approveCall {
                        spender,
                        amount: required,
                    }
                    .abi_encode(),
                ),
                U256::ZERO,
            )
            .await?;
        let settlement = self.gateway.await_settlement(pending).await?;

        info!("approval settled: {}", settlement.tx_hash);
        Ok(AllowanceOutcome {
            approved: true,
            tx_hash: Some(settlement.tx_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeGateway;

    fn addr(last: u8) -> Address {
        Address::with_last_byte(last)
    }

    #[tokio::test]
    async fn test_sufficient_allowance_submits_nothing() {
        let owner = addr(1);
        let gateway = Arc::new(FakeGateway::new(Some(owner)));
        gateway.script_read::<erc20::allowanceCall>(&U256::from(2_000u64));
        gateway.script_read::<erc20::allowanceCall>(&U256::from(2_000u64));

        let reconciler = AllowanceReconciler::new(gateway.clone());
        for _ in 0..2 {
            let outcome = reconciler
                .ensure_allowance(addr(9), owner, addr(2), U256::from(1_020u64))
                .await
                .unwrap();
            assert!(!outcome.approved);
            assert!(outcome.tx_hash.is_none());
        }
        assert!(gateway.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_allowance_approves_exact_amount() {
        let owner = addr(1);
        let spender = addr(2);
        let token = addr(9);
        let gateway = Arc::new(FakeGateway::new(Some(owner)));
        gateway.script_read::<erc20::allowanceCall>(&U256::ZERO);

        let reconciler = AllowanceReconciler::new(gateway.clone());
        let outcome = reconciler
            .ensure_allowance(token, owner, spender, U256::from(1_020u64))
            .await
            .unwrap();

        assert!(outcome.approved);
        assert!(outcome.tx_hash.is_some());

        let submitted = gateway.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].to, token);
        let call = erc20::approveCall::abi_decode(&submitted[0].data).unwrap();
        assert_eq!(call.spender, spender);
        assert_eq!(call.amount, U256::from(1_020u64));
    }

    #[tokio::test]
    async fn test_without_wallet_fails_recoverably() {
        let gateway = Arc::new(FakeGateway::new(None));
        gateway.script_read::<erc20::allowanceCall>(&U256::ZERO);

        let reconciler = AllowanceReconciler::new(gateway.clone());
        let result = reconciler
            .ensure_allowance(addr(9), addr(1), addr(2), U256::from(10u64))
            .await;
        assert!(matches!(result, Err(MarketError::WalletUnavailable)));
    }

    #[tokio::test]
    async fn test_reverted_approval_surfaces_revert() {
        let owner = addr(1);
        let gateway = Arc::new(FakeGateway::new(Some(owner)));
        gateway.script_read::<erc20::allowanceCall>(&U256::ZERO);
        gateway.script_settlement(Err(MarketError::TransactionReverted { reason: None }));

        let reconciler = AllowanceReconciler::new(gateway.clone());
        let result = reconciler
            .ensure_allowance(addr(9), owner, addr(2), U256::from(10u64))
            .await;
        assert!(matches!(
            result,
            Err(MarketError::TransactionReverted { .. })
        ));
    }
}
