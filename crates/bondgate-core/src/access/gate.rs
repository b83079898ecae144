//! ============================================================================
//! Access Gate - Balance-derived feature unlocking
//! ============================================================================
//! Maps a token balance to access decisions. Evaluation is pure; the
//! chain-backed checks always re-read the balance rather than trusting a
//! prior decision, because holdings change out-of-band.
//! ============================================================================

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::debug;

use crate::balance::BalanceService;
use crate::error::MarketError;
use crate::types::TokenBalance;

use super::types::{GateConfig, GateDecision};

/// Derives access decisions from token balances
pub struct AccessGate {
    config: GateConfig,
    balances: Arc<BalanceService>,
}

impl AccessGate {
    pub fn new(config: GateConfig, balances: Arc<BalanceService>) -> Self {
        Self { config, balances }
    }

    /// Base decision: holding any nonzero balance unlocks
    pub fn evaluate(&self, balance: U256) -> GateDecision {
        if balance.is_zero() {
            GateDecision::locked("hold at least one token unit to unlock")
        } else {
            GateDecision::unlocked(format!("balance {balance} is above zero"))
        }
    }

    /// Decision for a named feature tier against its configured threshold
    pub fn evaluate_feature(&self, balance: U256, feature: &str) -> GateDecision {
        match self.config.features.iter().find(|f| f.name == feature) {
            None => GateDecision::locked(format!("feature '{feature}' is not configured")),
            Some(tier) => {
                if balance >= tier.min_balance {
                    GateDecision::unlocked(format!(
                        "balance {balance} meets the '{feature}' threshold {}",
                        tier.min_balance
                    ))
                } else {
                    GateDecision::locked(format!(
                        "'{feature}' requires a balance of {}, have {balance}",
                        tier.min_balance
                    ))
                }
            }
        }
    }

    /// Fresh balance read, then the base decision
    pub async fn check(
        &self,
        token: Address,
        holder: Address,
    ) -> Result<(GateDecision, TokenBalance), MarketError> {
        let balance = self.balances.get_balance(token, holder).await?;
        let decision = self.evaluate(balance.raw);
        debug!(
            "gate decision for {holder}: unlocked={} ({})",
            decision.unlocked, decision.reason
        );
        Ok((decision, balance))
    }

    /// Fresh balance read, then the decision for a named feature
    pub async fn check_feature(
        &self,
        token: Address,
        holder: Address,
        feature: &str,
    ) -> Result<(GateDecision, TokenBalance), MarketError> {
        let balance = self.balances.get_balance(token, holder).await?;
        Ok((self.evaluate_feature(balance.raw, feature), balance))
    }
}
