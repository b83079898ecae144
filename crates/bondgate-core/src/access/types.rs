//! ============================================================================
//! Access Types - Feature thresholds and gate decisions
//! ============================================================================
//! Thresholds are configuration, not per-feature logic: a new tier is a new
//! (feature, minimum balance) pair, and the evaluation algorithm never
//! changes.
//! ============================================================================

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Minimum raw balance required to use a named feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureThreshold {
    pub name: String,
    /// Threshold in the gating token's smallest unit
    pub min_balance: U256,
}

/// The set of gated features and their thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub features: Vec<FeatureThreshold>,
}

impl GateConfig {
    /// Add a feature tier; higher tiers are just higher thresholds
    pub fn with_feature(mut self, name: &str, min_balance: U256) -> Self {
        self.features.push(FeatureThreshold {
            name: name.to_string(),
            min_balance,
        });
        self
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        // Holding any amount at all unlocks the premium tier
        Self {
            features: vec![FeatureThreshold {
                name: "premium".to_string(),
                min_balance: U256::from(1u64),
            }],
        }
    }
}

/// Pure derived value: recomputed from a balance snapshot, never stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    pub unlocked: bool,
    pub reason: String,
}

impl GateDecision {
    pub fn unlocked(reason: impl Into<String>) -> Self {
        Self {
            unlocked: true,
            reason: reason.into(),
        }
    }

    pub fn locked(reason: impl Into<String>) -> Self {
        Self {
            unlocked: false,
            reason: reason.into(),
        }
    }
}
