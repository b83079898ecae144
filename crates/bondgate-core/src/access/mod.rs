//! Token-gated access: pure threshold decisions over a fresh balance read.

pub mod gate;
pub mod types;

pub use gate::AccessGate;
pub use types::{FeatureThreshold, GateConfig, GateDecision};
