//! ============================================================================
//! Configuration - Environment-Supplied Endpoints and Addresses
//! ============================================================================
//! All settings come from the environment (a `.env` file is honored via
//! dotenvy) with documented public defaults for Base mainnet:
//! - BONDGATE_RPC_URL         JSON-RPC endpoint
//! - BONDGATE_BOND_ADDRESS    Mint Club V2 bond contract
//! - BONDGATE_RESERVE_TOKEN   reserve token accepted/paid by the bond
//! - BONDGATE_TOKEN_ADDRESS   default traded token (optional)
//! - BONDGATE_PRIVATE_KEY     hex signer key (optional; absent = read-only)
//! - BONDGATE_SLIPPAGE_BPS    slippage tolerance in basis points
//! ============================================================================

use alloy::primitives::Address;
use tracing::warn;

use crate::error::MarketError;
use crate::types::parse_address;

/// Public Base mainnet RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";

/// Mint Club V2 bond contract on Base
pub const DEFAULT_BOND_ADDRESS: &str = "0xc5a076cad94176c2996B32d8466Be1cE757FAa27";

/// $OPENWORK on Base, the curve's reserve token
pub const DEFAULT_RESERVE_TOKEN: &str = "0x299c30DD5974BF4D5bFE42C340CA40462816AB07";

/// Default slippage tolerance: 2%
pub const DEFAULT_SLIPPAGE_BPS: u16 = 200;

/// Maximum allowed slippage tolerance (5%). Higher env values are clamped
/// so a typo cannot accept arbitrarily bad prices.
pub const MAX_SLIPPAGE_BPS: u16 = 500;

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub rpc_url: String,
    /// Bond (market) contract address
    pub bond: Address,
    /// Reserve token spent on mints and received on burns
    pub reserve_token: Address,
    /// Default traded token, if one is configured
    pub token: Option<Address>,
    /// Hex-encoded signer key; None means no wallet capability
    pub private_key: Option<String>,
    pub slippage_bps: u16,
}

impl MarketConfig {
    /// Load configuration from the environment, falling back to the
    /// documented Base mainnet defaults.
    pub fn from_env() -> Result<Self, MarketError> {
        // A missing .env file is fine; real env vars still apply
        dotenvy::dotenv().ok();

        let rpc_url =
            std::env::var("BONDGATE_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());

        let bond = match std::env::var("BONDGATE_BOND_ADDRESS") {
            Ok(raw) => parse_address(&raw)?,
            Err(_) => parse_address(DEFAULT_BOND_ADDRESS)?,
        };

        let reserve_token = match std::env::var("BONDGATE_RESERVE_TOKEN") {
            Ok(raw) => parse_address(&raw)?,
            Err(_) => parse_address(DEFAULT_RESERVE_TOKEN)?,
        };

        let token = match std::env::var("BONDGATE_TOKEN_ADDRESS") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_address(&raw)?),
            _ => None,
        };

        let private_key = std::env::var("BONDGATE_PRIVATE_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let slippage_bps = std::env::var("BONDGATE_SLIPPAGE_BPS")
            .ok()
            .and_then(|raw| raw.parse::<u16>().ok())
            .unwrap_or(DEFAULT_SLIPPAGE_BPS);
        let slippage_bps = if slippage_bps > MAX_SLIPPAGE_BPS {
            warn!(
                "slippage {} bps exceeds max, clamped to {} bps",
                slippage_bps, MAX_SLIPPAGE_BPS
            );
            MAX_SLIPPAGE_BPS
        } else {
            slippage_bps
        };

        Ok(Self {
            rpc_url,
            bond,
            reserve_token,
            token,
            private_key,
            slippage_bps,
        })
    }

    /// Whether a signer capability is configured
    pub fn has_wallet(&self) -> bool {
        self.private_key.is_some()
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            bond: parse_address(DEFAULT_BOND_ADDRESS).expect("default bond address is valid"),
            reserve_token: parse_address(DEFAULT_RESERVE_TOKEN)
                .expect("default reserve address is valid"),
            token: None,
            private_key: None,
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        let config = MarketConfig::default();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.slippage_bps, 200);
        assert!(!config.has_wallet());
    }

    #[test]
    fn test_default_addresses_checksum() {
        let config = MarketConfig::default();
        assert_eq!(format!("{}", config.bond), DEFAULT_BOND_ADDRESS);
        assert_eq!(format!("{}", config.reserve_token), DEFAULT_RESERVE_TOKEN);
    }
}
