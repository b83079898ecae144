//! Balance reads for gating and display.
//!
//! Every call re-reads the chain: an unlock decision is never made from a
//! cached balance. Formatting goes through fixed-point conversion, so wide
//! balances render without precision loss.

use std::sync::Arc;
use tracing::debug;

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;

use crate::abi::{decode_err, erc20};
use crate::error::MarketError;
use crate::gateway::ChainGateway;
use crate::metadata::TokenMetadataResolver;
use crate::types::TokenBalance;
use crate::units::format_amount;

/// Reads a holder's token balance fresh from the chain
pub struct BalanceService {
    gateway: Arc<dyn ChainGateway>,
    resolver: Arc<TokenMetadataResolver>,
}

impl BalanceService {
    pub fn new(gateway: Arc<dyn ChainGateway>, resolver: Arc<TokenMetadataResolver>) -> Self {
        Self { gateway, resolver }
    }

    /// Fresh `balanceOf` read plus resolved metadata and display rendering
    pub async fn get_balance(
        &self,
        token: Address,
        holder: Address,
    ) -> Result<TokenBalance, MarketError> {
        let meta = self.resolver.resolve(token).await?;

        let raw_bytes = self
            .gateway
            .call(
                token,
                Bytes::from(erc20::balanceOfCall { account: holder }.abi_encode()),
            )
            .await?;
        let raw = erc20::balanceOfCall::abi_decode_returns(&raw_bytes).map_err(decode_err)?;

        debug!("balance of {holder} in {token}: {raw}");
        Ok(TokenBalance {
            raw,
            decimals: meta.decimals,
            symbol: meta.symbol,
            formatted: format_amount(raw, meta.decimals),
        })
    }
}
