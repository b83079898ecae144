//! ============================================================================
//! Token Metadata Resolver - Memoized decimals/symbol Lookups
//! ============================================================================
//! Issues the two ERC-20 metadata reads concurrently and caches the result
//! per address for the resolver's lifetime. Failures are never cached: a
//! transient read error leaves the entry empty so the next call retries.
//! ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;

use crate::abi::{decode_err, erc20};
use crate::error::MarketError;
use crate::gateway::ChainGateway;
use crate::types::TokenMetadata;

/// Resolves and memoizes token metadata for the session lifetime
pub struct TokenMetadataResolver {
    gateway: Arc<dyn ChainGateway>,
    cache: RwLock<HashMap<Address, TokenMetadata>>,
}

impl TokenMetadataResolver {
    pub fn new(gateway: Arc<dyn ChainGateway>) -> Self {
        Self {
            gateway,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve decimals and symbol for `token`, hitting the chain only on a
    /// cache miss.
    pub async fn resolve(&self, token: Address) -> Result<TokenMetadata, MarketError> {
        if let Some(hit) = self.cache.read().await.get(&token) {
            debug!("metadata cache hit for {token}");
            return Ok(hit.clone());
        }

        debug!("resolving metadata for {token}");
        let (decimals_raw, symbol_raw) = tokio::try_join!(
            self.gateway
                .call(token, Bytes::from(erc20::decimalsCall {}.abi_encode())),
            self.gateway
                .call(token, Bytes::from(erc20::symbolCall {}.abi_encode())),
        )?;

        let decimals = erc20::decimalsCall::abi_decode_returns(&decimals_raw).map_err(decode_err)?;
        let symbol = erc20::symbolCall::abi_decode_returns(&symbol_raw).map_err(decode_err)?;

        let meta = TokenMetadata {
            address: token,
            decimals,
            symbol,
        };
        self.cache.write().await.insert(token, meta.clone());
        Ok(meta)
    }

    /// Number of addresses currently memoized
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}
