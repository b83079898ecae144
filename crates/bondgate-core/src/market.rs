//! ============================================================================
//! Bonding-Curve Market - Quote, Approve, Mint/Burn with Slippage Guards
//! ============================================================================
//! The mutating flows follow a strict order:
//!   quote -> slippage bound -> allowance (buy only) -> submit -> settle
//! with the ledger enforcing the bound: a mint never costs more than the
//! ceiling computed at quote time, a burn never refunds less than the floor.
//!
//! One mutating flow at a time per session: a busy flag is acquired before
//! the first network call and released on every exit path. A second call
//! while one is in flight is rejected immediately - a queued call's quote
//! would already be stale by the time it ran.
//! ============================================================================

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use crate::abi::{bond, decode_err};
use crate::allowance::AllowanceReconciler;
use crate::balance::BalanceService;
use crate::config::MarketConfig;
use crate::error::MarketError;
use crate::gateway::ChainGateway;
use crate::metadata::TokenMetadataResolver;
use crate::types::{
    CreateTokenParams, CurveStep, CurveView, OperationPhase, Quote, Settlement, TokenBalance,
    TokenMetadata, TradeOutcome,
};
use crate::units;

/// Basis-point denominator for slippage arithmetic
const BPS_DENOMINATOR: u64 = 10_000;

/// Upper cost bound for a mint: `amount * (10000 + bps) / 10000`, floored
pub(crate) fn reserve_ceiling(amount: U256, slippage_bps: u16) -> U256 {
    amount * U256::from(BPS_DENOMINATOR + slippage_bps as u64) / U256::from(BPS_DENOMINATOR)
}

/// Lower refund bound for a burn: `amount * (10000 - bps) / 10000`, floored
pub(crate) fn refund_floor(amount: U256, slippage_bps: u16) -> U256 {
    amount * U256::from(BPS_DENOMINATOR - slippage_bps as u64) / U256::from(BPS_DENOMINATOR)
}

/// Client for a piecewise-constant bonding-curve market contract
pub struct BondingCurveMarket {
    gateway: Arc<dyn ChainGateway>,
    resolver: Arc<TokenMetadataResolver>,
    balances: Arc<BalanceService>,
    allowance: AllowanceReconciler,
    /// Bond (market) contract address
    bond: Address,
    /// Reserve token spent on mints, refunded on burns
    reserve_token: Address,
    slippage_bps: u16,
    busy: AtomicBool,
    phase: AtomicU8,
}

/// Releases the busy flag on every exit path; marks the flow failed unless
/// `finish` ran first.
struct FlowGuard<'a> {
    market: &'a BondingCurveMarket,
    finished: bool,
}

impl FlowGuard<'_> {
    fn finish(mut self) {
        self.finished = true;
        self.market.set_phase(OperationPhase::Done);
    }
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.market.set_phase(OperationPhase::Failed);
        }
        self.market.busy.store(false, Ordering::Release);
    }
}

impl BondingCurveMarket {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        resolver: Arc<TokenMetadataResolver>,
        balances: Arc<BalanceService>,
        config: &MarketConfig,
    ) -> Self {
        Self {
            allowance: AllowanceReconciler::new(gateway.clone()),
            gateway,
            resolver,
            balances,
            bond: config.bond,
            reserve_token: config.reserve_token,
            slippage_bps: config.slippage_bps,
            busy: AtomicBool::new(false),
            phase: AtomicU8::new(OperationPhase::Idle as u8),
        }
    }

    /// Phase of the current (or last) mutating flow
    pub fn phase(&self) -> OperationPhase {
        OperationPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Whether a mutating flow currently holds the session
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: OperationPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Acquire the session for a mutating flow, or reject immediately
    fn begin(&self) -> Result<FlowGuard<'_>, MarketError> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .map_err(|_| MarketError::OperationInFlight)?;
        self.set_phase(OperationPhase::Quoting);
        Ok(FlowGuard {
            market: self,
            finished: false,
        })
    }

    /// Buy: mint `amount` (human decimal string) of `token`, spending at
    /// most the quoted reserve cost plus slippage tolerance.
    pub async fn buy(&self, token: Address, amount: &str) -> Result<TradeOutcome, MarketError> {
        units::validate_amount_str(amount)?;
        let receiver = self
            .gateway
            .signer_address()
            .ok_or(MarketError::WalletUnavailable)?;
        let guard = self.begin()?;
        info!("buy {amount} of {token}");

        let meta = self.resolve_listed(token).await?;
        let tokens_to_mint = units::parse_amount(amount, meta.decimals)?;

        let quote = self.quote_mint(token, tokens_to_mint).await?;
        let max_reserve = reserve_ceiling(quote.reserve_amount, self.slippage_bps);
        debug!(
            "quoted reserve {} (royalty {}) -> ceiling {}",
            quote.reserve_amount, quote.royalty, max_reserve
        );

        self.set_phase(OperationPhase::Approving);
        self.allowance
            .ensure_allowance(self.reserve_token, receiver, self.bond, max_reserve)
            .await?;

        self.set_phase(OperationPhase::Submitting);
        let pending = self
            .gateway
            .submit(
                self.bond,
                Bytes::from(
                    bond::mintCall {
                        token,
                        tokensToMint: tokens_to_mint,
                        maxReserveAmount: max_reserve,
                        receiver,
                    }
                    .abi_encode(),
                ),
                U256::ZERO,
            )
            .await?;

        self.set_phase(OperationPhase::Confirming);
        let settlement = self.gateway.await_settlement(pending).await?;
        info!("mint settled: {}", settlement.tx_hash);

        let balance = self.refresh_balance(token, receiver).await;
        guard.finish();
        Ok(TradeOutcome {
            tx_hash: settlement.tx_hash,
            token_amount: tokens_to_mint,
            reserve_bound: max_reserve,
            balance,
        })
    }

    /// Sell: burn `amount` (human decimal string) of `token`, receiving at
    /// least the quoted refund minus slippage tolerance. Burning spends the
    /// holder's own balance, so no allowance reconciliation happens here.
    pub async fn sell(&self, token: Address, amount: &str) -> Result<TradeOutcome, MarketError> {
        units::validate_amount_str(amount)?;
        let receiver = self
            .gateway
            .signer_address()
            .ok_or(MarketError::WalletUnavailable)?;
        let guard = self.begin()?;
        info!("sell {amount} of {token}");

        let meta = self.resolve_listed(token).await?;
        let tokens_to_burn = units::parse_amount(amount, meta.decimals)?;

        let quote = self.quote_burn(token, tokens_to_burn).await?;
        let min_refund = refund_floor(quote.reserve_amount, self.slippage_bps);
        debug!(
            "quoted refund {} (royalty {}) -> floor {}",
            quote.reserve_amount, quote.royalty, min_refund
        );

        self.set_phase(OperationPhase::Submitting);
        let pending = self
            .gateway
            .submit(
                self.bond,
                Bytes::from(
                    bond::burnCall {
                        token,
                        tokensToBurn: tokens_to_burn,
                        minRefund: min_refund,
                        receiver,
                    }
                    .abi_encode(),
                ),
                U256::ZERO,
            )
            .await?;

        self.set_phase(OperationPhase::Confirming);
        let settlement = self.gateway.await_settlement(pending).await?;
        info!("burn settled: {}", settlement.tx_hash);

        let balance = self.refresh_balance(token, receiver).await;
        guard.finish();
        Ok(TradeOutcome {
            tx_hash: settlement.tx_hash,
            token_amount: tokens_to_burn,
            reserve_bound: min_refund,
            balance,
        })
    }

    /// Create a new curve-backed token with a simple two-step curve: the
    /// first tenth of supply at the start price, the remainder at the end
    /// price. Pays the bond's creation fee as transaction value.
    ///
    /// Returns the settlement; the created token address is read from the
    /// transaction logs by the operator.
    pub async fn create_token(&self, params: &CreateTokenParams) -> Result<Settlement, MarketError> {
        units::validate_amount_str(&params.max_supply)?;
        units::validate_amount_str(&params.price_start)?;
        units::validate_amount_str(&params.price_end)?;
        self.gateway
            .signer_address()
            .ok_or(MarketError::WalletUnavailable)?;
        let guard = self.begin()?;
        info!("creating token {} ({})", params.name, params.symbol);

        // Supply and step prices are denominated at the reserve token's
        // decimals, as the bond expects
        let reserve_meta = self.resolver.resolve(self.reserve_token).await?;
        let fee = self.creation_fee().await?;

        let max_supply = to_u128(
            units::parse_amount(&params.max_supply, reserve_meta.decimals)?,
            &params.max_supply,
        )?;
        let price_start = to_u128(
            units::parse_amount(&params.price_start, reserve_meta.decimals)?,
            &params.price_start,
        )?;
        let price_end = to_u128(
            units::parse_amount(&params.price_end, reserve_meta.decimals)?,
            &params.price_end,
        )?;

        let first_step = max_supply / 10;
        if first_step == 0 {
            return Err(MarketError::InvalidAmount(params.max_supply.clone()));
        }

        self.set_phase(OperationPhase::Submitting);
        let pending = self
            .gateway
            .submit(
                self.bond,
                Bytes::from(
                    bond::createTokenCall {
                        tp: bond::TokenParams {
                            name: params.name.clone(),
                            symbol: params.symbol.clone(),
                        },
                        bp: bond::BondParams {
                            mintRoyalty: params.mint_royalty_bps,
                            burnRoyalty: params.burn_royalty_bps,
                            reserveToken: self.reserve_token,
                            maxSupply: max_supply,
                            stepRanges: vec![first_step, max_supply],
                            stepPrices: vec![price_start, price_end],
                        },
                    }
                    .abi_encode(),
                ),
                fee,
            )
            .await?;

        self.set_phase(OperationPhase::Confirming);
        let settlement = self.gateway.await_settlement(pending).await?;
        info!(
            "token creation settled: {} (token address is in the tx logs)",
            settlement.tx_hash
        );

        guard.finish();
        Ok(settlement)
    }

    /// Quote the reserve cost of minting `tokens_to_mint` against the
    /// current curve state. Read-only; valid only for the instant it ran.
    pub async fn quote_mint(
        &self,
        token: Address,
        tokens_to_mint: U256,
    ) -> Result<Quote, MarketError> {
        let raw = self
            .gateway
            .call(
                self.bond,
                Bytes::from(
                    bond::getReserveForTokenCall {
                        token,
                        tokensToMint: tokens_to_mint,
                    }
                    .abi_encode(),
                ),
            )
            .await?;
        let ret = bond::getReserveForTokenCall::abi_decode_returns(&raw).map_err(decode_err)?;
        Ok(Quote {
            token_amount: tokens_to_mint,
            reserve_amount: ret.reserveAmount,
            royalty: ret.royalty,
        })
    }

    /// Quote the reserve refund of burning `tokens_to_burn`
    pub async fn quote_burn(
        &self,
        token: Address,
        tokens_to_burn: U256,
    ) -> Result<Quote, MarketError> {
        let raw = self
            .gateway
            .call(
                self.bond,
                Bytes::from(
                    bond::getRefundForTokensCall {
                        token,
                        tokensToBurn: tokens_to_burn,
                    }
                    .abi_encode(),
                ),
            )
            .await?;
        let ret = bond::getRefundForTokensCall::abi_decode_returns(&raw).map_err(decode_err)?;
        Ok(Quote {
            token_amount: tokens_to_burn,
            reserve_amount: ret.refundAmount,
            royalty: ret.royalty,
        })
    }

    /// The bond's one-time token creation fee, in native currency wei
    pub async fn creation_fee(&self) -> Result<U256, MarketError> {
        let raw = self
            .gateway
            .call(
                self.bond,
                Bytes::from(bond::creationFeeCall {}.abi_encode()),
            )
            .await?;
        bond::creationFeeCall::abi_decode_returns(&raw).map_err(decode_err)
    }

    /// Read-only snapshot of a token's curve: steps, cap and next price
    pub async fn curve(&self, token: Address) -> Result<CurveView, MarketError> {
        let (steps_raw, supply_raw, price_raw) = tokio::try_join!(
            self.gateway
                .call(self.bond, Bytes::from(bond::getStepsCall { token }.abi_encode())),
            self.gateway
                .call(self.bond, Bytes::from(bond::maxSupplyCall { token }.abi_encode())),
            self.gateway.call(
                self.bond,
                Bytes::from(bond::priceForNextMintCall { token }.abi_encode())
            ),
        )?;

        let steps = bond::getStepsCall::abi_decode_returns(&steps_raw).map_err(decode_err)?;
        let max_supply = bond::maxSupplyCall::abi_decode_returns(&supply_raw).map_err(decode_err)?;
        let next_mint_price =
            bond::priceForNextMintCall::abi_decode_returns(&price_raw).map_err(decode_err)?;

        Ok(CurveView {
            steps: steps
                .into_iter()
                .map(|s| CurveStep {
                    range_to: s.rangeTo,
                    price: s.price,
                })
                .collect(),
            max_supply,
            next_mint_price,
        })
    }

    /// Resolve metadata and confirm the bond manages this token
    async fn resolve_listed(&self, token: Address) -> Result<TokenMetadata, MarketError> {
        let meta = self.resolver.resolve(token).await.map_err(|e| {
            warn!("metadata resolution failed for {token}: {e}");
            MarketError::UnknownToken(token.to_string())
        })?;

        let raw = self
            .gateway
            .call(self.bond, Bytes::from(bond::existsCall { token }.abi_encode()))
            .await?;
        let listed = bond::existsCall::abi_decode_returns(&raw).map_err(decode_err)?;
        if !listed {
            return Err(MarketError::UnknownToken(token.to_string()));
        }
        Ok(meta)
    }

    /// Best-effort balance refresh after a successful settlement. The
    /// trade's success stands regardless of whether this read succeeds.
    async fn refresh_balance(&self, token: Address, holder: Address) -> Option<TokenBalance> {
        match self.balances.get_balance(token, holder).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("post-settlement balance refresh failed: {e}");
                None
            }
        }
    }
}

fn to_u128(value: U256, raw: &str) -> Result<u128, MarketError> {
    u128::try_from(value).map_err(|_| MarketError::InvalidAmount(raw.to_string()))
}
