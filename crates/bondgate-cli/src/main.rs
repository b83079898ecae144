// ============================================================================
// bondgate - CLI for the bonding-curve market client
// ============================================================================
// Usage:
//   bondgate status [--feature NAME]    Gate decision from a fresh balance
//   bondgate balance [--holder ADDR]    Token and reserve balances
//   bondgate quote buy|sell AMOUNT      Price a mint or burn without signing
//   bondgate buy AMOUNT                 Mint tokens with slippage protection
//   bondgate sell AMOUNT                Burn tokens with slippage protection
//   bondgate create --name N ...        Create a curve-backed token (one-time)
//   bondgate curve                      Show the token's price steps
//   bondgate set-token ADDR             Remember the traded token address
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use bondgate_core::{
    parse_address, units, AccessGate, Address, BalanceService, BondingCurveMarket, ChainGateway,
    CreateTokenParams, EvmGateway, GateConfig, MarketConfig, TokenMetadataResolver,
};

/// Bonding-curve market client: trade the token, check gated access
#[derive(Parser)]
#[command(name = "bondgate", version, about = "Buy/sell a bonding-curve token and check token-gated access")]
struct Cli {
    /// Traded token address (falls back to BONDGATE_TOKEN_ADDRESS, then the
    /// last address remembered with set-token)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gate decision derived from a fresh balance read
    Status {
        /// Check a specific configured feature tier instead of the base gate
        #[arg(long)]
        feature: Option<String>,

        /// Holder to check (default: the configured wallet)
        #[arg(long)]
        holder: Option<String>,

        /// Emit the decision and balance as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show token and reserve balances for a holder
    Balance {
        /// Holder to query (default: the configured wallet)
        #[arg(long)]
        holder: Option<String>,
    },

    /// Price a mint or burn without submitting anything
    Quote {
        #[arg(value_enum)]
        side: Side,

        /// Token quantity, human decimal form
        amount: String,
    },

    /// Buy: mint tokens, spending at most quote + slippage tolerance
    Buy {
        /// Token quantity, human decimal form
        amount: String,
    },

    /// Sell: burn tokens, receiving at least quote - slippage tolerance
    Sell {
        /// Token quantity, human decimal form
        amount: String,
    },

    /// Create a new curve-backed token (pays the bond's creation fee)
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        symbol: String,

        /// Maximum supply, human decimal form
        #[arg(long, default_value = "1000000")]
        max_supply: String,

        /// Unit price for the first curve step, in reserve tokens
        #[arg(long, default_value = "0.01")]
        price_start: String,

        /// Unit price for the final curve step, in reserve tokens
        #[arg(long, default_value = "0.10")]
        price_end: String,
    },

    /// Show the token's bonding-curve steps and next mint price
    Curve,

    /// Remember a token address for future invocations
    SetToken {
        address: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Buy,
    Sell,
}

/// Everything a command needs, wired from configuration
struct Services {
    gateway: Arc<dyn ChainGateway>,
    resolver: Arc<TokenMetadataResolver>,
    balances: Arc<BalanceService>,
    market: BondingCurveMarket,
    gate: AccessGate,
    config: MarketConfig,
}

fn build_services() -> Result<Services> {
    let config = MarketConfig::from_env()?;
    let gateway: Arc<dyn ChainGateway> = Arc::new(EvmGateway::connect(&config)?);
    let resolver = Arc::new(TokenMetadataResolver::new(gateway.clone()));
    let balances = Arc::new(BalanceService::new(gateway.clone(), resolver.clone()));
    let market = BondingCurveMarket::new(gateway.clone(), resolver.clone(), balances.clone(), &config);
    let gate = AccessGate::new(GateConfig::default(), balances.clone());
    Ok(Services {
        gateway,
        resolver,
        balances,
        market,
        gate,
        config,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let services = build_services()?;

    let token = resolve_token(cli.token.as_deref(), &services.config)?;

    match cli.command {
        Commands::Status {
            feature,
            holder,
            json,
        } => cmd_status(&services, require_token(token)?, holder, feature, json).await,
        Commands::Balance { holder } => {
            cmd_balance(&services, require_token(token)?, holder).await
        }
        Commands::Quote { side, amount } => {
            cmd_quote(&services, require_token(token)?, side, &amount).await
        }
        Commands::Buy { amount } => cmd_buy(&services, require_token(token)?, &amount).await,
        Commands::Sell { amount } => cmd_sell(&services, require_token(token)?, &amount).await,
        Commands::Create {
            name,
            symbol,
            max_supply,
            price_start,
            price_end,
        } => {
            cmd_create(
                &services,
                CreateTokenParams {
                    name,
                    symbol,
                    max_supply,
                    price_start,
                    price_end,
                    mint_royalty_bps: 0,
                    burn_royalty_bps: 0,
                },
            )
            .await
        }
        Commands::Curve => cmd_curve(&services, require_token(token)?).await,
        Commands::SetToken { address } => cmd_set_token(&address),
    }
}

// ----------------------------------------------------------------------------
// Token address resolution and persistence (the "surrounding application"
// half: the core never depends on this file existing)
// ----------------------------------------------------------------------------

fn state_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".bondgate").join("token"))
}

fn load_saved_token() -> Option<Address> {
    let path = state_path()?;
    let raw = std::fs::read_to_string(path).ok()?;
    parse_address(&raw).ok()
}

fn resolve_token(flag: Option<&str>, config: &MarketConfig) -> Result<Option<Address>> {
    if let Some(raw) = flag {
        return Ok(Some(parse_address(raw)?));
    }
    if let Some(address) = config.token {
        return Ok(Some(address));
    }
    Ok(load_saved_token())
}

fn require_token(token: Option<Address>) -> Result<Address> {
    token.context(
        "no token address configured - pass --token, set BONDGATE_TOKEN_ADDRESS, or run set-token",
    )
}

fn cmd_set_token(raw: &str) -> Result<()> {
    let address = parse_address(raw)?;
    let path = state_path().context("could not resolve a home directory")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, format!("{address}"))?;
    println!("Token address saved: {address}");
    Ok(())
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

fn holder_or_wallet(services: &Services, holder: Option<String>) -> Result<Address> {
    match holder {
        Some(raw) => Ok(parse_address(&raw)?),
        None => services
            .gateway
            .signer_address()
            .context("no holder given and no wallet configured"),
    }
}

async fn cmd_status(
    services: &Services,
    token: Address,
    holder: Option<String>,
    feature: Option<String>,
    json: bool,
) -> Result<()> {
    let holder = holder_or_wallet(services, holder)?;

    let (decision, balance) = match feature.as_deref() {
        Some(name) => services.gate.check_feature(token, holder, name).await?,
        None => services.gate.check(token, holder).await?,
    };

    if json {
        let out = serde_json::json!({
            "holder": format!("{holder}"),
            "token": format!("{token}"),
            "decision": decision,
            "balance": balance,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Balance: {} {} ({} raw)",
        balance.formatted, balance.symbol, balance.raw
    );
    println!(
        "Access:  {} - {}",
        if decision.unlocked { "UNLOCKED" } else { "LOCKED" },
        decision.reason
    );
    Ok(())
}

async fn cmd_balance(services: &Services, token: Address, holder: Option<String>) -> Result<()> {
    let holder = holder_or_wallet(services, holder)?;

    let token_balance = services.balances.get_balance(token, holder).await?;
    println!(
        "{:<10} {}",
        token_balance.symbol, token_balance.formatted
    );

    let reserve_balance = services
        .balances
        .get_balance(services.config.reserve_token, holder)
        .await?;
    println!(
        "{:<10} {}",
        reserve_balance.symbol, reserve_balance.formatted
    );
    Ok(())
}

async fn cmd_quote(services: &Services, token: Address, side: Side, amount: &str) -> Result<()> {
    let meta = services.resolver.resolve(token).await?;
    let quantity = units::parse_amount(amount, meta.decimals)?;
    let reserve_meta = services.resolver.resolve(services.config.reserve_token).await?;

    let quote = match side {
        Side::Buy => services.market.quote_mint(token, quantity).await?,
        Side::Sell => services.market.quote_burn(token, quantity).await?,
    };

    let verb = match side {
        Side::Buy => "costs",
        Side::Sell => "refunds",
    };
    println!(
        "{} {} {} {} {} (royalty {} included)",
        amount,
        meta.symbol,
        verb,
        units::format_amount(quote.reserve_amount, reserve_meta.decimals),
        reserve_meta.symbol,
        units::format_amount(quote.royalty, reserve_meta.decimals),
    );
    debug!("raw quote: {:?}", quote);
    Ok(())
}

async fn cmd_buy(services: &Services, token: Address, amount: &str) -> Result<()> {
    println!("Buying {amount}...");
    match services.market.buy(token, amount).await {
        Ok(outcome) => {
            println!("Buy complete: {}", outcome.tx_hash);
            println!("Reserve ceiling held: {}", outcome.reserve_bound);
            if let Some(balance) = outcome.balance {
                println!("New balance: {} {}", balance.formatted, balance.symbol);
            }
        }
        Err(e) => println!("Buy failed: {e}"),
    }
    Ok(())
}

async fn cmd_sell(services: &Services, token: Address, amount: &str) -> Result<()> {
    println!("Selling {amount}...");
    match services.market.sell(token, amount).await {
        Ok(outcome) => {
            println!("Sell complete: {}", outcome.tx_hash);
            println!("Refund floor held: {}", outcome.reserve_bound);
            if let Some(balance) = outcome.balance {
                println!("New balance: {} {}", balance.formatted, balance.symbol);
            }
        }
        Err(e) => println!("Sell failed: {e}"),
    }
    Ok(())
}

async fn cmd_create(services: &Services, params: CreateTokenParams) -> Result<()> {
    let reserve_meta = services.resolver.resolve(services.config.reserve_token).await?;
    let fee = services.market.creation_fee().await?;
    println!(
        "Creating {} ({}) with a two-step curve, creation fee {} ETH...",
        params.name,
        params.symbol,
        units::format_amount(fee, 18),
    );
    println!(
        "Curve: {} -> {} {} across {} supply",
        params.price_start, params.price_end, reserve_meta.symbol, params.max_supply
    );

    match services.market.create_token(&params).await {
        Ok(settlement) => {
            println!("Create confirmed: {}", settlement.tx_hash);
            println!("Read the new token address from the transaction logs, then run set-token.");
        }
        Err(e) => println!("Create failed: {e}"),
    }
    Ok(())
}

async fn cmd_curve(services: &Services, token: Address) -> Result<()> {
    let meta = services.resolver.resolve(token).await?;
    let reserve_meta = services.resolver.resolve(services.config.reserve_token).await?;
    let view = services.market.curve(token).await?;

    println!("Curve for {} ({} steps):", meta.symbol, view.steps.len());
    println!("{:<24} {}", "UP TO SUPPLY", "UNIT PRICE");
    for step in &view.steps {
        println!(
            "{:<24} {}",
            units::format_amount(bondgate_core::U256::from(step.range_to), meta.decimals),
            units::format_amount(bondgate_core::U256::from(step.price), reserve_meta.decimals),
        );
    }
    println!(
        "Max supply: {}",
        units::format_amount(bondgate_core::U256::from(view.max_supply), meta.decimals)
    );
    println!(
        "Next mint price: {} {}",
        units::format_amount(bondgate_core::U256::from(view.next_mint_price), reserve_meta.decimals),
        reserve_meta.symbol
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        Cli::try_parse_from(["bondgate", "buy", "100"]).unwrap();
        Cli::try_parse_from(["bondgate", "quote", "sell", "50"]).unwrap();
        Cli::try_parse_from([
            "bondgate",
            "--token",
            "0x299c30DD5974BF4D5bFE42C340CA40462816AB07",
            "status",
            "--feature",
            "premium",
        ])
        .unwrap();
    }

    #[test]
    fn test_require_token_message() {
        let err = require_token(None).unwrap_err();
        assert!(err.to_string().contains("set-token"));
    }
}
