//! ray-swap CLI: single-hop swaps against Raydium v4 pools on Solana.
//!
//! Commands
//! --------
//!   pool-keys   Resolve and print the full key set of a pool
//!   quote       Quote a swap against live reserves (read-only)
//!   swap        Build, sign and send (or simulate) a swap

mod config;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use ray_swap_sdk::{
    authority::AMM_V4_PROGRAM_ID, Execution, ExecutionMode, FixedSide, PoolKeys, Quote,
    Slippage, SwapClient, SwapParams, TxFormat, DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY_FEE,
};
use serde_json::json;
use solana_sdk::{pubkey::Pubkey, signature::Signer};

use config::{resolve_mint, resolve_symbol, PoolSource, Settings};

// ─── Banner ───────────────────────────────────────────────────────────────────

fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  ray-swap  v{ver}  ·  Raydium v4 swaps from the terminal");
    println!("  {}", "─".repeat(62));
    println!("  Program   {AMM_V4_PROGRAM_ID}");
    println!("  Network   Solana mainnet-beta");
    println!("  Pools     constant-product x·y=k over an OpenBook market");
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// ray-swap: single-hop swaps against Raydium v4 constant-product pools.
///
/// Every command supports --json for machine-readable output.
#[derive(Parser)]
#[command(
    name         = "ray-swap",
    version      = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"), "\n",
        "Program:  675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8\n",
        "Network:  Solana mainnet-beta\n",
        "License:  MIT",
    ),
    about      = "Single-hop swaps against Raydium v4 constant-product pools on Solana.",
    after_help = "\
ENVIRONMENT:
  RPC_URL              Solana JSON-RPC endpoint  [default: https://api.mainnet-beta.solana.com]
  WALLET_PRIVATE_KEY   Base-58 encoded secret key of the fee payer
  KEYPAIR_PATH         Path to a Solana CLI keypair JSON (used when no private key is set)
  RUST_LOG             Log filter  [default: info]

  Variables are also read from a .env file in the working directory.

QUICK START:
  ray-swap pool-keys --pool 58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2
  ray-swap quote     --in SOL --out USDC --amount 10000000 --discover
  ray-swap swap      --in SOL --out USDC --amount 10000000 --discover --simulate"
)]
struct Cli {
    /// Solana JSON-RPC endpoint
    #[arg(
        long,
        global        = true,
        value_name    = "URL",
        default_value = "https://api.mainnet-beta.solana.com",
        env           = "RPC_URL"
    )]
    rpc_url: String,

    /// Base-58 secret key of the fee payer
    #[arg(long, global = true, value_name = "BASE58", env = "WALLET_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Path to the fee payer's keypair JSON file
    #[arg(long, global = true, value_name = "PATH", env = "KEYPAIR_PATH")]
    keypair: Option<String>,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where to find the pool for the pair. Exactly one is required.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct PoolArgs {
    /// Address of a known v4 pool
    #[arg(long, value_name = "ADDRESS")]
    pool: Option<String>,

    /// Pool-list JSON (array, or {"official": [...], "unOfficial": [...]})
    #[arg(long, value_name = "PATH")]
    pools_file: Option<PathBuf>,

    /// Look the pool up on DexScreener (deepest v4 pool for the pair)
    #[arg(long)]
    discover: bool,
}

impl PoolArgs {
    fn source(&self) -> Result<PoolSource> {
        PoolSource::from_args(self.pool.as_deref(), self.pools_file.as_ref(), self.discover)
    }
}

#[derive(Args)]
struct TradeArgs {
    /// Token to sell: symbol (SOL, USDC, USDT, RAY) or mint address
    #[arg(long = "in", value_name = "TOKEN")]
    token_in: String,

    /// Token to buy: symbol or mint address
    #[arg(long = "out", value_name = "TOKEN")]
    token_out: String,

    /// Amount to sell in atomic units (lamports for SOL, μUSDC for USDC)
    #[arg(long, value_name = "AMOUNT")]
    amount: u64,

    /// Slippage tolerance in basis points applied to the expected output
    #[arg(long, value_name = "BPS", default_value_t = 500)]
    slippage_bps: u64,

    #[command(flatten)]
    pool: PoolArgs,
}

/// Which side of the swap is held exact on chain.
#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    /// swap_base_in: exact input, minimum output
    In,
    /// swap_base_out: maximum input, exact output
    Out,
}

impl From<SideArg> for FixedSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::In => FixedSide::In,
            SideArg::Out => FixedSide::Out,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and print the full key set of a v4 pool
    ///
    /// Reads the AMM and market accounts and derives the market authority.
    /// The JSON output uses the public pool-list field names.
    #[command(
        after_help = "\
EXAMPLES:
  ray-swap pool-keys --pool 58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2
  ray-swap pool-keys --pool 58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2 --json"
    )]
    PoolKeys {
        /// Pool (AMM) address
        #[arg(long, value_name = "ADDRESS")]
        pool: String,
    },

    /// Quote a swap against live pool reserves (no transaction sent)
    #[command(
        after_help = "\
EXAMPLES:
  # 0.01 SOL → USDC through a known pool
  ray-swap quote --in SOL --out USDC --amount 10000000 --pool 58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2

  # Find the pool on DexScreener, 1% slippage
  ray-swap quote --in USDC --out SOL --amount 5000000 --discover --slippage-bps 100"
    )]
    Quote {
        #[command(flatten)]
        trade: TradeArgs,
    },

    /// Swap tokens through a v4 pool
    ///
    /// The transaction is sent with preflight skipped; a returned signature
    /// means the node accepted it, not that it landed.
    #[command(
        after_help = "\
EXAMPLES:
  # Dry run first
  ray-swap swap --in SOL --out USDC --amount 10000000 --discover --simulate

  # Send as a legacy transaction with a lower priority fee
  ray-swap swap --in SOL --out USDC --amount 10000000 --discover --legacy --priority-fee 100000

  # Exact-output swap from a local pool list
  ray-swap swap --in USDC --out SOL --amount 2000000 --pools-file pools.json --fixed-side out

NOTES:
  SOL input is wrapped into a temporary WSOL account and unwrapped afterwards.
  Output token accounts are created idempotently when missing."
    )]
    Swap {
        #[command(flatten)]
        trade: TradeArgs,

        /// Compute-unit price in micro-lamports. 0 skips the instruction.
        #[arg(long, value_name = "MICRO_LAMPORTS", default_value_t = DEFAULT_PRIORITY_FEE)]
        priority_fee: u64,

        /// Build a legacy transaction instead of a v0 one
        #[arg(long, default_value_t = false)]
        legacy: bool,

        /// Which side is held exact on chain
        #[arg(long, value_enum, default_value = "in")]
        fixed_side: SideArg,

        /// Retry budget handed to the RPC node
        #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_RETRIES)]
        max_retries: usize,

        /// Simulate the signed transaction instead of sending it
        #[arg(long, default_value_t = false)]
        simulate: bool,
    },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let settings = Settings::new(&cli.rpc_url, cli.private_key.as_deref(), cli.keypair.as_deref(), cli.json);

    match &cli.command {
        Commands::PoolKeys { pool } => cmd_pool_keys(&settings, pool).await?,
        Commands::Quote { trade } => cmd_quote(&settings, trade).await?,
        Commands::Swap { trade, priority_fee, legacy, fixed_side, max_retries, simulate } => {
            let mut params = trade_params(trade)?;
            params.priority_fee = *priority_fee;
            params.format = if *legacy { TxFormat::Legacy } else { TxFormat::Versioned };
            params.fixed_side = (*fixed_side).into();
            params.max_retries = *max_retries;
            params.mode = if *simulate { ExecutionMode::Simulate } else { ExecutionMode::Send };
            cmd_swap(&settings, trade, params).await?;
        }
    }

    Ok(())
}

/// Validate trade arguments into exact-input params with CLI slippage.
fn trade_params(trade: &TradeArgs) -> Result<SwapParams> {
    let mint_in  = resolve_mint(&trade.token_in).context("--in")?;
    let mint_out = resolve_mint(&trade.token_out).context("--out")?;
    if mint_in == mint_out {
        return Err(anyhow!("--in and --out must be different tokens."));
    }
    if trade.amount == 0 {
        return Err(anyhow!(
            "--amount must be > 0 (atomic units: lamports for SOL, μUSDC for USDC, etc.)"
        ));
    }
    let mut params = SwapParams::new(mint_in, mint_out, trade.amount);
    params.slippage = Slippage::from_bps(trade.slippage_bps)
        .with_context(|| format!("--slippage-bps {} is out of range (0–9999)", trade.slippage_bps))?;
    Ok(params)
}

// ─── pool-keys ────────────────────────────────────────────────────────────────

async fn cmd_pool_keys(settings: &Settings, pool: &str) -> Result<()> {
    let pool_id = Pubkey::from_str(pool).with_context(|| format!("--pool '{pool}' is not a valid address"))?;
    let client  = SwapClient::new(settings.rpc_url.as_str());
    let keys    = client
        .resolver()
        .resolve(&pool_id)
        .await
        .with_context(|| format!("could not resolve pool {pool_id}"))?;

    if settings.json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
    } else {
        print_pool_keys(&keys);
    }
    Ok(())
}

fn print_pool_keys(keys: &PoolKeys) {
    let authority = keys
        .market_authority
        .map(|a| a.to_string())
        .unwrap_or_else(|| "(not derivable)".to_string());
    println!("─── Pool Keys ────────────────────────────────────────────────────");
    println!("  Pool             {}", keys.id);
    println!("  Pair             {} / {}", resolve_symbol(&keys.base_mint), resolve_symbol(&keys.quote_mint));
    println!("  Base mint        {}  ({} decimals)", keys.base_mint, keys.base_decimals);
    println!("  Quote mint       {}  ({} decimals)", keys.quote_mint, keys.quote_decimals);
    println!("  LP mint          {}", keys.lp_mint);
    println!();
    println!("  ─── AMM ──────────────────────────────────────────");
    println!("  Program          {}", keys.program_id);
    println!("  Authority        {}", keys.authority);
    println!("  Open orders      {}", keys.open_orders);
    println!("  Target orders    {}", keys.target_orders);
    println!("  Base vault       {}", keys.base_vault);
    println!("  Quote vault      {}", keys.quote_vault);
    println!();
    println!("  ─── Market ───────────────────────────────────────");
    println!("  Program          {}", keys.market_program_id);
    println!("  Market           {}", keys.market_id);
    println!("  Authority        {authority}");
    println!("  Bids             {}", keys.market_bids);
    println!("  Asks             {}", keys.market_asks);
    println!("  Event queue      {}", keys.market_event_queue);
    println!("  Base vault       {}", keys.market_base_vault);
    println!("  Quote vault      {}", keys.market_quote_vault);
}

// ─── quote ────────────────────────────────────────────────────────────────────

async fn cmd_quote(settings: &Settings, trade: &TradeArgs) -> Result<()> {
    let params  = trade_params(trade)?;
    let source  = trade.pool.source()?;
    let locator = source.locator()?;
    let client  = SwapClient::new(settings.rpc_url.as_str());

    let keys = client
        .pool_keys(locator.as_ref(), &params.mint_in, &params.mint_out)
        .await
        .with_context(|| format!("no usable pool via {}", source.describe()))?;
    let quote = client
        .quote(&keys, &params.mint_in, &params.mint_out, params.amount_in, params.slippage)
        .await
        .context("quote failed")?;

    if settings.json {
        let mut out = quote_json(&quote, trade, &keys.id);
        out["command"] = json!("quote");
        out["slippage_bps"] = json!(trade.slippage_bps);
        println!("{out}");
    } else {
        println!("─── Swap Quote ───────────────────────────────────────────────────");
        print_quote(&quote, trade, &keys.id);
        println!();
        println!("  No transaction sent.  To execute:");
        println!(
            "    ray-swap swap --in {} --out {} --amount {} --pool {}",
            trade.token_in, trade.token_out, trade.amount, keys.id
        );
    }
    Ok(())
}

fn quote_json(quote: &Quote, trade: &TradeArgs, pool: &Pubkey) -> serde_json::Value {
    json!({
        "status":           "ok",
        "token_in":         trade.token_in,
        "token_out":        trade.token_out,
        "pool":             pool.to_string(),
        "base_in":          quote.base_in,
        "amount_in":        quote.amount_in,
        "fee":              quote.fee,
        "amount_out":       quote.amount_out,
        "min_amount_out":   quote.min_amount_out,
        "current_price":    quote.current_price.to_f64(),
        "execution_price":  quote.execution_price.to_f64(),
        "price_impact_pct": quote.price_impact.to_f64() * 100.0,
    })
}

fn print_quote(quote: &Quote, trade: &TradeArgs, pool: &Pubkey) {
    let dir = if quote.base_in { "base → quote" } else { "quote → base" };
    let (token_in, token_out) = (&trade.token_in, &trade.token_out);
    println!("  {token_in} → {token_out}  [{dir}]");
    println!("  Pool             {pool}");
    println!();
    println!("  Amount in        {:>20}  {token_in}", quote.amount_in);
    println!("  LP fee           {:>20}", quote.fee);
    println!("  Expected out     {:>20}  {token_out}", quote.amount_out);
    println!(
        "  Min accepted     {:>20}  {token_out}  ({:.2}% slippage guard)",
        quote.min_amount_out,
        trade.slippage_bps as f64 / 100.0
    );
    println!("  Spot price       {:>20.8}  {token_out}/{token_in}", quote.current_price);
    println!("  Execution price  {:>20.8}  {token_out}/{token_in}", quote.execution_price);
    println!("  Price impact     {:>19.4}%", quote.price_impact.to_f64() * 100.0);
}

// ─── swap ─────────────────────────────────────────────────────────────────────

async fn cmd_swap(settings: &Settings, trade: &TradeArgs, params: SwapParams) -> Result<()> {
    let payer   = settings.payer()?;
    let source  = trade.pool.source()?;
    let client  = SwapClient::new(settings.rpc_url.as_str());

    let locator = source.locator()?;

    let keys = client
        .pool_keys(locator.as_ref(), &params.mint_in, &params.mint_out)
        .await
        .with_context(|| format!("no usable pool via {}", source.describe()))?;

    let result = client
        .swap_with_keys(&payer, &keys, params)
        .await
        .context("swap failed")?;

    let side = match params.fixed_side {
        FixedSide::In => "in",
        FixedSide::Out => "out",
    };
    let format = match params.format {
        TxFormat::Legacy => "legacy",
        TxFormat::Versioned => "v0",
    };

    match &result.execution {
        Execution::Sent(sig) => {
            if settings.json {
                let mut out = quote_json(&result.quote, trade, &result.pool);
                out["command"] = json!("swap");
                out["payer"] = json!(payer.pubkey().to_string());
                out["fixed_side"] = json!(side);
                out["format"] = json!(format);
                out["tx"] = json!(sig.to_string());
                out["explorer"] = json!(format!("https://solscan.io/tx/{sig}"));
                println!("{out}");
            } else {
                println!("─── Swap Sent ────────────────────────────────────────────────────");
                print_quote(&result.quote, trade, &result.pool);
                println!();
                println!("  Fixed side       {side}");
                println!("  Format           {format}");
                println!("  Transaction      {sig}");
                println!("  Explorer         https://solscan.io/tx/{sig}");
                println!();
                println!("  Accepted by the node; check the explorer for confirmation.");
            }
        }
        Execution::Simulated(report) => {
            if settings.json {
                let mut out = quote_json(&result.quote, trade, &result.pool);
                out["command"] = json!("swap");
                out["simulate"] = json!(true);
                out["fixed_side"] = json!(side);
                out["format"] = json!(format);
                out["simulation"] = serde_json::to_value(report)?;
                println!("{out}");
            } else {
                println!("─── Swap Simulation ──────────────────────────────────────────────");
                print_quote(&result.quote, trade, &result.pool);
                println!();
                println!("  Fixed side       {side}");
                println!("  Format           {format}");
                println!("  Result           {}", if report.success { "success" } else { "failed" });
                if let Some(err) = &report.error {
                    println!("  Error            {err}");
                }
                if let Some(units) = report.units_consumed {
                    println!("  Compute units    {:>20}", units);
                }
                if !report.logs.is_empty() {
                    println!();
                    println!("  ─── Program Logs ─────────────────────────────────");
                    for line in &report.logs {
                        println!("  {line}");
                    }
                }
                println!();
                println!("  No transaction sent.");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pool_sources_are_mutually_exclusive() {
        let parsed = Cli::try_parse_from([
            "ray-swap", "quote", "--in", "SOL", "--out", "USDC", "--amount", "1", "--discover",
            "--pool", "58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2",
        ]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["ray-swap", "quote", "--in", "SOL", "--out", "USDC", "--amount", "1"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn swap_defaults() {
        let cli = Cli::try_parse_from([
            "ray-swap", "swap", "--in", "SOL", "--out", "USDC", "--amount", "1000", "--discover",
        ])
        .unwrap();
        let Commands::Swap { trade, priority_fee, legacy, fixed_side, max_retries, simulate } = cli.command else {
            panic!("expected swap");
        };
        assert_eq!(priority_fee, DEFAULT_PRIORITY_FEE);
        assert_eq!(max_retries, DEFAULT_MAX_RETRIES);
        assert!(!legacy && !simulate);
        assert!(matches!(FixedSide::from(fixed_side), FixedSide::In));
        assert_eq!(trade.slippage_bps, 500);
        let params = trade_params(&trade).unwrap();
        let expected = Slippage::default().minimum_of(1_000_000).unwrap();
        assert_eq!(params.slippage.minimum_of(1_000_000).unwrap(), expected);
    }

    #[test]
    fn zero_amount_and_same_token_are_rejected() {
        let cli = Cli::try_parse_from([
            "ray-swap", "quote", "--in", "SOL", "--out", "sol", "--amount", "5", "--discover",
        ])
        .unwrap();
        let Commands::Quote { trade } = cli.command else { panic!("expected quote") };
        assert!(trade_params(&trade).is_err());

        let cli = Cli::try_parse_from([
            "ray-swap", "quote", "--in", "SOL", "--out", "USDC", "--amount", "0", "--discover",
        ])
        .unwrap();
        let Commands::Quote { trade } = cli.command else { panic!("expected quote") };
        assert!(trade_params(&trade).is_err());
    }
}
