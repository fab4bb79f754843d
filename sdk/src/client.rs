//! [`SwapClient`]: the resolve → quote → build → broadcast pipeline.

use std::sync::Arc;

use log::info;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Keypair};

use crate::{
    authority::AmmProgram,
    broadcast::Broadcaster,
    discovery::PoolLocator,
    error::Result,
    instructions::SwapInstructionSource,
    ledger::Ledger,
    math::{compute_amount_out, Quote, Slippage},
    pool_keys::PoolKeys,
    resolver::PoolKeyResolver,
    transaction::{BuildRequest, SwapTransaction, TransactionBuilder},
    types::{Execution, ExecutionMode, SwapParams, SwapResult},
};

// ─── Constants ────────────────────────────────────────────────────────────────

const MAINNET_RPC: &str = "https://api.mainnet-beta.solana.com";

// ─── Client ───────────────────────────────────────────────────────────────────

/// Async swap client for v4 pools.
///
/// Every step runs strictly after the previous one; the only state kept
/// between calls is the injected ledger handle.
///
/// ```rust,no_run
/// # use ray_swap_sdk::{KnownPool, SwapClient, SwapParams};
/// # use solana_sdk::{pubkey::Pubkey, signature::Keypair};
/// # use std::str::FromStr;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SwapClient::mainnet();
/// let payer  = Keypair::new();
/// let sol  = Pubkey::from_str("So11111111111111111111111111111111111111112")?;
/// let usdc = Pubkey::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")?;
/// let pool = KnownPool(Pubkey::from_str("58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2")?);
/// let result = client.swap(&payer, &pool, SwapParams::new(sol, usdc, 1_000_000)).await?;
/// println!("min out: {}", result.quote.min_amount_out);
/// # Ok(())
/// # }
/// ```
pub struct SwapClient {
    resolver:    PoolKeyResolver,
    builder:     TransactionBuilder,
    broadcaster: Broadcaster,
}

impl SwapClient {
    /// Client over any RPC endpoint, confirmed commitment.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let rpc = RpcClient::new_with_commitment(rpc_url.into(), CommitmentConfig::confirmed());
        Self::with_ledger(Arc::new(rpc))
    }

    pub fn mainnet() -> Self {
        Self::new(MAINNET_RPC)
    }

    /// Client over an arbitrary ledger implementation.
    pub fn with_ledger(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            resolver:    PoolKeyResolver::new(Arc::clone(&ledger)),
            builder:     TransactionBuilder::new(Arc::clone(&ledger)),
            broadcaster: Broadcaster::new(ledger),
        }
    }

    /// Resolve pools against another AMM deployment.
    pub fn with_program(mut self, program: AmmProgram) -> Self {
        self.resolver = self.resolver.with_program(program);
        self
    }

    pub fn with_instruction_source(mut self, source: Arc<dyn SwapInstructionSource>) -> Self {
        self.builder = self.builder.with_instruction_source(source);
        self
    }

    pub fn resolver(&self) -> &PoolKeyResolver {
        &self.resolver
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    // ── Pipeline steps ────────────────────────────────────────────────────────

    /// Locate and resolve the pool for a mint pair.
    pub async fn pool_keys(
        &self,
        locator: &dyn PoolLocator,
        mint_a:  &Pubkey,
        mint_b:  &Pubkey,
    ) -> Result<PoolKeys> {
        Ok(self.resolver.resolve_pool(locator, mint_a, mint_b).await?)
    }

    /// Quote `amount_in` of `mint_in` against fresh reserves of `keys`.
    pub async fn quote(
        &self,
        keys:      &PoolKeys,
        mint_in:   &Pubkey,
        mint_out:  &Pubkey,
        amount_in: u64,
        slippage:  Slippage,
    ) -> Result<Quote> {
        let base_in = keys.swap_direction(mint_in, mint_out)?;
        let info = self.resolver.fetch_pool_info(keys).await?;
        let quote = compute_amount_out(&info, amount_in, base_in, slippage)?;
        info!(
            "quote: {} in → {} out (min {}, impact {:.4})",
            quote.amount_in, quote.amount_out, quote.min_amount_out, quote.price_impact
        );
        Ok(quote)
    }

    // ── End to end ────────────────────────────────────────────────────────────

    /// Run the whole pipeline against a pool found by `locator`.
    pub async fn swap(
        &self,
        payer:   &Keypair,
        locator: &dyn PoolLocator,
        params:  SwapParams,
    ) -> Result<SwapResult> {
        let keys = self.pool_keys(locator, &params.mint_in, &params.mint_out).await?;
        self.swap_with_keys(payer, &keys, params).await
    }

    /// Quote, build and send (or simulate) against already resolved keys.
    pub async fn swap_with_keys(
        &self,
        payer:  &Keypair,
        keys:   &PoolKeys,
        params: SwapParams,
    ) -> Result<SwapResult> {
        let quote = self
            .quote(keys, &params.mint_in, &params.mint_out, params.amount_in, params.slippage)
            .await?;
        let tx = self.build(payer, keys, &quote, &params).await?;

        let execution = match params.mode {
            ExecutionMode::Send => {
                Execution::Sent(self.broadcaster.send(&tx, &[payer], params.max_retries).await?)
            }
            ExecutionMode::Simulate => {
                let report = self.broadcaster.simulate(&tx, &[payer]).await?;
                info!("simulation {}", if report.success { "succeeded" } else { "failed" });
                Execution::Simulated(report)
            }
        };

        Ok(SwapResult { pool: keys.id, quote, execution })
    }

    async fn build(
        &self,
        payer:  &Keypair,
        keys:   &PoolKeys,
        quote:  &Quote,
        params: &SwapParams,
    ) -> Result<SwapTransaction> {
        let request = BuildRequest {
            pool_keys:    keys,
            quote,
            fixed_side:   params.fixed_side,
            format:       params.format,
            priority_fee: params.priority_fee,
        };
        Ok(self.builder.build(payer, &request).await?)
    }
}
