//! Ray Swap Rust SDK
//!
//! Single-hop swaps against Raydium v4 constant-product pools on Solana.
//! Resolves a mint pair to a pool, quotes it against live reserves, builds a
//! legacy or versioned transaction and sends or simulates it.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ray_swap_sdk::{ExecutionMode, KnownPool, SwapClient, SwapParams};
//! use solana_sdk::{pubkey::Pubkey, signature::Keypair};
//! use std::str::FromStr;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SwapClient::new("https://api.mainnet-beta.solana.com");
//!     let payer  = Keypair::new(); // use a funded keypair
//!
//!     let sol  = Pubkey::from_str("So11111111111111111111111111111111111111112")?;
//!     let usdc = Pubkey::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")?;
//!     let pool = KnownPool(Pubkey::from_str("58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2")?);
//!
//!     // 1. Dry run first
//!     let mut params = SwapParams::new(sol, usdc, 10_000_000);
//!     params.mode = ExecutionMode::Simulate;
//!     let sim = client.swap(&payer, &pool, params).await?;
//!     println!("expected out: {}  min: {}", sim.quote.amount_out, sim.quote.min_amount_out);
//!
//!     // 2. Send it
//!     params.mode = ExecutionMode::Send;
//!     let sent = client.swap(&payer, &pool, params).await?;
//!     println!("https://solscan.io/tx/{}", sent.signature().map(|s| s.to_string()).unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! | Step | Entry point |
//! |------|-------------|
//! | Decode AMM / market accounts | [`state::parse_amm`], [`state::parse_market`] |
//! | Derive market authority | [`authority::derive_market_authority`] |
//! | Resolve pool keys | [`PoolKeyResolver::resolve_pool`], [`PoolCatalog::find_pool`] |
//! | Quote | [`math::compute_amount_out`] |
//! | Build | [`TransactionBuilder::build`] |
//! | Send / simulate | [`Broadcaster::send`], [`Broadcaster::simulate`] |

pub mod authority;
pub mod broadcast;
pub mod catalog;
pub mod client;
pub mod discovery;
pub mod error;
pub mod instructions;
pub mod ledger;
pub mod math;
pub mod pool_keys;
pub mod resolver;
pub mod state;
pub mod transaction;
pub mod types;

pub use broadcast::Broadcaster;
pub use catalog::PoolCatalog;
pub use client::SwapClient;
pub use discovery::{DexScreenerLocator, KnownPool, PoolLocation, PoolLocator};
pub use error::{Error, Result};
pub use instructions::{FixedSide, RaydiumV4Instructions, SwapInstructionSource};
pub use ledger::{Checkpoint, Ledger, OwnerTokenAccount};
pub use math::{PoolInfo, Quote, Slippage};
pub use pool_keys::PoolKeys;
pub use resolver::PoolKeyResolver;
pub use transaction::{SwapTransaction, TransactionBuilder, TxFormat};
pub use types::*;
