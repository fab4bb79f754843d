//! Pool discovery strategies.
//!
//! A [`PoolLocator`] turns a mint pair into either a pool address that still
//! has to be resolved on-chain, or a ready [`PoolKeys`] record. The resolver
//! treats every strategy the same way.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::{error::ResolutionError, pool_keys::PoolKeys};

const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const SOLANA_CHAIN_ID: &str = "solana";
const RAYDIUM_DEX_ID: &str = "raydium";
/// DexScreener labels for Raydium pools that are not v4 AMM pools.
const NON_STANDARD_LABELS: [&str; 2] = ["CLMM", "CPMM"];

/// Where a pool for the requested pair lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolLocation {
    /// Pool account address; keys must be resolved from chain.
    Address(Pubkey),
    /// Keys already known.
    Keys(PoolKeys),
}

#[async_trait]
pub trait PoolLocator: Send + Sync {
    async fn locate(&self, mint_a: &Pubkey, mint_b: &Pubkey) -> Result<PoolLocation, ResolutionError>;
}

/// A pool address supplied up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownPool(pub Pubkey);

#[async_trait]
impl PoolLocator for KnownPool {
    async fn locate(&self, _: &Pubkey, _: &Pubkey) -> Result<PoolLocation, ResolutionError> {
        Ok(PoolLocation::Address(self.0))
    }
}

// ─── DexScreener ──────────────────────────────────────────────────────────────

/// Finds the deepest v4 pair for a mint pair through the DexScreener API.
pub struct DexScreenerLocator {
    client:   Client,
    base_url: String,
    timeout:  Duration,
}

impl Default for DexScreenerLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl DexScreenerLocator {
    pub fn new() -> Self {
        Self {
            client:   Client::new(),
            base_url: DEXSCREENER_BASE_URL.to_string(),
            timeout:  DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn token_pairs(&self, mint: &Pubkey) -> Result<Vec<DexPair>, ResolutionError> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, mint);
        debug!("[DEXSCREENER] Fetching pairs for token {}", mint);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ResolutionError::Discovery(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ResolutionError::Discovery(format!("HTTP {}", response.status())));
        }

        let data: TokenPairsResponse = response
            .json()
            .await
            .map_err(|e| ResolutionError::Discovery(format!("invalid response: {e}")))?;
        Ok(data.pairs.unwrap_or_default())
    }
}

#[async_trait]
impl PoolLocator for DexScreenerLocator {
    async fn locate(&self, mint_a: &Pubkey, mint_b: &Pubkey) -> Result<PoolLocation, ResolutionError> {
        let pairs = self.token_pairs(mint_a).await?;
        debug!("[DEXSCREENER] {} pairs listed for {}", pairs.len(), mint_a);
        select_pair(&pairs, mint_a, mint_b)
            .map(PoolLocation::Address)
            .ok_or(ResolutionError::PoolNotFound(*mint_a, *mint_b))
    }
}

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    chain_id:     Option<String>,
    dex_id:       Option<String>,
    pair_address: Option<String>,
    #[serde(default)]
    labels:       Vec<String>,
    base_token:   Option<DexToken>,
    quote_token:  Option<DexToken>,
    liquidity:    Option<DexLiquidity>,
}

#[derive(Debug, Clone, Deserialize)]
struct DexToken {
    address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DexLiquidity {
    usd: Option<f64>,
}

impl DexPair {
    fn is_standard_raydium(&self) -> bool {
        self.chain_id.as_deref() == Some(SOLANA_CHAIN_ID)
            && self.dex_id.as_deref() == Some(RAYDIUM_DEX_ID)
            && !self
                .labels
                .iter()
                .any(|l| NON_STANDARD_LABELS.iter().any(|n| l.eq_ignore_ascii_case(n)))
    }

    fn trades(&self, a: &Pubkey, b: &Pubkey) -> bool {
        let token = |t: &Option<DexToken>| {
            t.as_ref()
                .and_then(|t| t.address.as_deref())
                .and_then(|s| s.parse::<Pubkey>().ok())
        };
        match (token(&self.base_token), token(&self.quote_token)) {
            (Some(base), Some(quote)) => (base == *a && quote == *b) || (base == *b && quote == *a),
            _ => false,
        }
    }

    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }
}

/// Deepest standard Raydium pair trading `{a, b}`.
fn select_pair(pairs: &[DexPair], a: &Pubkey, b: &Pubkey) -> Option<Pubkey> {
    pairs
        .iter()
        .filter(|p| p.is_standard_raydium() && p.trades(a, b))
        .filter_map(|p| {
            let address = p.pair_address.as_deref()?.parse::<Pubkey>().ok()?;
            Some((address, p.liquidity_usd()))
        })
        .max_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(address, _)| address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair(dex: &str, labels: &[&str], base: &Pubkey, quote: &Pubkey, usd: f64) -> (Pubkey, serde_json::Value) {
        let address = Pubkey::new_unique();
        let value = json!({
            "chainId": "solana",
            "dexId": dex,
            "pairAddress": address.to_string(),
            "labels": labels,
            "baseToken": { "address": base.to_string(), "symbol": "X" },
            "quoteToken": { "address": quote.to_string(), "symbol": "Y" },
            "liquidity": { "usd": usd, "base": 1.0, "quote": 2.0 },
        });
        (address, value)
    }

    fn parse(values: Vec<serde_json::Value>) -> Vec<DexPair> {
        let body = json!({ "schemaVersion": "1.0.0", "pairs": values });
        serde_json::from_value::<TokenPairsResponse>(body).unwrap().pairs.unwrap()
    }

    #[test]
    fn picks_deepest_standard_pair_in_either_order() {
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (shallow, v1) = pair("raydium", &[], &a, &b, 1_000.0);
        let (deep, v2) = pair("raydium", &[], &b, &a, 50_000.0);
        let (_, clmm) = pair("raydium", &["CLMM"], &a, &b, 900_000.0);
        let (_, orca) = pair("orca", &[], &a, &b, 800_000.0);
        let (_, other) = pair("raydium", &[], &a, &Pubkey::new_unique(), 700_000.0);

        let pairs = parse(vec![v1, v2, clmm, orca, other]);
        assert_eq!(select_pair(&pairs, &a, &b), Some(deep));
        assert_ne!(select_pair(&pairs, &a, &b), Some(shallow));
    }

    #[test]
    fn no_match_yields_none() {
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (_, cpmm) = pair("raydium", &["CPMM"], &a, &b, 1.0);
        assert_eq!(select_pair(&parse(vec![cpmm]), &a, &b), None);

        let empty: TokenPairsResponse = serde_json::from_value(json!({ "pairs": null })).unwrap();
        assert!(empty.pairs.is_none());
    }

    #[tokio::test]
    async fn known_pool_returns_its_address() {
        let pool = Pubkey::new_unique();
        let found = KnownPool(pool)
            .locate(&Pubkey::new_unique(), &Pubkey::new_unique())
            .await
            .unwrap();
        assert_eq!(found, PoolLocation::Address(pool));
    }
}
