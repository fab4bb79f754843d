//! Process configuration: parsed once at startup, immutable afterwards.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use ray_swap_sdk::{DexScreenerLocator, KnownPool, PoolCatalog, PoolLocator};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
};

// ─── Token symbol registry (mainnet-beta) ────────────────────────────────────

pub const KNOWN_TOKENS: &[(&str, &str)] = &[
    ("SOL",  "So11111111111111111111111111111111111111112"),
    ("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
    ("USDT", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
    ("RAY",  "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R"),
];

/// Resolve a symbol (SOL, USDC, USDT, RAY) or raw base-58 mint address.
pub fn resolve_mint(symbol_or_address: &str) -> Result<Pubkey> {
    let upper = symbol_or_address.to_uppercase();
    for (sym, addr) in KNOWN_TOKENS {
        if upper == *sym {
            return Ok(Pubkey::from_str(addr)?);
        }
    }
    Pubkey::from_str(symbol_or_address).map_err(|_| {
        anyhow!(
            "Unknown token '{}'. Use a built-in symbol ({}) or a base-58 mint address.",
            symbol_or_address,
            KNOWN_TOKENS.iter().map(|(s, _)| *s).collect::<Vec<_>>().join(", ")
        )
    })
}

/// Mint address → symbol, or shortened address for unknowns.
pub fn resolve_symbol(mint: &Pubkey) -> String {
    let addr = mint.to_string();
    for (sym, known) in KNOWN_TOKENS {
        if addr == *known {
            return sym.to_string();
        }
    }
    format!("{}…{}", &addr[..4], &addr[addr.len() - 4..])
}

/// Expand `~/` to `$HOME/` in keypair paths.
fn expand_home(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("{}/{rest}", std::env::var("HOME").unwrap_or_default()),
        None => path.to_string(),
    }
}

// ─── Signer ───────────────────────────────────────────────────────────────────

/// Where the fee payer's secret key comes from.
pub enum SignerSource {
    /// Base-58 encoded 64-byte secret key.
    PrivateKey(String),
    /// Solana CLI keypair JSON file.
    KeypairFile(String),
}

impl SignerSource {
    pub fn load(&self) -> Result<Keypair> {
        match self {
            Self::PrivateKey(encoded) => {
                let bytes = bs58::decode(encoded.trim())
                    .into_vec()
                    .context("WALLET_PRIVATE_KEY is not valid base-58")?;
                Keypair::from_bytes(&bytes)
                    .map_err(|e| anyhow!("WALLET_PRIVATE_KEY is not a 64-byte secret key: {e}"))
            }
            Self::KeypairFile(path) => {
                let expanded = expand_home(path);
                read_keypair_file(&expanded).map_err(|e| {
                    anyhow!(
                        "Cannot load keypair from '{}': {}\n  \
                         Set WALLET_PRIVATE_KEY, KEYPAIR_PATH or pass --keypair.",
                        expanded,
                        e
                    )
                })
            }
        }
    }
}

// ─── Pool source ──────────────────────────────────────────────────────────────

/// How the pool for a pair is found.
pub enum PoolSource {
    Known(Pubkey),
    Catalog(PathBuf),
    Discover,
}

impl PoolSource {
    pub fn from_args(pool: Option<&str>, pools_file: Option<&PathBuf>, discover: bool) -> Result<Self> {
        match (pool, pools_file, discover) {
            (Some(pool), None, false) => Ok(Self::Known(
                Pubkey::from_str(pool).with_context(|| format!("--pool '{pool}' is not a valid address"))?,
            )),
            (None, Some(path), false) => Ok(Self::Catalog(path.clone())),
            (None, None, true) => Ok(Self::Discover),
            _ => Err(anyhow!("Pass exactly one of --pool, --pools-file or --discover.")),
        }
    }

    pub fn locator(&self) -> Result<Box<dyn PoolLocator>> {
        Ok(match self {
            Self::Known(pool) => Box::new(KnownPool(*pool)),
            Self::Catalog(path) => {
                let catalog = PoolCatalog::new();
                let count = catalog
                    .load_json_file(path)
                    .with_context(|| format!("--pools-file {}", path.display()))?;
                if count == 0 {
                    return Err(anyhow!("{} contains no usable pools.", path.display()));
                }
                Box::new(catalog)
            }
            Self::Discover => Box::new(DexScreenerLocator::new()),
        })
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Known(pool) => format!("pool {pool}"),
            Self::Catalog(path) => format!("catalog {}", path.display()),
            Self::Discover => "DexScreener discovery".to_string(),
        }
    }
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Global settings shared by every command.
pub struct Settings {
    pub rpc_url: String,
    pub json:    bool,
    signer:      Option<SignerSource>,
}

impl Settings {
    pub fn new(rpc_url: &str, private_key: Option<&str>, keypair: Option<&str>, json: bool) -> Self {
        let signer = match (private_key, keypair) {
            (Some(key), _) if !key.trim().is_empty() => Some(SignerSource::PrivateKey(key.to_string())),
            (_, Some(path)) => Some(SignerSource::KeypairFile(path.to_string())),
            _ => None,
        };
        Self { rpc_url: rpc_url.to_string(), json, signer }
    }

    /// The fee payer. Only commands that build transactions need one.
    pub fn payer(&self) -> Result<Keypair> {
        self.signer
            .as_ref()
            .ok_or_else(|| anyhow!("No signer configured. Set WALLET_PRIVATE_KEY or KEYPAIR_PATH."))?
            .load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Signer;

    #[test]
    fn symbols_and_addresses_resolve() {
        assert_eq!(resolve_mint("sol").unwrap().to_string(), KNOWN_TOKENS[0].1);
        let raw = Pubkey::new_unique();
        assert_eq!(resolve_mint(&raw.to_string()).unwrap(), raw);
        assert!(resolve_mint("NOPE").is_err());
        assert_eq!(resolve_symbol(&resolve_mint("USDC").unwrap()), "USDC");
    }

    #[test]
    fn private_key_takes_precedence_over_keypair_file() {
        let kp = Keypair::new();
        let encoded = bs58::encode(kp.to_bytes()).into_string();
        let settings = Settings::new("http://localhost:8899", Some(&encoded), Some("/nonexistent.json"), false);
        assert_eq!(settings.payer().unwrap().pubkey(), kp.pubkey());
    }

    #[test]
    fn missing_signer_is_reported() {
        let settings = Settings::new("http://localhost:8899", None, None, false);
        assert!(settings.payer().is_err());
    }

    #[test]
    fn exactly_one_pool_source() {
        let pool = Pubkey::new_unique().to_string();
        assert!(matches!(PoolSource::from_args(Some(&pool), None, false), Ok(PoolSource::Known(_))));
        assert!(matches!(PoolSource::from_args(None, None, true), Ok(PoolSource::Discover)));
        assert!(PoolSource::from_args(Some(&pool), None, true).is_err());
        assert!(PoolSource::from_args(None, None, false).is_err());
    }
}
