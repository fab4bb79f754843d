//! The canonical, immutable address set of one v4 pool.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use solana_sdk::pubkey::Pubkey;

use crate::{
    authority::{derive_market_authority, AmmProgram},
    error::{QuoteError, ResolutionError},
    state::{parse_amm, parse_market, AmmState, MarketState},
};

/// AMM layout version handled by this crate.
pub const POOL_VERSION: u8 = 4;
/// Order-book market layout version paired with v4 pools.
pub const MARKET_VERSION: u8 = 3;

/// Every address a swap against one pool needs.
///
/// Serializes with the camelCase field names used by the public pool-list
/// JSON, addresses as base58 strings. Base/quote ordering is the pool's own
/// and never changes after construction.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolKeys {
    #[serde_as(as = "DisplayFromStr")]
    pub id: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub base_mint: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub quote_mint: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub lp_mint: Pubkey,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub lp_decimals: u8,
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde_as(as = "DisplayFromStr")]
    pub program_id: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub authority: Pubkey,
    /// Nonce recorded in the AMM state for `authority`.
    #[serde(default)]
    pub nonce: u8,
    #[serde_as(as = "DisplayFromStr")]
    pub open_orders: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub target_orders: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub base_vault: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub quote_vault: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub withdraw_queue: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub lp_vault: Pubkey,
    #[serde(default = "default_market_version")]
    pub market_version: u8,
    #[serde_as(as = "DisplayFromStr")]
    pub market_program_id: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub market_id: Pubkey,
    /// `None` when the nonce search found no off-curve address.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub market_authority: Option<Pubkey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_authority_nonce: Option<u64>,
    #[serde_as(as = "DisplayFromStr")]
    pub market_base_vault: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub market_quote_vault: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub market_bids: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub market_asks: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub market_event_queue: Pubkey,
}

fn default_version() -> u8 {
    POOL_VERSION
}

fn default_market_version() -> u8 {
    MARKET_VERSION
}

impl PoolKeys {
    /// Assemble pool keys from already-decoded AMM and market state.
    pub fn from_state(
        program: &AmmProgram,
        pool_id: Pubkey,
        amm:     &AmmState,
        market:  &MarketState,
    ) -> Result<Self, ResolutionError> {
        let market_authority = derive_market_authority(&amm.market_program_id, &amm.market_id);
        match market_authority {
            Some(found) => {
                debug!("market {} authority {} (nonce {})", amm.market_id, found.address, found.nonce);
                if found.nonce != market.vault_signer_nonce {
                    debug!(
                        "derived nonce {} differs from market vault_signer_nonce {}",
                        found.nonce, market.vault_signer_nonce
                    );
                }
            }
            None => warn!(
                "unable to find a viable program address nonce for market {} (program {})",
                amm.market_id, amm.market_program_id
            ),
        }

        let nonce = u8::try_from(amm.nonce).map_err(|_| ResolutionError::InvalidPoolKeys {
            pool:   pool_id,
            reason: format!("authority nonce {} does not fit in a byte", amm.nonce),
        })?;
        let (base_decimals, quote_decimals) = amm
            .decimals()
            .map_err(|source| ResolutionError::Decode { account: pool_id, source })?;

        let keys = Self {
            id:                     pool_id,
            base_mint:              amm.base_mint,
            quote_mint:             amm.quote_mint,
            lp_mint:                amm.lp_mint,
            base_decimals,
            quote_decimals,
            // v4 LP mints share the base mint's precision
            lp_decimals:            base_decimals,
            version:                POOL_VERSION,
            program_id:             program.id,
            authority:              program.authority,
            nonce,
            open_orders:            amm.open_orders,
            target_orders:          amm.target_orders,
            base_vault:             amm.base_vault,
            quote_vault:            amm.quote_vault,
            withdraw_queue:         amm.withdraw_queue,
            lp_vault:               amm.lp_vault,
            market_version:         MARKET_VERSION,
            market_program_id:      amm.market_program_id,
            market_id:              amm.market_id,
            market_authority:       market_authority.map(|a| a.address),
            market_authority_nonce: market_authority.map(|a| a.nonce),
            market_base_vault:      market.base_vault,
            market_quote_vault:     market.quote_vault,
            market_bids:            market.bids,
            market_asks:            market.asks,
            market_event_queue:     market.event_queue,
        };
        keys.validate()?;
        Ok(keys)
    }

    /// Decode raw AMM and market account bytes and assemble pool keys.
    pub fn from_accounts(
        program:     &AmmProgram,
        pool_id:     Pubkey,
        amm_data:    &[u8],
        market_data: &[u8],
    ) -> Result<Self, ResolutionError> {
        let amm = parse_amm(amm_data)
            .map_err(|source| ResolutionError::Decode { account: pool_id, source })?;
        let market = parse_market(market_data)
            .map_err(|source| ResolutionError::Decode { account: amm.market_id, source })?;
        Self::from_state(program, pool_id, &amm, &market)
    }

    /// Reject records that cannot describe a swappable v4 pool.
    pub fn validate(&self) -> Result<(), ResolutionError> {
        let invalid = |reason: String| ResolutionError::InvalidPoolKeys { pool: self.id, reason };
        if self.version != POOL_VERSION {
            return Err(invalid(format!("unsupported pool version {}", self.version)));
        }
        if self.base_mint == self.quote_mint {
            return Err(invalid("base and quote mints are identical".into()));
        }
        if self.base_vault == self.quote_vault {
            return Err(invalid("base and quote vaults are identical".into()));
        }
        Ok(())
    }

    /// Whether this pool trades exactly the pair `{a, b}`, in either order.
    pub fn matches_pair(&self, a: &Pubkey, b: &Pubkey) -> bool {
        (self.base_mint == *a && self.quote_mint == *b)
            || (self.base_mint == *b && self.quote_mint == *a)
    }

    /// Whether `mint` is one of the pool's two mints.
    pub fn has_mint(&self, mint: &Pubkey) -> bool {
        self.base_mint == *mint || self.quote_mint == *mint
    }

    /// `true` for base→quote. Swapping toward the quote mint sells base.
    pub fn swap_direction(&self, mint_in: &Pubkey, mint_out: &Pubkey) -> Result<bool, QuoteError> {
        for mint in [mint_in, mint_out] {
            if !self.has_mint(mint) {
                return Err(QuoteError::MintNotInPool(*mint));
            }
        }
        if mint_in == mint_out {
            return Err(QuoteError::MintNotInPool(*mint_out));
        }
        Ok(self.quote_mint == *mint_out)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A structurally valid pool on `base`/`quote` with unique addresses elsewhere.
    pub fn pool_keys(base: Pubkey, quote: Pubkey) -> PoolKeys {
        PoolKeys {
            id:                     Pubkey::new_unique(),
            base_mint:              base,
            quote_mint:             quote,
            lp_mint:                Pubkey::new_unique(),
            base_decimals:          9,
            quote_decimals:         6,
            lp_decimals:            9,
            version:                POOL_VERSION,
            program_id:             AmmProgram::raydium_v4().id,
            authority:              AmmProgram::raydium_v4().authority,
            nonce:                  254,
            open_orders:            Pubkey::new_unique(),
            target_orders:          Pubkey::new_unique(),
            base_vault:             Pubkey::new_unique(),
            quote_vault:            Pubkey::new_unique(),
            withdraw_queue:         Pubkey::new_unique(),
            lp_vault:               Pubkey::new_unique(),
            market_version:         MARKET_VERSION,
            market_program_id:      Pubkey::new_unique(),
            market_id:              Pubkey::new_unique(),
            market_authority:       Some(Pubkey::new_unique()),
            market_authority_nonce: Some(1),
            market_base_vault:      Pubkey::new_unique(),
            market_quote_vault:     Pubkey::new_unique(),
            market_bids:            Pubkey::new_unique(),
            market_asks:            Pubkey::new_unique(),
            market_event_queue:     Pubkey::new_unique(),
        }
    }
}
