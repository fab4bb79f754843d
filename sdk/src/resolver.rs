//! Resolving pools to [`PoolKeys`] and live [`PoolInfo`] snapshots.

use std::sync::Arc;

use log::{debug, info};
use solana_sdk::pubkey::Pubkey;

use crate::{
    authority::AmmProgram,
    discovery::{PoolLocation, PoolLocator},
    error::{QuoteError, ResolutionError},
    ledger::Ledger,
    math::PoolInfo,
    pool_keys::PoolKeys,
    state::{parse_amm, parse_market, parse_mint_supply, parse_open_orders, parse_token_amount},
};

type Result<T> = std::result::Result<T, ResolutionError>;

/// Reads pool state through the injected [`Ledger`].
pub struct PoolKeyResolver {
    ledger:  Arc<dyn Ledger>,
    program: AmmProgram,
}

impl PoolKeyResolver {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger, program: AmmProgram::default() }
    }

    /// Resolve against a different AMM deployment.
    pub fn with_program(mut self, program: AmmProgram) -> Self {
        self.program = program;
        self
    }

    pub fn program(&self) -> &AmmProgram {
        &self.program
    }

    /// Build keys from already-fetched AMM and market account bytes.
    pub fn resolve_accounts(&self, pool_id: Pubkey, amm_data: &[u8], market_data: &[u8]) -> Result<PoolKeys> {
        PoolKeys::from_accounts(&self.program, pool_id, amm_data, market_data)
    }

    /// Fetch and decode the AMM account at `pool_id` and its market.
    pub async fn resolve(&self, pool_id: &Pubkey) -> Result<PoolKeys> {
        let amm_data = self.ledger.account_data(pool_id).await?;
        let amm = parse_amm(&amm_data)
            .map_err(|source| ResolutionError::Decode { account: *pool_id, source })?;
        debug!(
            "pool {pool_id}: base {} quote {} market {}",
            amm.base_mint, amm.quote_mint, amm.market_id
        );

        let market_data = self.ledger.account_data(&amm.market_id).await?;
        let market = parse_market(&market_data)
            .map_err(|source| ResolutionError::Decode { account: amm.market_id, source })?;

        let keys = PoolKeys::from_state(&self.program, *pool_id, &amm, &market)?;
        info!("resolved pool {pool_id} ({} / {})", keys.base_mint, keys.quote_mint);
        Ok(keys)
    }

    /// Locate a pool for `{mint_a, mint_b}` with any strategy and resolve it.
    ///
    /// The resulting keys must trade exactly the requested pair.
    pub async fn resolve_pool(
        &self,
        locator: &dyn PoolLocator,
        mint_a:  &Pubkey,
        mint_b:  &Pubkey,
    ) -> Result<PoolKeys> {
        let keys = match locator.locate(mint_a, mint_b).await? {
            PoolLocation::Address(pool_id) => self.resolve(&pool_id).await?,
            PoolLocation::Keys(keys) => keys,
        };
        if !keys.matches_pair(mint_a, mint_b) {
            return Err(ResolutionError::InvalidPoolKeys {
                pool:   keys.id,
                reason: format!("pool trades {} / {}, not {mint_a} / {mint_b}", keys.base_mint, keys.quote_mint),
            });
        }
        Ok(keys)
    }

    /// Fresh reserves for `keys`. Never cached.
    pub async fn fetch_pool_info(&self, keys: &PoolKeys) -> Result<PoolInfo> {
        let amm_data = self.ledger.account_data(&keys.id).await?;
        let amm = parse_amm(&amm_data)
            .map_err(|source| ResolutionError::Decode { account: keys.id, source })?;

        let base_vault = self.token_amount(&keys.base_vault).await?;
        let quote_vault = self.token_amount(&keys.quote_vault).await?;

        let open_orders_data = self.ledger.account_data(&keys.open_orders).await?;
        let open_orders = parse_open_orders(&open_orders_data)
            .map_err(|source| ResolutionError::Decode { account: keys.open_orders, source })?;

        let lp_mint_data = self.ledger.account_data(&keys.lp_mint).await?;
        let lp_supply = parse_mint_supply(&lp_mint_data)
            .map_err(|source| ResolutionError::Decode { account: keys.lp_mint, source })?;

        let info = PoolInfo::from_balances(&amm, base_vault, quote_vault, &open_orders, lp_supply)
            .map_err(|e| match e {
                QuoteError::Decode(source) => ResolutionError::Decode { account: keys.id, source },
                other => ResolutionError::InvalidPoolKeys { pool: keys.id, reason: other.to_string() },
            })?;
        debug!(
            "pool {} reserves: base {} quote {} (status {})",
            keys.id, info.base_reserve, info.quote_reserve, info.status
        );
        Ok(info)
    }

    async fn token_amount(&self, account: &Pubkey) -> Result<u64> {
        let data = self.ledger.account_data(account).await?;
        parse_token_amount(&data).map_err(|source| ResolutionError::Decode { account: *account, source })
    }
}

