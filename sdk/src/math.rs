//! Constant-product swap quoting.
//!
//! Integer arithmetic in u128 with exact fractions for prices, so quotes do
//! not drift across the decimal precisions of the two mints.

use std::fmt;

use crate::{
    error::QuoteError,
    state::{AmmState, OpenOrdersState},
};

type Result<T> = std::result::Result<T, QuoteError>;

// ─── Constants ────────────────────────────────────────────────────────────────

/// Default slippage tolerance numerator: 5%.
pub const DEFAULT_SLIPPAGE_NUMERATOR: u64 = 5;
/// Default slippage tolerance denominator.
pub const DEFAULT_SLIPPAGE_DENOMINATOR: u64 = 100;
/// Basis-point denominator.
pub const BPS_DENOMINATOR: u64 = 10_000;

// ─── Fractions ────────────────────────────────────────────────────────────────

/// An exact non-negative rational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    pub numerator:   u128,
    pub denominator: u128,
}

impl Fraction {
    pub const ZERO: Self = Self { numerator: 0, denominator: 1 };

    pub fn new(numerator: u128, denominator: u128) -> Result<Self> {
        if denominator == 0 {
            return Err(QuoteError::MathOverflow);
        }
        Ok(Self { numerator, denominator })
    }

    /// Lossy conversion for display.
    pub fn to_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.*}", p, self.to_f64()),
            None => write!(f, "{}", self.to_f64()),
        }
    }
}

/// A proportional trading fee `numerator / denominator`, charged on the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRate {
    numerator:   u64,
    denominator: u64,
}

impl FeeRate {
    pub const ZERO: Self = Self { numerator: 0, denominator: 1 };

    /// Fails unless `numerator < denominator`.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self> {
        if denominator == 0 || numerator >= denominator {
            return Err(QuoteError::InvalidFee { numerator, denominator });
        }
        Ok(Self { numerator, denominator })
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// Fee on `amount`, rounded up as the AMM program does.
    pub fn fee_on(&self, amount: u64) -> Result<u64> {
        let scaled = (amount as u128)
            .checked_mul(self.numerator as u128)
            .ok_or(QuoteError::MathOverflow)?;
        let fee = scaled.div_ceil(self.denominator as u128);
        u64::try_from(fee).map_err(|_| QuoteError::MathOverflow)
    }
}

/// Fraction of the expected output the caller is willing to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slippage {
    numerator:   u64,
    denominator: u64,
}

impl Slippage {
    /// Fails unless the tolerance is below 100%.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self> {
        if denominator == 0 || numerator >= denominator {
            return Err(QuoteError::InvalidSlippage { numerator, denominator });
        }
        Ok(Self { numerator, denominator })
    }

    pub fn from_bps(bps: u64) -> Result<Self> {
        Self::new(bps, BPS_DENOMINATOR)
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// `floor(amount × (1 − numerator/denominator))`.
    pub fn minimum_of(&self, amount: u64) -> Result<u64> {
        let kept = (amount as u128)
            .checked_mul((self.denominator - self.numerator) as u128)
            .ok_or(QuoteError::MathOverflow)?
            / self.denominator as u128;
        // kept <= amount, so this always fits
        u64::try_from(kept).map_err(|_| QuoteError::MathOverflow)
    }
}

impl Default for Slippage {
    fn default() -> Self {
        Self {
            numerator:   DEFAULT_SLIPPAGE_NUMERATOR,
            denominator: DEFAULT_SLIPPAGE_DENOMINATOR,
        }
    }
}

impl fmt::Display for Slippage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.numerator as f64 * 100.0 / self.denominator as f64)
    }
}

// ─── Pool snapshot ────────────────────────────────────────────────────────────

/// Live reserves of one pool. Fetch a fresh one for every quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolInfo {
    pub status:         u64,
    pub base_reserve:   u64,
    pub quote_reserve:  u64,
    pub base_decimals:  u8,
    pub quote_decimals: u8,
    pub lp_supply:      u64,
    pub fee:            FeeRate,
}

impl PoolInfo {
    /// Combine freshly fetched balances into a snapshot.
    ///
    /// Reserves are `vault + open_orders_total − need_take_pnl`, saturating
    /// at zero.
    pub fn from_balances(
        amm:                &AmmState,
        base_vault_amount:  u64,
        quote_vault_amount: u64,
        open_orders:        &OpenOrdersState,
        lp_supply:          u64,
    ) -> Result<Self> {
        let base_reserve = base_vault_amount
            .saturating_add(open_orders.base_token_total)
            .saturating_sub(amm.base_need_take_pnl);
        let quote_reserve = quote_vault_amount
            .saturating_add(open_orders.quote_token_total)
            .saturating_sub(amm.quote_need_take_pnl);
        let (base_decimals, quote_decimals) = amm.decimals()?;

        Ok(Self {
            status: amm.status,
            base_reserve,
            quote_reserve,
            base_decimals,
            quote_decimals,
            lp_supply,
            fee: FeeRate::new(amm.swap_fee_numerator, amm.swap_fee_denominator)?,
        })
    }

    /// `(reserve_in, reserve_out, decimals_in, decimals_out)` for a direction.
    fn oriented(&self, base_in: bool) -> (u64, u64, u8, u8) {
        if base_in {
            (self.base_reserve, self.quote_reserve, self.base_decimals, self.quote_decimals)
        } else {
            (self.quote_reserve, self.base_reserve, self.quote_decimals, self.base_decimals)
        }
    }
}

// ─── Quote ────────────────────────────────────────────────────────────────────

/// Expected and slippage-bounded output of one swap. Feeds exactly one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    /// `true` when the input is the pool's base mint.
    pub base_in:         bool,
    pub amount_in:       u64,
    /// Trading fee taken from `amount_in`.
    pub fee:             u64,
    pub amount_out:      u64,
    pub min_amount_out:  u64,
    /// Pre-trade marginal price, output per input in UI units.
    pub current_price:   Fraction,
    /// Realised price of this fill, output per input in UI units.
    pub execution_price: Fraction,
    /// Relative shortfall of `execution_price` against `current_price`.
    pub price_impact:    Fraction,
}

/// Quote a swap of `amount_in` raw units against `pool`.
///
/// ```text
/// fee  = ceil(X · num / den)
/// X'   = X − fee
/// out  = floor(Rout · X' / (Rin + X'))      = Rout − Rin·Rout / (Rin + X')
/// min  = floor(out · (1 − slippage))
/// ```
pub fn compute_amount_out(
    pool:      &PoolInfo,
    amount_in: u64,
    base_in:   bool,
    slippage:  Slippage,
) -> Result<Quote> {
    if amount_in == 0 {
        return Err(QuoteError::ZeroAmountIn);
    }
    let (reserve_in, reserve_out, decimals_in, decimals_out) = pool.oriented(base_in);
    if reserve_in == 0 || reserve_out == 0 {
        return Err(QuoteError::EmptyReserve { reserve_in, reserve_out });
    }

    let fee = pool.fee.fee_on(amount_in)?;
    let effective_in = amount_in - fee;

    let r_in  = reserve_in as u128;
    let r_out = reserve_out as u128;
    let x     = effective_in as u128;

    let gross_out = r_out.checked_mul(x).ok_or(QuoteError::MathOverflow)?;
    let amount_out = gross_out
        .checked_div(r_in.checked_add(x).ok_or(QuoteError::MathOverflow)?)
        .ok_or(QuoteError::MathOverflow)?;
    // bounded by reserve_out
    let amount_out = u64::try_from(amount_out).map_err(|_| QuoteError::MathOverflow)?;
    let min_amount_out = slippage.minimum_of(amount_out)?;

    if amount_out == 0 || min_amount_out == 0 {
        return Err(QuoteError::OutputTooSmall { amount_in, amount_out, min_amount_out });
    }

    let current_price = ui_price(reserve_out, reserve_in, decimals_out, decimals_in)?;
    let execution_price = ui_price(amount_out, effective_in, decimals_out, decimals_in)?;

    // (Rout/Rin − out/X') / (Rout/Rin) = (Rout·X' − out·Rin) / (Rout·X')
    let filled = (amount_out as u128)
        .checked_mul(r_in)
        .ok_or(QuoteError::MathOverflow)?;
    let price_impact = Fraction::new(gross_out.saturating_sub(filled), gross_out)?;

    Ok(Quote {
        base_in,
        amount_in,
        fee,
        amount_out,
        min_amount_out,
        current_price,
        execution_price,
        price_impact,
    })
}

/// `(amount_out / 10^decimals_out) / (amount_in / 10^decimals_in)`.
fn ui_price(amount_out: u64, amount_in: u64, decimals_out: u8, decimals_in: u8) -> Result<Fraction> {
    let scale = |decimals: u8| 10u128.checked_pow(decimals as u32).ok_or(QuoteError::MathOverflow);
    let numerator = (amount_out as u128)
        .checked_mul(scale(decimals_in)?)
        .ok_or(QuoteError::MathOverflow)?;
    let denominator = (amount_in as u128)
        .checked_mul(scale(decimals_out)?)
        .ok_or(QuoteError::MathOverflow)?;
    Fraction::new(numerator, denominator)
}
