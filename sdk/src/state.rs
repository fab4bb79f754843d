//! On-chain account deserialization.
//!
//! Parses raw account bytes for the v4 AMM state (752 bytes), the v3
//! order-book market (388 bytes), the market's open-orders account
//! (3228 bytes) and packed SPL token / mint accounts. All integers are
//! little-endian; every address is a 32-byte public key.

use solana_sdk::{program_pack::Pack, pubkey::Pubkey};
use spl_token::state::Account as TokenAccount;

use crate::error::DecodeError;

type Result<T> = std::result::Result<T, DecodeError>;

// ─── AMM v4 ───────────────────────────────────────────────────────────────────

/// Size of a v4 AMM state account.
pub const AMM_STATE_LEN: usize = 752;

/// Deserialized v4 AMM state.
///
/// Layout:
/// ```text
/// 32 × u64 parameters             0..256   (status, nonce, …, orderbook_to_init_time)
/// swap accounting (u128/u64)    256..336
/// base_vault quote_vault base_mint quote_mint lp_mint open_orders
/// market_id market_program_id target_orders withdraw_queue lp_vault owner
///                               336..720
/// lp_reserve(8)  padding(24)    720..752
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmmState {
    pub status:                  u64,
    pub nonce:                   u64,
    /// Raw on-chain value; see [`AmmState::decimals`].
    pub base_decimal:            u64,
    pub quote_decimal:           u64,
    pub state:                   u64,
    pub trade_fee_numerator:     u64,
    pub trade_fee_denominator:   u64,
    pub swap_fee_numerator:      u64,
    pub swap_fee_denominator:    u64,
    pub base_need_take_pnl:      u64,
    pub quote_need_take_pnl:     u64,
    pub pool_open_time:          u64,
    pub base_vault:              Pubkey,
    pub quote_vault:             Pubkey,
    pub base_mint:               Pubkey,
    pub quote_mint:              Pubkey,
    pub lp_mint:                 Pubkey,
    pub open_orders:             Pubkey,
    pub market_id:               Pubkey,
    pub market_program_id:       Pubkey,
    pub target_orders:           Pubkey,
    pub withdraw_queue:          Pubkey,
    pub lp_vault:                Pubkey,
    pub owner:                   Pubkey,
    pub lp_reserve:              u64,
}

impl AmmState {
    /// `(base, quote)` decimal precision, checked to fit a byte.
    pub fn decimals(&self) -> Result<(u8, u8)> {
        Ok((
            narrow_decimals("base_decimal", self.base_decimal)?,
            narrow_decimals("quote_decimal", self.quote_decimal)?,
        ))
    }
}

fn narrow_decimals(field: &'static str, value: u64) -> Result<u8> {
    u8::try_from(value).map_err(|_| DecodeError::FieldOutOfRange { layout: "AMM v4", field, value })
}

/// Deserialize a v4 AMM state account from raw bytes.
///
/// Total for any buffer of at least [`AMM_STATE_LEN`] bytes.
pub fn parse_amm(data: &[u8]) -> Result<AmmState> {
    ensure_len("AMM v4", data, AMM_STATE_LEN)?;
    Ok(AmmState {
        status:                read_u64(data, 0),
        nonce:                 read_u64(data, 8),
        base_decimal:          read_u64(data, 32),
        quote_decimal:         read_u64(data, 40),
        state:                 read_u64(data, 48),
        trade_fee_numerator:   read_u64(data, 144),
        trade_fee_denominator: read_u64(data, 152),
        swap_fee_numerator:    read_u64(data, 176),
        swap_fee_denominator:  read_u64(data, 184),
        base_need_take_pnl:    read_u64(data, 192),
        quote_need_take_pnl:   read_u64(data, 200),
        pool_open_time:        read_u64(data, 224),
        base_vault:            read_pubkey(data, 336),
        quote_vault:           read_pubkey(data, 368),
        base_mint:             read_pubkey(data, 400),
        quote_mint:            read_pubkey(data, 432),
        lp_mint:               read_pubkey(data, 464),
        open_orders:           read_pubkey(data, 496),
        market_id:             read_pubkey(data, 528),
        market_program_id:     read_pubkey(data, 560),
        target_orders:         read_pubkey(data, 592),
        withdraw_queue:        read_pubkey(data, 624),
        lp_vault:              read_pubkey(data, 656),
        owner:                 read_pubkey(data, 688),
        lp_reserve:            read_u64(data, 720),
    })
}

// ─── Market v3 ────────────────────────────────────────────────────────────────

/// Size of a v3 order-book market account.
pub const MARKET_STATE_LEN: usize = 388;

/// Deserialized v3 order-book market state.
///
/// Layout:
/// ```text
/// padding(5)  account_flags(8)  own_address(32)  vault_signer_nonce(8)
/// base_mint(32)  quote_mint(32)  base_vault(32)  base_deposits_total(8)
/// base_fees_accrued(8)  quote_vault(32)  quote_deposits_total(8)
/// quote_fees_accrued(8)  quote_dust_threshold(8)  request_queue(32)
/// event_queue(32)  bids(32)  asks(32)  base_lot_size(8)  quote_lot_size(8)
/// fee_rate_bps(8)  referrer_rebates_accrued(8)  padding(7)  = 388 bytes
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketState {
    pub own_address:        Pubkey,
    pub vault_signer_nonce: u64,
    pub base_mint:          Pubkey,
    pub quote_mint:         Pubkey,
    pub base_vault:         Pubkey,
    pub quote_vault:        Pubkey,
    pub request_queue:      Pubkey,
    pub event_queue:        Pubkey,
    pub bids:               Pubkey,
    pub asks:               Pubkey,
    pub base_lot_size:      u64,
    pub quote_lot_size:     u64,
}

/// Deserialize a v3 market account from raw bytes.
pub fn parse_market(data: &[u8]) -> Result<MarketState> {
    ensure_len("market v3", data, MARKET_STATE_LEN)?;
    Ok(MarketState {
        own_address:        read_pubkey(data, 13),
        vault_signer_nonce: read_u64(data, 45),
        base_mint:          read_pubkey(data, 53),
        quote_mint:         read_pubkey(data, 85),
        base_vault:         read_pubkey(data, 117),
        quote_vault:        read_pubkey(data, 165),
        request_queue:      read_pubkey(data, 221),
        event_queue:        read_pubkey(data, 253),
        bids:               read_pubkey(data, 285),
        asks:               read_pubkey(data, 317),
        base_lot_size:      read_u64(data, 349),
        quote_lot_size:     read_u64(data, 357),
    })
}

// ─── Open orders ──────────────────────────────────────────────────────────────

/// Size of a market open-orders account.
pub const OPEN_ORDERS_LEN: usize = 3228;

/// Balances the AMM keeps parked on the order book.
///
/// Layout: `padding(5) account_flags(8) market(32) owner(32)
/// base_free(8) base_total(8) quote_free(8) quote_total(8) …`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOrdersState {
    pub base_token_free:   u64,
    pub base_token_total:  u64,
    pub quote_token_free:  u64,
    pub quote_token_total: u64,
}

pub fn parse_open_orders(data: &[u8]) -> Result<OpenOrdersState> {
    ensure_len("open orders", data, OPEN_ORDERS_LEN)?;
    Ok(OpenOrdersState {
        base_token_free:   read_u64(data, 77),
        base_token_total:  read_u64(data, 85),
        quote_token_free:  read_u64(data, 93),
        quote_token_total: read_u64(data, 101),
    })
}

// ─── SPL token ────────────────────────────────────────────────────────────────

/// Read the `amount` field from a packed SPL token account.
///
/// Token account layout: `mint(32) owner(32) amount(8) …`
pub fn parse_token_amount(data: &[u8]) -> Result<u64> {
    ensure_len("token account", data, 72)?;
    Ok(read_u64(data, 64))
}

/// Read the `supply` field from a packed SPL mint.
///
/// Mint layout: `mint_authority(36) supply(8) decimals(1) …`
pub fn parse_mint_supply(data: &[u8]) -> Result<u64> {
    ensure_len("mint", data, 45)?;
    Ok(read_u64(data, 36))
}

/// Fully unpack an initialized SPL token account.
pub fn parse_token_account(data: &[u8]) -> Result<TokenAccount> {
    TokenAccount::unpack(data).map_err(|e| DecodeError::TokenAccount(e.to_string()))
}

// ─── Byte-slice primitives ────────────────────────────────────────────────────

fn ensure_len(layout: &'static str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(DecodeError::TooShort { layout, expected, actual: data.len() });
    }
    Ok(())
}

// Callers have already checked the buffer length against the layout size.

pub(crate) fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    let mut b = [0u8; 32];
    b.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::from(b)
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(b)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn put_u64(buf: &mut [u8], offset: usize, v: u64) {
        buf[offset..offset + 8].copy_from_slice(&v.to_le_bytes());
    }

    fn put_key(buf: &mut [u8], offset: usize, k: &Pubkey) {
        buf[offset..offset + 32].copy_from_slice(k.as_ref());
    }

    #[test]
    fn amm_fields_land_at_their_offsets() {
        let mut buf = vec![0u8; AMM_STATE_LEN];
        let base_mint = Pubkey::new_unique();
        let market = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        put_u64(&mut buf, 0, 6);
        put_u64(&mut buf, 8, 254);
        put_u64(&mut buf, 32, 9);
        put_u64(&mut buf, 40, 6);
        put_u64(&mut buf, 176, 25);
        put_u64(&mut buf, 184, 10_000);
        put_u64(&mut buf, 200, 77);
        put_key(&mut buf, 400, &base_mint);
        put_key(&mut buf, 528, &market);
        put_key(&mut buf, 688, &owner);
        put_u64(&mut buf, 720, 1_234);

        let amm = parse_amm(&buf).unwrap();
        assert_eq!(amm.status, 6);
        assert_eq!(amm.nonce, 254);
        assert_eq!(amm.base_decimal, 9);
        assert_eq!(amm.quote_decimal, 6);
        assert_eq!((amm.swap_fee_numerator, amm.swap_fee_denominator), (25, 10_000));
        assert_eq!(amm.quote_need_take_pnl, 77);
        assert_eq!(amm.base_mint, base_mint);
        assert_eq!(amm.market_id, market);
        assert_eq!(amm.owner, owner);
        assert_eq!(amm.lp_reserve, 1_234);
    }

    #[test]
    fn truncated_amm_is_rejected() {
        let buf = vec![0u8; AMM_STATE_LEN - 4];
        assert_eq!(
            parse_amm(&buf),
            Err(DecodeError::TooShort { layout: "AMM v4", expected: AMM_STATE_LEN, actual: 748 })
        );
        assert!(parse_amm(&[]).is_err());
    }

    #[test]
    fn amm_decode_is_deterministic() {
        let buf: Vec<u8> = (0..AMM_STATE_LEN).map(|i| (i % 7) as u8).collect();
        assert_eq!(parse_amm(&buf).unwrap(), parse_amm(&buf).unwrap());
    }

    #[test]
    fn oversized_decimals_decode_but_fail_narrowing() {
        let mut buf = vec![0u8; AMM_STATE_LEN];
        put_u64(&mut buf, 32, 300);
        put_u64(&mut buf, 40, 6);
        let amm = parse_amm(&buf).unwrap();
        assert_eq!(amm.base_decimal, 300);
        assert!(matches!(
            amm.decimals(),
            Err(DecodeError::FieldOutOfRange { field: "base_decimal", value: 300, .. })
        ));

        put_u64(&mut buf, 32, 9);
        assert_eq!(parse_amm(&buf).unwrap().decimals(), Ok((9, 6)));
    }

    #[test]
    fn market_fields_land_at_their_offsets() {
        let mut buf = vec![0u8; MARKET_STATE_LEN];
        let quote_vault = Pubkey::new_unique();
        let event_queue = Pubkey::new_unique();
        let asks = Pubkey::new_unique();
        put_u64(&mut buf, 45, 3);
        put_key(&mut buf, 165, &quote_vault);
        put_key(&mut buf, 253, &event_queue);
        put_key(&mut buf, 317, &asks);
        put_u64(&mut buf, 357, 10);

        let market = parse_market(&buf).unwrap();
        assert_eq!(market.vault_signer_nonce, 3);
        assert_eq!(market.quote_vault, quote_vault);
        assert_eq!(market.event_queue, event_queue);
        assert_eq!(market.asks, asks);
        assert_eq!(market.quote_lot_size, 10);
        assert!(parse_market(&buf[..MARKET_STATE_LEN - 1]).is_err());
    }

    #[test]
    fn open_orders_totals() {
        let mut buf = vec![0u8; OPEN_ORDERS_LEN];
        put_u64(&mut buf, 85, 500);
        put_u64(&mut buf, 101, 900);
        let oo = parse_open_orders(&buf).unwrap();
        assert_eq!((oo.base_token_total, oo.quote_token_total), (500, 900));
    }

    #[test]
    fn token_amount_and_mint_supply() {
        let mut token = vec![0u8; 165];
        put_u64(&mut token, 64, 42);
        assert_eq!(parse_token_amount(&token).unwrap(), 42);
        assert!(parse_token_amount(&token[..71]).is_err());

        let mut mint = vec![0u8; 82];
        put_u64(&mut mint, 36, 1_000_000);
        assert_eq!(parse_mint_supply(&mint).unwrap(), 1_000_000);
    }
}
