//! Program-derived authorities for the AMM and its order-book market.

use solana_sdk::{pubkey, pubkey::Pubkey};

/// Raydium liquidity pool v4 program.
pub const AMM_V4_PROGRAM_ID: Pubkey =
    pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");

/// Authority PDA owning every v4 pool's vaults and LP mint.
pub const AMM_V4_AUTHORITY: Pubkey =
    pubkey!("5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1");

/// Upper bound (exclusive) on nonces tried by [`derive_market_authority`].
pub const MAX_AUTHORITY_NONCE: u64 = 100;

/// The AMM program a pool is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmmProgram {
    pub id:        Pubkey,
    pub authority: Pubkey,
}

impl AmmProgram {
    pub const fn raydium_v4() -> Self {
        Self { id: AMM_V4_PROGRAM_ID, authority: AMM_V4_AUTHORITY }
    }
}

impl Default for AmmProgram {
    fn default() -> Self {
        Self::raydium_v4()
    }
}

/// A market vault-signer address and the nonce that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketAuthority {
    pub address: Pubkey,
    pub nonce:   u64,
}

/// Derive the market's vault-signer authority.
///
/// Seeds are `[market_id, nonce as u64 LE]` under `program_id`, i.e. the
/// nonce byte followed by seven zero bytes. Candidates that land on the
/// curve are skipped. Returns `None` when no nonce below
/// [`MAX_AUTHORITY_NONCE`] yields an off-curve address.
pub fn derive_market_authority(program_id: &Pubkey, market_id: &Pubkey) -> Option<MarketAuthority> {
    (0..MAX_AUTHORITY_NONCE).find_map(|nonce| {
        Pubkey::create_program_address(&[market_id.as_ref(), &nonce.to_le_bytes()], program_id)
            .ok()
            .map(|address| MarketAuthority { address, nonce })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPENBOOK: Pubkey = pubkey!("srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX");

    #[test]
    fn derivation_is_deterministic() {
        let market = Pubkey::new_unique();
        let first = derive_market_authority(&OPENBOOK, &market);
        let second = derive_market_authority(&OPENBOOK, &market);
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn derived_nonce_is_the_first_off_curve_candidate() {
        let market = Pubkey::new_unique();
        let found = derive_market_authority(&OPENBOOK, &market).unwrap();
        assert!(found.nonce < MAX_AUTHORITY_NONCE);

        let rebuilt = Pubkey::create_program_address(
            &[market.as_ref(), &[found.nonce as u8, 0, 0, 0, 0, 0, 0, 0]],
            &OPENBOOK,
        )
        .unwrap();
        assert_eq!(rebuilt, found.address);

        for lower in 0..found.nonce {
            assert!(Pubkey::create_program_address(
                &[market.as_ref(), &lower.to_le_bytes()],
                &OPENBOOK,
            )
            .is_err());
        }
    }

    #[test]
    fn different_markets_get_different_authorities() {
        let a = derive_market_authority(&OPENBOOK, &Pubkey::new_unique()).unwrap();
        let b = derive_market_authority(&OPENBOOK, &Pubkey::new_unique()).unwrap();
        assert_ne!(a.address, b.address);
    }
}
