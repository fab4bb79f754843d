//! Swap instruction construction for the v4 AMM.
//!
//! [`swap_base_in_ix`] and [`swap_base_out_ix`] encode the raw program
//! instructions. [`RaydiumV4Instructions`] wraps them with the surrounding
//! compute-budget, token-account and SOL-wrapping steps a wallet needs.

use log::debug;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

use crate::{
    error::BuildError,
    ledger::OwnerTokenAccount,
    pool_keys::PoolKeys,
};

/// Which side of the swap is exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FixedSide {
    /// Exact input, bounded minimum output (`swap_base_in`).
    #[default]
    In,
    /// Exact output, bounded maximum input (`swap_base_out`).
    Out,
}

/// Everything an instruction source needs to produce one swap.
#[derive(Debug, Clone, Copy)]
pub struct SwapInstructionParams<'a> {
    pub pool_keys:          &'a PoolKeys,
    pub owner:              Pubkey,
    pub owner_accounts:     &'a [OwnerTokenAccount],
    pub mint_in:            Pubkey,
    pub mint_out:           Pubkey,
    /// Exact input for [`FixedSide::In`]; maximum input for [`FixedSide::Out`].
    pub amount_in:          u64,
    /// Minimum output for [`FixedSide::In`]; exact output for [`FixedSide::Out`].
    pub amount_out:         u64,
    pub fixed_side:         FixedSide,
    /// Priority fee in micro-lamports per compute unit. `0` omits it.
    pub compute_unit_price: u64,
}

/// Produces the ordered instruction list for a swap.
///
/// Steps that do not apply are returned as `None`; the transaction builder
/// drops them before wrapping.
pub trait SwapInstructionSource: Send + Sync {
    fn swap_instructions(
        &self,
        params: &SwapInstructionParams<'_>,
    ) -> Result<Vec<Option<Instruction>>, BuildError>;
}

// ─── Raw AMM instructions ─────────────────────────────────────────────────────

/// `swap_base_in` instruction tag.
pub const SWAP_BASE_IN_TAG: u8 = 9;
/// `swap_base_out` instruction tag.
pub const SWAP_BASE_OUT_TAG: u8 = 11;

/// `tag(1) | first(8 LE) | second(8 LE)`
fn encode_swap(tag: u8, first: u64, second: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(17);
    data.push(tag);
    data.extend_from_slice(&first.to_le_bytes());
    data.extend_from_slice(&second.to_le_bytes());
    data
}

/// Token accounts on the caller's side of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSwapAccounts {
    pub source:      Pubkey,
    pub destination: Pubkey,
    pub owner:       Pubkey,
}

/// The 18 accounts of a v4 swap, in program order.
fn swap_account_metas(
    keys:             &PoolKeys,
    market_authority: Pubkey,
    user:             &UserSwapAccounts,
) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(keys.id, false),
        AccountMeta::new_readonly(keys.authority, false),
        AccountMeta::new(keys.open_orders, false),
        AccountMeta::new(keys.target_orders, false),
        AccountMeta::new(keys.base_vault, false),
        AccountMeta::new(keys.quote_vault, false),
        AccountMeta::new_readonly(keys.market_program_id, false),
        AccountMeta::new(keys.market_id, false),
        AccountMeta::new(keys.market_bids, false),
        AccountMeta::new(keys.market_asks, false),
        AccountMeta::new(keys.market_event_queue, false),
        AccountMeta::new(keys.market_base_vault, false),
        AccountMeta::new(keys.market_quote_vault, false),
        AccountMeta::new_readonly(market_authority, false),
        AccountMeta::new(user.source, false),
        AccountMeta::new(user.destination, false),
        AccountMeta::new_readonly(user.owner, true),
    ]
}

fn market_authority(keys: &PoolKeys) -> Result<Pubkey, BuildError> {
    keys.market_authority
        .ok_or(BuildError::MissingMarketAuthority(keys.id))
}

/// Exact-input swap: spend `amount_in`, receive at least `min_amount_out`.
pub fn swap_base_in_ix(
    keys:           &PoolKeys,
    user:           &UserSwapAccounts,
    amount_in:      u64,
    min_amount_out: u64,
) -> Result<Instruction, BuildError> {
    Ok(Instruction {
        program_id: keys.program_id,
        accounts:   swap_account_metas(keys, market_authority(keys)?, user),
        data:       encode_swap(SWAP_BASE_IN_TAG, amount_in, min_amount_out),
    })
}

/// Exact-output swap: receive `amount_out`, spend at most `max_amount_in`.
pub fn swap_base_out_ix(
    keys:          &PoolKeys,
    user:          &UserSwapAccounts,
    max_amount_in: u64,
    amount_out:    u64,
) -> Result<Instruction, BuildError> {
    Ok(Instruction {
        program_id: keys.program_id,
        accounts:   swap_account_metas(keys, market_authority(keys)?, user),
        data:       encode_swap(SWAP_BASE_OUT_TAG, max_amount_in, amount_out),
    })
}

// ─── Default source ───────────────────────────────────────────────────────────

/// Builds v4 swaps against the owner's existing token accounts.
///
/// Instruction order:
/// 1. compute-unit price
/// 2. idempotent ATA creation for the input (wrapped SOL only)
/// 3. SOL transfer + `sync_native` when the input is wrapped SOL
/// 4. idempotent ATA creation for the output
/// 5. the swap
/// 6. close of any wrapped-SOL account created in this transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct RaydiumV4Instructions;

impl SwapInstructionSource for RaydiumV4Instructions {
    fn swap_instructions(
        &self,
        params: &SwapInstructionParams<'_>,
    ) -> Result<Vec<Option<Instruction>>, BuildError> {
        let owner = params.owner;
        let native = spl_token::native_mint::id();
        let wrap_in = params.mint_in == native;

        let compute_price = (params.compute_unit_price > 0)
            .then(|| ComputeBudgetInstruction::set_compute_unit_price(params.compute_unit_price));

        // ── Input side ───────────────────────────────────────────────────────
        let existing_in = pick_account(params.owner_accounts, &owner, &params.mint_in);
        let mut create_in = None;
        let mut wrap = Vec::new();
        let source = match existing_in {
            Some(address) if !wrap_in => address,
            Some(address) => {
                wrap = wrap_sol(&owner, &address, params.amount_in)?;
                address
            }
            None if wrap_in => {
                let ata = get_associated_token_address(&owner, &native);
                create_in = Some(create_associated_token_account_idempotent(
                    &owner, &owner, &native, &spl_token::id(),
                ));
                wrap = wrap_sol(&owner, &ata, params.amount_in)?;
                ata
            }
            None => return Err(BuildError::MissingSourceAccount(params.mint_in)),
        };

        // ── Output side ──────────────────────────────────────────────────────
        let existing_out = pick_account(params.owner_accounts, &owner, &params.mint_out);
        let (destination, create_out) = match existing_out {
            Some(address) => (address, None),
            None => {
                debug!("creating associated token account for {}", params.mint_out);
                (
                    get_associated_token_address(&owner, &params.mint_out),
                    Some(create_associated_token_account_idempotent(
                        &owner, &owner, &params.mint_out, &spl_token::id(),
                    )),
                )
            }
        };

        let user = UserSwapAccounts { source, destination, owner };
        let swap = match params.fixed_side {
            FixedSide::In => swap_base_in_ix(params.pool_keys, &user, params.amount_in, params.amount_out)?,
            FixedSide::Out => swap_base_out_ix(params.pool_keys, &user, params.amount_in, params.amount_out)?,
        };

        // Unwrap wrapped SOL we created for this swap.
        let close_in = create_in
            .is_some()
            .then(|| close_account(&source, &owner))
            .transpose()?;
        let close_out = (create_out.is_some() && params.mint_out == native)
            .then(|| close_account(&destination, &owner))
            .transpose()?;

        let mut ixs = vec![compute_price, create_in];
        ixs.extend(wrap.into_iter().map(Some));
        ixs.extend([create_out, Some(swap), close_in, close_out]);
        Ok(ixs)
    }
}

/// The owner's account for `mint`: the associated account if held,
/// otherwise the one with the largest balance.
fn pick_account(accounts: &[OwnerTokenAccount], owner: &Pubkey, mint: &Pubkey) -> Option<Pubkey> {
    let ata = get_associated_token_address(owner, mint);
    let held = || accounts.iter().filter(move |a| a.mint() == *mint);
    if held().any(|a| a.address == ata) {
        return Some(ata);
    }
    held().max_by_key(|a| a.amount()).map(|a| a.address)
}

fn wrap_sol(owner: &Pubkey, wsol_account: &Pubkey, lamports: u64) -> Result<Vec<Instruction>, BuildError> {
    let sync = spl_token::instruction::sync_native(&spl_token::id(), wsol_account)
        .map_err(|e| BuildError::Instructions(format!("sync_native: {e}")))?;
    Ok(vec![system_instruction::transfer(owner, wsol_account, lamports), sync])
}

fn close_account(account: &Pubkey, owner: &Pubkey) -> Result<Instruction, BuildError> {
    spl_token::instruction::close_account(&spl_token::id(), account, owner, owner, &[])
        .map_err(|e| BuildError::Instructions(format!("close_account: {e}")))
}
