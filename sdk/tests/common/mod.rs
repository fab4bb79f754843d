//! In-memory ledger and on-chain fixtures for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use ray_swap_sdk::{
    error::LedgerError,
    state::{AMM_STATE_LEN, MARKET_STATE_LEN, OPEN_ORDERS_LEN},
    Checkpoint, Ledger, OwnerTokenAccount, SimulationReport,
};
use solana_sdk::{
    hash::Hash, program_option::COption, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use spl_token::state::{Account as TokenAccount, AccountState};

// ─── Mock ledger ──────────────────────────────────────────────────────────────

pub struct MockLedger {
    accounts:       Mutex<HashMap<Pubkey, Vec<u8>>>,
    token_accounts: Mutex<Vec<OwnerTokenAccount>>,
    block_height:   AtomicU64,
    checkpoint:     Checkpoint,
    pub sent:       Mutex<Vec<(VersionedTransaction, usize)>>,
    pub simulated:  Mutex<Vec<VersionedTransaction>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            accounts:       Mutex::new(HashMap::new()),
            token_accounts: Mutex::new(Vec::new()),
            block_height:   AtomicU64::new(100),
            checkpoint:     Checkpoint { blockhash: Hash::new_unique(), last_valid_block_height: 250 },
            sent:           Mutex::new(Vec::new()),
            simulated:      Mutex::new(Vec::new()),
        }
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().insert(address, data);
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.accounts.lock().remove(address);
    }

    pub fn add_token_account(&self, account: OwnerTokenAccount) {
        self.token_accounts.lock().push(account);
    }

    pub fn set_block_height(&self, height: u64) {
        self.block_height.store(height, Ordering::SeqCst);
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn account_data(&self, address: &Pubkey) -> Result<Vec<u8>, LedgerError> {
        self.accounts
            .lock()
            .get(address)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(*address))
    }

    async fn latest_checkpoint(&self) -> Result<Checkpoint, LedgerError> {
        Ok(self.checkpoint)
    }

    async fn block_height(&self) -> Result<u64, LedgerError> {
        Ok(self.block_height.load(Ordering::SeqCst))
    }

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<OwnerTokenAccount>, LedgerError> {
        Ok(self
            .token_accounts
            .lock()
            .iter()
            .filter(|a| a.account.owner == *owner)
            .cloned()
            .collect())
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        max_retries: usize,
    ) -> Result<Signature, LedgerError> {
        let sig = transaction
            .signatures
            .first()
            .copied()
            .ok_or_else(|| LedgerError::Transport("unsigned transaction".into()))?;
        self.sent.lock().push((transaction.clone(), max_retries));
        Ok(sig)
    }

    async fn simulate_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<SimulationReport, LedgerError> {
        self.simulated.lock().push(transaction.clone());
        Ok(SimulationReport {
            success:        true,
            error:          None,
            logs:           vec!["Program log: ray_log: swap".into()],
            units_consumed: Some(42_000),
        })
    }
}

// ─── On-chain fixtures ────────────────────────────────────────────────────────

/// Addresses of a pool seeded into a [`MockLedger`].
pub struct SeededPool {
    pub id:          Pubkey,
    pub base_mint:   Pubkey,
    pub quote_mint:  Pubkey,
    pub market_id:   Pubkey,
    pub base_vault:  Pubkey,
    pub quote_vault: Pubkey,
}

/// Seed a pool with the given reserves, zero swap fee, 6/6 decimals.
pub fn seed_pool(ledger: &MockLedger, base_reserve: u64, quote_reserve: u64) -> SeededPool {
    let pool = SeededPool {
        id:          Pubkey::new_unique(),
        base_mint:   Pubkey::new_unique(),
        quote_mint:  Pubkey::new_unique(),
        market_id:   Pubkey::new_unique(),
        base_vault:  Pubkey::new_unique(),
        quote_vault: Pubkey::new_unique(),
    };
    let market_program = Pubkey::new_unique();
    let open_orders = Pubkey::new_unique();
    let lp_mint = Pubkey::new_unique();

    let mut amm = vec![0u8; AMM_STATE_LEN];
    put_u64(&mut amm, 0, 6);
    put_u64(&mut amm, 8, 254);
    put_u64(&mut amm, 32, 6);
    put_u64(&mut amm, 40, 6);
    put_u64(&mut amm, 176, 0);
    put_u64(&mut amm, 184, 10_000);
    for (offset, key) in [
        (336, pool.base_vault),
        (368, pool.quote_vault),
        (400, pool.base_mint),
        (432, pool.quote_mint),
        (464, lp_mint),
        (496, open_orders),
        (528, pool.market_id),
        (560, market_program),
        (592, Pubkey::new_unique()),
        (624, Pubkey::new_unique()),
        (656, Pubkey::new_unique()),
    ] {
        put_key(&mut amm, offset, &key);
    }

    let mut market = vec![0u8; MARKET_STATE_LEN];
    for offset in [117, 165, 253, 285, 317] {
        put_key(&mut market, offset, &Pubkey::new_unique());
    }

    let mut mint = vec![0u8; 82];
    put_u64(&mut mint, 36, 1_000_000);

    ledger.set_account(pool.id, amm);
    ledger.set_account(pool.market_id, market);
    ledger.set_account(pool.base_vault, token_account_bytes(&pool.base_mint, base_reserve));
    ledger.set_account(pool.quote_vault, token_account_bytes(&pool.quote_mint, quote_reserve));
    ledger.set_account(open_orders, vec![0u8; OPEN_ORDERS_LEN]);
    ledger.set_account(lp_mint, mint);
    pool
}

pub fn owner_token_account(owner: &Pubkey, mint: &Pubkey, amount: u64) -> OwnerTokenAccount {
    OwnerTokenAccount {
        address:    Pubkey::new_unique(),
        program_id: spl_token::id(),
        account:    TokenAccount {
            mint: *mint,
            owner: *owner,
            amount,
            delegate: COption::None,
            state: AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        },
    }
}

fn token_account_bytes(mint: &Pubkey, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; 165];
    put_key(&mut data, 0, mint);
    put_u64(&mut data, 64, amount);
    data
}

fn put_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn put_key(buf: &mut [u8], offset: usize, key: &Pubkey) {
    buf[offset..offset + 32].copy_from_slice(key.as_ref());
}
