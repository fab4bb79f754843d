//! SDK error types.
//!
//! One enum per pipeline phase, aggregated by [`Error`]. Every phase failure
//! is terminal for the swap that raised it; nothing is persisted in between.

use solana_sdk::{pubkey::Pubkey, signer::SignerError};

// ─── Account layouts ──────────────────────────────────────────────────────────

/// Raw on-chain bytes could not be decoded into the expected layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("{layout} account is {actual} bytes; expected {expected}")]
    TooShort {
        layout:   &'static str,
        expected: usize,
        actual:   usize,
    },

    #[error("{layout} field `{field}` holds {value}, which does not fit its type")]
    FieldOutOfRange {
        layout: &'static str,
        field:  &'static str,
        value:  u64,
    },

    #[error("token account could not be unpacked: {0}")]
    TokenAccount(String),
}

// ─── Ledger transport ─────────────────────────────────────────────────────────

/// Opaque network / transport failure reported by a [`crate::ledger::Ledger`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A Solana JSON-RPC call failed.
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    #[error("account {0} does not exist")]
    AccountNotFound(Pubkey),

    /// Non-RPC transports (test doubles, alternative clients).
    #[error("transport error: {0}")]
    Transport(String),
}

// ─── Pool resolution ──────────────────────────────────────────────────────────

/// The requested pair cannot be swapped: no pool, or the pool state is unreadable.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("pool not found for mints {0} / {1}")]
    PoolNotFound(Pubkey, Pubkey),

    #[error("failed to decode {account}: {source}")]
    Decode {
        account: Pubkey,
        #[source]
        source:  DecodeError,
    },

    #[error("failed to fetch pool state: {0}")]
    Ledger(#[from] LedgerError),

    #[error("pair discovery failed: {0}")]
    Discovery(String),

    #[error("invalid pool keys for {pool}: {reason}")]
    InvalidPoolKeys { pool: Pubkey, reason: String },

    #[error("failed to read pool catalog: {0}")]
    Catalog(String),
}

// ─── Quoting ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("amount_in must be greater than zero")]
    ZeroAmountIn,

    #[error("pool has an empty reserve (reserve_in={reserve_in}, reserve_out={reserve_out})")]
    EmptyReserve { reserve_in: u64, reserve_out: u64 },

    #[error("mint {0} is not one of the pool's mints")]
    MintNotInPool(Pubkey),

    #[error("fee fraction {numerator}/{denominator} is not a proper fraction")]
    InvalidFee { numerator: u64, denominator: u64 },

    #[error("slippage {numerator}/{denominator} must be below 100%")]
    InvalidSlippage { numerator: u64, denominator: u64 },

    /// The trade is too small to produce a positive slippage-bounded output.
    #[error("amount_in {amount_in} yields no output after fees and slippage (out={amount_out}, min={min_amount_out})")]
    OutputTooSmall {
        amount_in:      u64,
        amount_out:     u64,
        min_amount_out: u64,
    },

    #[error("integer overflow in swap math")]
    MathOverflow,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

// ─── Transaction assembly ─────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The market authority search exhausted its nonce range during resolution.
    #[error("pool {0} has no market authority; cannot build the swap instruction")]
    MissingMarketAuthority(Pubkey),

    #[error("owner holds no token account for input mint {0}")]
    MissingSourceAccount(Pubkey),

    #[error("swap instruction construction failed: {0}")]
    Instructions(String),

    #[error("instruction list is empty after dropping placeholders")]
    NoInstructions,

    #[error("failed to fetch latest checkpoint: {0}")]
    Checkpoint(#[source] LedgerError),

    #[error("failed to fetch owner token accounts: {0}")]
    OwnerAccounts(#[source] LedgerError),

    #[error("failed to compile versioned message: {0}")]
    Compile(#[from] solana_sdk::message::CompileError),

    #[error("failed to sign transaction: {0}")]
    Sign(#[from] SignerError),
}

// ─── Broadcast ────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// The transaction cites a blockhash the cluster no longer accepts.
    #[error("checkpoint expired: last valid block height {last_valid_block_height}, current {current_block_height}")]
    CheckpointExpired {
        last_valid_block_height: u64,
        current_block_height:    u64,
    },

    #[error("failed to sign legacy transaction: {0}")]
    Sign(#[from] SignerError),

    #[error("submission failed: {0}")]
    Ledger(#[from] LedgerError),
}

// ─── Aggregate ────────────────────────────────────────────────────────────────

/// All errors returned by the SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
