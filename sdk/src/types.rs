//! Request and result records for the swap pipeline.

use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::{
    instructions::FixedSide,
    math::{Quote, Slippage},
    transaction::TxFormat,
};

/// Default priority fee, micro-lamports per compute unit.
pub const DEFAULT_PRIORITY_FEE: u64 = 1_500_000;
/// Default retry budget handed to the RPC node on send.
pub const DEFAULT_MAX_RETRIES: usize = 20;

/// Submit the swap, or only dry-run it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Send,
    Simulate,
}

/// Parameters for [`crate::SwapClient::swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapParams {
    pub mint_in:      Pubkey,
    pub mint_out:     Pubkey,
    /// Raw atomic units of `mint_in`.
    pub amount_in:    u64,
    pub fixed_side:   FixedSide,
    pub format:       TxFormat,
    pub slippage:     Slippage,
    /// Micro-lamports per compute unit; `0` skips the compute-budget instruction.
    pub priority_fee: u64,
    pub max_retries:  usize,
    pub mode:         ExecutionMode,
}

impl SwapParams {
    /// Exact-input, versioned, 5% slippage, sent for inclusion.
    pub fn new(mint_in: Pubkey, mint_out: Pubkey, amount_in: u64) -> Self {
        Self {
            mint_in,
            mint_out,
            amount_in,
            fixed_side:   FixedSide::default(),
            format:       TxFormat::default(),
            slippage:     Slippage::default(),
            priority_fee: DEFAULT_PRIORITY_FEE,
            max_retries:  DEFAULT_MAX_RETRIES,
            mode:         ExecutionMode::default(),
        }
    }
}

/// Result of a dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub success:        bool,
    pub error:          Option<String>,
    pub logs:           Vec<String>,
    pub units_consumed: Option<u64>,
}

/// What happened to the built transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// Accepted into the submission queue. Not a confirmation.
    Sent(Signature),
    Simulated(SimulationReport),
}

/// Returned by [`crate::SwapClient::swap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResult {
    pub pool:      Pubkey,
    pub quote:     Quote,
    pub execution: Execution,
}

impl SwapResult {
    pub fn signature(&self) -> Option<&Signature> {
        match &self.execution {
            Execution::Sent(sig) => Some(sig),
            Execution::Simulated(_) => None,
        }
    }
}
