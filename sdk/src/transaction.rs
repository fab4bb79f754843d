//! Wrapping swap instructions into legacy or versioned transactions.

use std::sync::Arc;

use log::{debug, info};
use solana_sdk::{
    instruction::Instruction,
    message::{v0, Message, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::{Transaction, VersionedTransaction},
};

use crate::{
    error::BuildError,
    instructions::{FixedSide, RaydiumV4Instructions, SwapInstructionParams, SwapInstructionSource},
    ledger::{Checkpoint, Ledger},
    math::Quote,
    pool_keys::PoolKeys,
};

/// Wire format of the assembled transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TxFormat {
    /// Unsigned until broadcast; the signer list is passed at send time.
    Legacy,
    /// Compiled v0 message, signed at build time.
    #[default]
    Versioned,
}

/// A swap transaction bound to the checkpoint it was built against.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapTransaction {
    Legacy {
        transaction: Transaction,
        checkpoint:  Checkpoint,
    },
    Versioned {
        transaction: VersionedTransaction,
        checkpoint:  Checkpoint,
    },
}

impl SwapTransaction {
    pub fn checkpoint(&self) -> &Checkpoint {
        match self {
            Self::Legacy { checkpoint, .. } | Self::Versioned { checkpoint, .. } => checkpoint,
        }
    }

    pub fn format(&self) -> TxFormat {
        match self {
            Self::Legacy { .. } => TxFormat::Legacy,
            Self::Versioned { .. } => TxFormat::Versioned,
        }
    }

    pub fn instruction_count(&self) -> usize {
        match self {
            Self::Legacy { transaction, .. } => transaction.message.instructions.len(),
            Self::Versioned { transaction, .. } => transaction.message.instructions().len(),
        }
    }
}

/// Drop placeholder entries; an empty result is an error.
pub fn assemble(instructions: Vec<Option<Instruction>>) -> Result<Vec<Instruction>, BuildError> {
    let instructions: Vec<Instruction> = instructions.into_iter().flatten().collect();
    if instructions.is_empty() {
        return Err(BuildError::NoInstructions);
    }
    Ok(instructions)
}

/// Unsigned legacy transaction carrying the checkpoint hash and fee payer.
pub fn legacy_transaction(
    instructions: &[Instruction],
    payer:        &Pubkey,
    checkpoint:   Checkpoint,
) -> SwapTransaction {
    let message = Message::new_with_blockhash(instructions, Some(payer), &checkpoint.blockhash);
    SwapTransaction::Legacy { transaction: Transaction::new_unsigned(message), checkpoint }
}

/// v0 transaction compiled against `payer` and signed by it.
pub fn versioned_transaction(
    instructions: &[Instruction],
    payer:        &Keypair,
    checkpoint:   Checkpoint,
) -> Result<SwapTransaction, BuildError> {
    let message = v0::Message::try_compile(&payer.pubkey(), instructions, &[], checkpoint.blockhash)?;
    let transaction = VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])?;
    Ok(SwapTransaction::Versioned { transaction, checkpoint })
}

/// Inputs for one [`TransactionBuilder::build`] call.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub pool_keys:    &'a PoolKeys,
    pub quote:        &'a Quote,
    pub fixed_side:   FixedSide,
    pub format:       TxFormat,
    /// Micro-lamports per compute unit.
    pub priority_fee: u64,
}

/// Turns a quote into a transaction bound to the latest checkpoint.
pub struct TransactionBuilder {
    ledger: Arc<dyn Ledger>,
    source: Arc<dyn SwapInstructionSource>,
}

impl TransactionBuilder {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger, source: Arc::new(RaydiumV4Instructions) }
    }

    /// Replace the instruction source (alternate AMM SDKs, tests).
    pub fn with_instruction_source(mut self, source: Arc<dyn SwapInstructionSource>) -> Self {
        self.source = source;
        self
    }

    pub async fn build(
        &self,
        payer:   &Keypair,
        request: &BuildRequest<'_>,
    ) -> Result<SwapTransaction, BuildError> {
        let owner = payer.pubkey();
        let keys = request.pool_keys;
        let (mint_in, mint_out) = if request.quote.base_in {
            (keys.base_mint, keys.quote_mint)
        } else {
            (keys.quote_mint, keys.base_mint)
        };

        let owner_accounts = self
            .ledger
            .token_accounts_by_owner(&owner)
            .await
            .map_err(BuildError::OwnerAccounts)?;
        debug!("owner {owner} holds {} token accounts", owner_accounts.len());

        let raw = self.source.swap_instructions(&SwapInstructionParams {
            pool_keys:          keys,
            owner,
            owner_accounts:     &owner_accounts,
            mint_in,
            mint_out,
            amount_in:          request.quote.amount_in,
            amount_out:         request.quote.min_amount_out,
            fixed_side:         request.fixed_side,
            compute_unit_price: request.priority_fee,
        })?;
        let instructions = assemble(raw)?;

        let checkpoint = self
            .ledger
            .latest_checkpoint()
            .await
            .map_err(BuildError::Checkpoint)?;

        let tx = match request.format {
            TxFormat::Legacy => legacy_transaction(&instructions, &owner, checkpoint),
            TxFormat::Versioned => versioned_transaction(&instructions, payer, checkpoint)?,
        };
        info!(
            "built {:?} swap transaction with {} instructions (valid through block {})",
            request.format,
            tx.instruction_count(),
            checkpoint.last_valid_block_height
        );
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{hash::Hash, instruction::AccountMeta};

    fn ix(tag: u8) -> Instruction {
        Instruction {
            program_id: Pubkey::new_unique(),
            accounts:   vec![AccountMeta::new(Pubkey::new_unique(), false)],
            data:       vec![tag],
        }
    }

    fn checkpoint() -> Checkpoint {
        Checkpoint { blockhash: Hash::new_unique(), last_valid_block_height: 1_000 }
    }

    #[test]
    fn legacy_build_drops_placeholders() {
        let payer = Pubkey::new_unique();
        let ixs = assemble(vec![Some(ix(1)), None, Some(ix(2)), Some(ix(3))]).unwrap();
        let tx = legacy_transaction(&ixs, &payer, checkpoint());

        assert_eq!(tx.instruction_count(), 3);
        assert_eq!(tx.format(), TxFormat::Legacy);
        let SwapTransaction::Legacy { transaction, .. } = tx else { unreachable!() };
        assert_eq!(transaction.message.account_keys[0], payer);
        assert!(transaction.signatures.iter().all(|s| *s == Default::default()));
    }

    #[test]
    fn versioned_build_is_signed_by_payer() {
        let payer = Keypair::new();
        let cp = checkpoint();
        let ixs = assemble(vec![None, Some(ix(1)), Some(ix(2))]).unwrap();
        let tx = versioned_transaction(&ixs, &payer, cp).unwrap();

        assert_eq!(tx.instruction_count(), 2);
        assert_eq!(tx.checkpoint(), &cp);
        let SwapTransaction::Versioned { transaction, .. } = tx else { unreachable!() };
        assert_eq!(transaction.message.static_account_keys()[0], payer.pubkey());
        assert_eq!(transaction.message.recent_blockhash(), &cp.blockhash);
        assert!(transaction.verify_with_results().iter().all(|ok| *ok));
    }

    #[test]
    fn all_placeholders_is_an_error() {
        assert!(matches!(assemble(vec![None, None]), Err(BuildError::NoInstructions)));
    }
}
