//! Submitting and simulating built swap transactions.

use std::sync::Arc;

use log::{debug, info};
use solana_sdk::{
    signature::{Keypair, Signature},
    transaction::{Transaction, VersionedTransaction},
};

use crate::{
    error::BroadcastError,
    ledger::{Checkpoint, Ledger},
    transaction::SwapTransaction,
    types::SimulationReport,
};

/// Sends or dry-runs transactions through the injected [`Ledger`].
///
/// Every call first checks that the transaction's checkpoint is still
/// valid; an expired one fails with [`BroadcastError::CheckpointExpired`]
/// and is never retried.
pub struct Broadcaster {
    ledger: Arc<dyn Ledger>,
}

impl Broadcaster {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Submit for inclusion, dispatching on format.
    ///
    /// `signers` is used only for legacy transactions. The returned signature
    /// means the node accepted the transaction, not that it landed.
    pub async fn send(
        &self,
        tx:          &SwapTransaction,
        signers:     &[&Keypair],
        max_retries: usize,
    ) -> Result<Signature, BroadcastError> {
        match tx {
            SwapTransaction::Legacy { transaction, checkpoint } => {
                self.send_legacy(transaction, checkpoint, signers, max_retries).await
            }
            SwapTransaction::Versioned { transaction, checkpoint } => {
                self.send_versioned(transaction, checkpoint, max_retries).await
            }
        }
    }

    /// Dry-run without submission, dispatching on format.
    pub async fn simulate(
        &self,
        tx:      &SwapTransaction,
        signers: &[&Keypair],
    ) -> Result<SimulationReport, BroadcastError> {
        match tx {
            SwapTransaction::Legacy { transaction, checkpoint } => {
                self.simulate_legacy(transaction, checkpoint, signers).await
            }
            SwapTransaction::Versioned { transaction, checkpoint } => {
                self.simulate_versioned(transaction, checkpoint).await
            }
        }
    }

    pub async fn send_legacy(
        &self,
        transaction: &Transaction,
        checkpoint:  &Checkpoint,
        signers:     &[&Keypair],
        max_retries: usize,
    ) -> Result<Signature, BroadcastError> {
        self.ensure_live(checkpoint).await?;
        let signed = sign_legacy(transaction, checkpoint, signers)?;
        let sig = self.ledger.send_transaction(&signed, max_retries).await?;
        info!("sent legacy transaction {sig}");
        Ok(sig)
    }

    pub async fn send_versioned(
        &self,
        transaction: &VersionedTransaction,
        checkpoint:  &Checkpoint,
        max_retries: usize,
    ) -> Result<Signature, BroadcastError> {
        self.ensure_live(checkpoint).await?;
        let sig = self.ledger.send_transaction(transaction, max_retries).await?;
        info!("sent versioned transaction {sig}");
        Ok(sig)
    }

    pub async fn simulate_legacy(
        &self,
        transaction: &Transaction,
        checkpoint:  &Checkpoint,
        signers:     &[&Keypair],
    ) -> Result<SimulationReport, BroadcastError> {
        self.ensure_live(checkpoint).await?;
        let signed = sign_legacy(transaction, checkpoint, signers)?;
        Ok(self.ledger.simulate_transaction(&signed).await?)
    }

    pub async fn simulate_versioned(
        &self,
        transaction: &VersionedTransaction,
        checkpoint:  &Checkpoint,
    ) -> Result<SimulationReport, BroadcastError> {
        self.ensure_live(checkpoint).await?;
        Ok(self.ledger.simulate_transaction(transaction).await?)
    }

    async fn ensure_live(&self, checkpoint: &Checkpoint) -> Result<(), BroadcastError> {
        let current_block_height = self.ledger.block_height().await?;
        debug!(
            "block height {current_block_height}, checkpoint valid through {}",
            checkpoint.last_valid_block_height
        );
        if current_block_height > checkpoint.last_valid_block_height {
            return Err(BroadcastError::CheckpointExpired {
                last_valid_block_height: checkpoint.last_valid_block_height,
                current_block_height,
            });
        }
        Ok(())
    }
}

fn sign_legacy(
    transaction: &Transaction,
    checkpoint:  &Checkpoint,
    signers:     &[&Keypair],
) -> Result<VersionedTransaction, BroadcastError> {
    let mut signed = transaction.clone();
    signed.try_sign(signers, checkpoint.blockhash)?;
    Ok(VersionedTransaction::from(signed))
}
