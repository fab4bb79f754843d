//! The ledger RPC capability every network-bound step goes through.
//!
//! [`Ledger`] is injected (as `Arc<dyn Ledger>`) into the resolver, the
//! transaction builder and the broadcaster. The production implementation
//! is the nonblocking Solana [`RpcClient`]; tests substitute an in-memory
//! double.

use async_trait::async_trait;
use log::warn;
use std::str::FromStr;

use solana_account_decoder_client_types::UiAccountData;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig},
    rpc_request::TokenAccountsFilter,
    rpc_response::RpcKeyedAccount,
};
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction,
};
use spl_token::state::{Account as TokenAccount, AccountState};

use crate::{error::LedgerError, state::parse_token_account, types::SimulationReport};

/// A recent blockhash and the last block height at which it is accepted.
///
/// Single-use: a transaction bound to a checkpoint fails once the cluster
/// passes `last_valid_block_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub blockhash:               Hash,
    pub last_valid_block_height: u64,
}

/// One token-holding account owned by the signer.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerTokenAccount {
    pub address:    Pubkey,
    pub program_id: Pubkey,
    pub account:    TokenAccount,
}

impl OwnerTokenAccount {
    pub fn mint(&self) -> Pubkey {
        self.account.mint
    }

    pub fn amount(&self) -> u64 {
        self.account.amount
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Raw data of an existing account.
    async fn account_data(&self, address: &Pubkey) -> Result<Vec<u8>, LedgerError>;

    async fn latest_checkpoint(&self) -> Result<Checkpoint, LedgerError>;

    async fn block_height(&self) -> Result<u64, LedgerError>;

    /// Every SPL token account owned by `owner`, freshly fetched.
    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<OwnerTokenAccount>, LedgerError>;

    /// Submit without preflight; `max_retries` is handed to the RPC node.
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        max_retries: usize,
    ) -> Result<Signature, LedgerError>;

    async fn simulate_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<SimulationReport, LedgerError>;
}

#[async_trait]
impl Ledger for RpcClient {
    async fn account_data(&self, address: &Pubkey) -> Result<Vec<u8>, LedgerError> {
        self.get_account_with_commitment(address, self.commitment())
            .await?
            .value
            .map(|account| account.data)
            .ok_or(LedgerError::AccountNotFound(*address))
    }

    async fn latest_checkpoint(&self) -> Result<Checkpoint, LedgerError> {
        let (blockhash, last_valid_block_height) =
            self.get_latest_blockhash_with_commitment(self.commitment()).await?;
        Ok(Checkpoint { blockhash, last_valid_block_height })
    }

    async fn block_height(&self) -> Result<u64, LedgerError> {
        Ok(self.get_block_height().await?)
    }

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<OwnerTokenAccount>, LedgerError> {
        let keyed = self
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(spl_token::id()))
            .await?;
        Ok(owner_token_accounts(keyed))
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        max_retries: usize,
    ) -> Result<Signature, LedgerError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            max_retries:    Some(max_retries),
            ..Default::default()
        };
        Ok(self.send_transaction_with_config(transaction, config).await?)
    }

    async fn simulate_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<SimulationReport, LedgerError> {
        let config = RpcSimulateTransactionConfig {
            commitment: Some(self.commitment()),
            ..Default::default()
        };
        let result = self
            .simulate_transaction_with_config(transaction, config)
            .await?
            .value;

        Ok(SimulationReport {
            success:        result.err.is_none(),
            error:          result.err.map(|e| e.to_string()),
            logs:           result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
        })
    }
}

/// Decode an RPC token-account listing, skipping entries that do not decode.
///
/// Handles both raw (base64 / base58) and `jsonParsed` payloads.
pub(crate) fn owner_token_accounts(keyed: Vec<RpcKeyedAccount>) -> Vec<OwnerTokenAccount> {
    keyed
        .into_iter()
        .filter_map(|entry| match decode_keyed(&entry) {
            Ok(account) => Some(account),
            Err(e) => {
                warn!("skipping token account {}: {e}", entry.pubkey);
                None
            }
        })
        .collect()
}

fn decode_keyed(entry: &RpcKeyedAccount) -> Result<OwnerTokenAccount, String> {
    let address = Pubkey::from_str(&entry.pubkey).map_err(|e| e.to_string())?;
    let program_id = Pubkey::from_str(&entry.account.owner).map_err(|e| e.to_string())?;
    let account = match &entry.account.data {
        UiAccountData::Json(parsed) => token_account_from_json(&parsed.parsed)?,
        data => {
            let bytes = data.decode().ok_or("undecodable account data")?;
            parse_token_account(&bytes).map_err(|e| e.to_string())?
        }
    };
    Ok(OwnerTokenAccount { address, program_id, account })
}

/// Rebuild the fields the swap reads from a `jsonParsed` token account.
fn token_account_from_json(parsed: &serde_json::Value) -> Result<TokenAccount, String> {
    let info = parsed.get("info").ok_or("missing `info`")?;
    let key = |field: &str| -> Result<Pubkey, String> {
        let raw = info.get(field).and_then(|v| v.as_str()).ok_or(format!("missing `{field}`"))?;
        Pubkey::from_str(raw).map_err(|e| format!("`{field}`: {e}"))
    };
    let amount = info
        .get("tokenAmount")
        .and_then(|v| v.get("amount"))
        .and_then(|v| v.as_str())
        .ok_or("missing `tokenAmount.amount`")?
        .parse::<u64>()
        .map_err(|e| format!("`tokenAmount.amount`: {e}"))?;
    let state = match info.get("state").and_then(|v| v.as_str()) {
        Some("initialized") => AccountState::Initialized,
        Some("frozen") => AccountState::Frozen,
        other => return Err(format!("unusable account state {other:?}")),
    };
    Ok(TokenAccount { mint: key("mint")?, owner: key("owner")?, amount, state, ..Default::default() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use solana_account_decoder_client_types::{ParsedAccount, UiAccount, UiAccountEncoding};
    use solana_sdk::program_pack::Pack;

    fn keyed(address: &Pubkey, data: UiAccountData) -> RpcKeyedAccount {
        RpcKeyedAccount {
            pubkey:  address.to_string(),
            account: UiAccount {
                lamports:   2_039_280,
                data,
                owner:      spl_token::id().to_string(),
                executable: false,
                rent_epoch: 0,
                space:      Some(TokenAccount::LEN as u64),
            },
        }
    }

    fn packed(mint: Pubkey, owner: Pubkey, amount: u64) -> Vec<u8> {
        let account = TokenAccount { mint, owner, amount, state: AccountState::Initialized, ..Default::default() };
        let mut buf = vec![0u8; TokenAccount::LEN];
        TokenAccount::pack(account, &mut buf).unwrap();
        buf
    }

    #[test]
    fn binary_and_parsed_listings_decode() {
        let (owner, mint) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (raw_addr, json_addr) = (Pubkey::new_unique(), Pubkey::new_unique());

        let raw = UiAccountData::Binary(STANDARD.encode(packed(mint, owner, 42)), UiAccountEncoding::Base64);
        let parsed = UiAccountData::Json(ParsedAccount {
            program: "spl-token".into(),
            parsed:  serde_json::json!({
                "type": "account",
                "info": {
                    "mint": mint.to_string(),
                    "owner": owner.to_string(),
                    "state": "initialized",
                    "tokenAmount": { "amount": "7", "decimals": 6, "uiAmountString": "0.000007" }
                }
            }),
            space:   TokenAccount::LEN as u64,
        });

        let accounts = owner_token_accounts(vec![keyed(&raw_addr, raw), keyed(&json_addr, parsed)]);
        assert_eq!(accounts.len(), 2);
        assert_eq!((accounts[0].address, accounts[0].amount()), (raw_addr, 42));
        assert_eq!((accounts[1].address, accounts[1].amount()), (json_addr, 7));
        assert!(accounts.iter().all(|a| a.mint() == mint && a.account.owner == owner));
        assert!(accounts.iter().all(|a| a.program_id == spl_token::id()));
    }

    #[test]
    fn undecodable_entries_are_skipped() {
        let good = Pubkey::new_unique();
        let short = UiAccountData::Binary(STANDARD.encode([0u8; 10]), UiAccountEncoding::Base64);
        let garbled = UiAccountData::Binary("%%%".into(), UiAccountEncoding::Base64);
        let no_info = UiAccountData::Json(ParsedAccount {
            program: "spl-token".into(),
            parsed:  serde_json::json!({ "type": "mint" }),
            space:   82,
        });
        let ok = UiAccountData::Binary(
            STANDARD.encode(packed(Pubkey::new_unique(), Pubkey::new_unique(), 1)),
            UiAccountEncoding::Base64,
        );

        let accounts = owner_token_accounts(vec![
            keyed(&Pubkey::new_unique(), short),
            keyed(&Pubkey::new_unique(), garbled),
            keyed(&Pubkey::new_unique(), no_info),
            keyed(&good, ok),
        ]);
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, good);
    }
}
