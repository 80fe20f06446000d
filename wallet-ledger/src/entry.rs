use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallet_common::{Amount, CoreError, Currency, Result};

use crate::account::AccountType;

/// Which side of a double-entry posting a leg represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Debit,
    Credit,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Debit => write!(f, "Debit"),
            EntryType::Credit => write!(f, "Credit"),
        }
    }
}

/// What kind of value an entry moves. Most platform traffic is `Fiat` or
/// `Crypto`; `GameCredit` and `Nft` exist for non-cash settlement paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Fiat,
    Crypto,
    Nft,
    GameCredit,
}

/// One immutable leg of a journal entry. A `JournalEntry` (§4.3) is a
/// balanced collection of these. Once constructed an entry is never mutated
/// in place except to record a reversal link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub transaction_id: String,
    pub account_id: String,
    pub account_type: AccountType,
    pub entry_type: EntryType,
    pub asset_type: AssetType,
    pub amount: Amount,
    pub currency: Currency,
    pub description: String,
    pub idempotency_key: Option<String>,
    pub nft_id: Option<String>,
    pub game_credits: Option<i64>,
    pub balance_after: Option<Amount>,
    pub metadata: HashMap<String, String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub is_reversed: bool,
    pub reversed_by: Option<String>,
}

impl LedgerEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new_entry(
        transaction_id: &str,
        account_id: &str,
        account_type: AccountType,
        entry_type: EntryType,
        asset_type: AssetType,
        amount: Amount,
        currency: Currency,
        description: &str,
        idempotency_key: Option<String>,
        created_by: &str,
    ) -> Self {
        LedgerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: transaction_id.to_string(),
            account_id: account_id.to_string(),
            account_type,
            entry_type,
            asset_type,
            amount,
            currency,
            description: description.to_string(),
            idempotency_key,
            nft_id: None,
            game_credits: None,
            balance_after: None,
            metadata: HashMap::new(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            is_reversed: false,
            reversed_by: None,
        }
    }

    pub fn with_nft_id(mut self, nft_id: impl Into<String>) -> Self {
        self.nft_id = Some(nft_id.into());
        self
    }

    pub fn with_game_credits(mut self, credits: i64) -> Self {
        self.game_credits = Some(credits);
        self
    }

    pub fn with_balance_after(mut self, balance: Amount) -> Self {
        self.balance_after = Some(balance);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// §4.2: an entry must carry a positive amount and a non-empty
    /// description, and it must not already be reversed.
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(CoreError::Validation(format!(
                "ledger entry {} has non-positive amount {}",
                self.id, self.amount
            )));
        }
        if self.description.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "ledger entry {} is missing a description",
                self.id
            )));
        }
        if self.asset_type == AssetType::Nft && self.nft_id.is_none() {
            return Err(CoreError::Validation(format!(
                "ledger entry {} is an NFT leg without an nft_id",
                self.id
            )));
        }
        if self.asset_type == AssetType::GameCredit && self.game_credits.is_none() {
            return Err(CoreError::Validation(format!(
                "ledger entry {} is a game-credit leg without a game_credits value",
                self.id
            )));
        }
        Ok(())
    }

    /// Produces the opposite-type entry that cancels this one (§4.2). The
    /// original is tagged `reversed_by` and must be marked `is_reversed` by
    /// the caller once the reversal has been accepted into a journal.
    pub fn reverse(&mut self, reason: &str, reversed_by: &str) -> LedgerEntry {
        let opposite = match self.entry_type {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        };
        let mut reversal = LedgerEntry::new_entry(
            &self.transaction_id,
            &self.account_id,
            self.account_type,
            opposite,
            self.asset_type,
            self.amount,
            self.currency,
            &format!("REVERSAL: {reason}"),
            self.idempotency_key
                .as_ref()
                .map(|k| format!("{k}_reversal_{}", uuid::Uuid::new_v4())),
            reversed_by,
        );
        reversal.nft_id = self.nft_id.clone();
        reversal.game_credits = self.game_credits;
        reversal = reversal.with_metadata("reverses_entry_id", self.id.clone());

        self.is_reversed = true;
        self.reversed_by = Some(reversal.id.clone());

        reversal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LedgerEntry {
        LedgerEntry::new_entry(
            "tx-1",
            "acc-1",
            AccountType::Asset,
            EntryType::Debit,
            AssetType::Fiat,
            Amount::from_cents(1_000),
            Currency::Usd,
            "test deposit",
            Some("idem-1".to_string()),
            "system",
        )
    }

    #[test]
    fn valid_entry_passes_validation() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let mut entry = sample();
        entry.amount = Amount::ZERO;
        assert!(entry.validate().is_err());
    }

    #[test]
    fn nft_leg_requires_nft_id() {
        let mut entry = sample();
        entry.asset_type = AssetType::Nft;
        assert!(entry.validate().is_err());
        let entry = entry.with_nft_id("nft-42");
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn reverse_flips_type_and_links_both_sides() {
        let mut original = sample();
        let reversal = original.reverse("refund requested", "agent-1");
        assert_eq!(reversal.entry_type, EntryType::Credit);
        assert_eq!(reversal.amount, original.amount);
        assert!(original.is_reversed);
        assert_eq!(original.reversed_by, Some(reversal.id.clone()));
        assert_ne!(reversal.idempotency_key, original.idempotency_key);
    }
}
