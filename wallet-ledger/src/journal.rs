use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallet_common::{Amount, CoreError, Currency, Result};

use crate::entry::LedgerEntry;

/// Stable external transaction type strings (§6). These appear in
/// persisted journals and in any audit/query surface, so they must never
/// be renamed once shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    PrizeDistribution,
    EntryFee,
    PlatformFee,
    Subscription,
    Refund,
    Adjustment,
    Hold,
    Release,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::PrizeDistribution => "PRIZE_DISTRIBUTION",
            TransactionType::EntryFee => "ENTRY_FEE",
            TransactionType::PlatformFee => "PLATFORM_FEE",
            TransactionType::Subscription => "SUBSCRIPTION",
            TransactionType::Refund => "REFUND",
            TransactionType::Adjustment => "ADJUSTMENT",
            TransactionType::Hold => "HOLD",
            TransactionType::Release => "RELEASE",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle of a journal entry (§4.3). Only `Posted` journals are final
/// and hash-chained; only a `Posted` journal can be reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalStatus {
    Draft,
    Pending,
    Approved,
    Posted,
    Voided,
    Reversed,
}

fn is_legal_transition(from: JournalStatus, to: JournalStatus) -> bool {
    use JournalStatus::*;
    matches!(
        (from, to),
        (Draft, Pending)
            | (Draft, Voided)
            | (Pending, Approved)
            | (Pending, Voided)
            | (Approved, Posted)
            | (Approved, Voided)
            | (Posted, Reversed)
    )
}

/// A balanced envelope of ledger entries awaiting or recording posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub transaction_type: TransactionType,
    pub reference: String,
    pub external_reference: Option<String>,
    pub description: String,
    pub currency: Currency,
    pub entries: Vec<LedgerEntry>,
    pub total_debit: Amount,
    pub total_credit: Amount,
    pub status: JournalStatus,
    pub resource_owner: Option<String>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub hash: Option<String>,
    pub previous_hash: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl JournalEntry {
    pub fn new_draft(
        transaction_type: TransactionType,
        reference: &str,
        description: &str,
        currency: Currency,
        created_by: &str,
    ) -> Self {
        JournalEntry {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_type,
            reference: reference.to_string(),
            external_reference: None,
            description: description.to_string(),
            currency,
            entries: Vec::new(),
            total_debit: Amount::ZERO,
            total_credit: Amount::ZERO,
            status: JournalStatus::Draft,
            resource_owner: None,
            created_by: created_by.to_string(),
            approved_by: None,
            created_at: Utc::now(),
            approved_at: None,
            posted_at: None,
            hash: None,
            previous_hash: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_resource_owner(mut self, owner: impl Into<String>) -> Self {
        self.resource_owner = Some(owner.into());
        self
    }

    pub fn with_external_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn add_debit(&mut self, entry: LedgerEntry) -> Result<()> {
        if !entry.amount.is_positive() {
            return Err(CoreError::Validation(
                "debit leg must carry a positive amount".to_string(),
            ));
        }
        self.total_debit = self.total_debit + entry.amount;
        self.entries.push(entry);
        Ok(())
    }

    pub fn add_credit(&mut self, entry: LedgerEntry) -> Result<()> {
        if !entry.amount.is_positive() {
            return Err(CoreError::Validation(
                "credit leg must carry a positive amount".to_string(),
            ));
        }
        self.total_credit = self.total_credit + entry.amount;
        self.entries.push(entry);
        Ok(())
    }

    /// §4.3: at least two legs, every leg positive, debits == credits.
    pub fn validate(&self) -> Result<()> {
        if self.entries.len() < 2 {
            return Err(CoreError::Validation(format!(
                "journal {} needs at least two legs, has {}",
                self.id,
                self.entries.len()
            )));
        }
        for entry in &self.entries {
            entry.validate()?;
        }
        if self.total_debit != self.total_credit {
            return Err(CoreError::InvariantViolation(format!(
                "journal {} is unbalanced: debits {} != credits {}",
                self.id, self.total_debit, self.total_credit
            )));
        }
        Ok(())
    }

    fn transition_to(&mut self, to: JournalStatus) -> Result<()> {
        if !is_legal_transition(self.status, to) {
            return Err(CoreError::InvariantViolation(format!(
                "journal {}: illegal transition {:?} -> {:?}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }

    pub fn submit_for_approval(&mut self) -> Result<()> {
        self.validate()?;
        self.transition_to(JournalStatus::Pending)
    }

    pub fn mark_approved(&mut self, approver_id: &str) -> Result<()> {
        self.transition_to(JournalStatus::Approved)?;
        self.approved_by = Some(approver_id.to_string());
        self.approved_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_posted(&mut self) -> Result<()> {
        self.transition_to(JournalStatus::Posted)?;
        self.posted_at = Some(Utc::now());
        Ok(())
    }

    pub fn void(&mut self) -> Result<()> {
        self.transition_to(JournalStatus::Voided)
    }

    /// §4.3: creates the mirror-image journal that cancels a posted one.
    /// Every leg's entry type is swapped; the reference is tagged `REV-`;
    /// the original transitions atomically to `Reversed`.
    pub fn create_reversal(&mut self, reason: &str, creator: &str) -> Result<JournalEntry> {
        if self.status != JournalStatus::Posted {
            return Err(CoreError::InvariantViolation(format!(
                "journal {} can only be reversed from Posted, is {:?}",
                self.id, self.status
            )));
        }

        let mut reversal = JournalEntry::new_draft(
            self.transaction_type,
            &format!("REV-{}", self.reference),
            &format!("Reversal of {}: {reason}", self.reference),
            self.currency,
            creator,
        );
        if let Some(owner) = &self.resource_owner {
            reversal = reversal.with_resource_owner(owner.clone());
        }
        reversal = reversal
            .with_reversed_journal_metadata(&self.id, reason);

        for entry in &mut self.entries {
            let reversed_leg = entry.reverse(reason, creator);
            match reversed_leg.entry_type {
                crate::entry::EntryType::Debit => reversal.add_debit(reversed_leg)?,
                crate::entry::EntryType::Credit => reversal.add_credit(reversed_leg)?,
            }
        }

        self.transition_to(JournalStatus::Reversed)?;
        Ok(reversal)
    }

    fn with_reversed_journal_metadata(mut self, original_id: &str, reason: &str) -> Self {
        self.metadata
            .insert("reverses_journal_id".to_string(), original_id.to_string());
        self.metadata
            .insert("reversal_reason".to_string(), reason.to_string());
        self
    }
}
