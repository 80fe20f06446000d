use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use wallet_common::{Amount, CoreError, Currency, Result};

use crate::account::{Account, AccountType};
use crate::chart::{self, STANDARD_CHART};
use crate::entry::{AssetType, EntryType, LedgerEntry};
use crate::hashchain::{self, GENESIS_HASH};
use crate::journal::{JournalEntry, TransactionType};
use crate::storage::JournalWal;

/// Report produced by `trial_balance` (§4.4 supplement): every account's
/// running balance, grouped so callers can assert the books tie out.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrialBalanceReport {
    pub lines: Vec<TrialBalanceLine>,
    pub total_debit_balances: Amount,
    pub total_credit_balances: Amount,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TrialBalanceLine {
    pub account_code: u32,
    pub account_name: String,
    pub account_type: AccountType,
    pub balance: Amount,
}

struct LedgerState {
    accounts_by_id: HashMap<String, Account>,
    accounts_by_code: HashMap<u32, String>,
    user_liability_accounts: HashMap<(String, Currency), String>,
    journals: Vec<JournalEntry>,
    idempotency_keys: HashMap<String, String>,
    last_posted_hash: String,
}

impl LedgerState {
    fn new() -> Self {
        LedgerState {
            accounts_by_id: HashMap::new(),
            accounts_by_code: HashMap::new(),
            user_liability_accounts: HashMap::new(),
            journals: Vec::new(),
            idempotency_keys: HashMap::new(),
            last_posted_hash: GENESIS_HASH.to_string(),
        }
    }

    fn seed_standard_chart(&mut self) {
        for standard in STANDARD_CHART {
            if self.accounts_by_code.contains_key(&standard.code) {
                continue;
            }
            let account = Account::new_system(
                standard.code,
                standard.name,
                standard.account_type,
                chart::default_currency_for_system_accounts(),
            );
            self.accounts_by_code.insert(standard.code, account.id.clone());
            self.accounts_by_id.insert(account.id.clone(), account);
        }
    }

    fn account_by_code(&self, code: u32) -> Result<&Account> {
        let id = self
            .accounts_by_code
            .get(&code)
            .ok_or_else(|| CoreError::NotFound(format!("no account at code {code}")))?;
        self.accounts_by_id
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("account {id} missing from ledger state")))
    }

    /// Looks up (or lazily creates) the liability sub-account backing one
    /// user's balance in one currency. Keyed on the (user_id, currency)
    /// pair, not the user alone, so a user holding both USD and USDC gets
    /// two distinct accounts instead of sharing one whose currency would
    /// otherwise be frozen at first touch.
    fn user_liability_account_id(&mut self, user_id: &str, currency: Currency) -> String {
        let key = (user_id.to_string(), currency);
        if let Some(id) = self.user_liability_accounts.get(&key) {
            return id.clone();
        }
        let code = chart::user_subaccount_code(user_id, currency);
        let account = Account::new_user_subaccount(code, user_id, currency);
        let id = account.id.clone();
        self.user_liability_accounts.insert(key, id.clone());
        self.accounts_by_code.insert(code, id.clone());
        self.accounts_by_id.insert(id.clone(), account);
        id
    }

    fn user_liability_account_id_if_exists(&self, user_id: &str, currency: Currency) -> Option<String> {
        self.user_liability_accounts.get(&(user_id.to_string(), currency)).cloned()
    }

    /// Applies every leg of a balanced journal to its account's balances.
    /// Debit entries increase a debit-normal account and decrease a
    /// credit-normal one; credit entries do the reverse (§3).
    fn apply_journal(&mut self, journal: &mut JournalEntry) -> Result<()> {
        for entry in &mut journal.entries {
            let account = self
                .accounts_by_id
                .get_mut(&entry.account_id)
                .ok_or_else(|| CoreError::NotFound(format!("account {} not found", entry.account_id)))?;

            let increases = match entry.entry_type {
                EntryType::Debit => account.account_type.is_debit_normal(),
                EntryType::Credit => !account.account_type.is_debit_normal(),
            };
            let delta = if increases { entry.amount } else { -entry.amount };
            account.apply_available_delta(delta);
            account.check_invariant()?;
            entry.balance_after = Some(account.available_balance);
        }
        Ok(())
    }
}

/// Coordinates chart-of-accounts bootstrap, balanced posting, hash
/// chaining and persistence. Mirrors the orchestrating-facade role the
/// wider platform's consensus ledger plays, scoped to wallet bookkeeping.
pub struct LedgerService {
    state: Arc<RwLock<LedgerState>>,
    posting_lock: Arc<Mutex<()>>,
    wal: Option<Arc<JournalWal>>,
}

impl LedgerService {
    /// In-memory only; no replay, no persistence. Suitable for tests.
    pub fn new_in_memory() -> Self {
        let mut state = LedgerState::new();
        state.seed_standard_chart();
        LedgerService {
            state: Arc::new(RwLock::new(state)),
            posting_lock: Arc::new(Mutex::new(())),
            wal: None,
        }
    }

    /// Opens (or creates) a WAL-backed ledger under `data_dir`, replaying
    /// any previously posted journals before returning.
    pub async fn open(data_dir: &str) -> Result<Self> {
        let wal = JournalWal::new(data_dir).await?;
        let mut state = LedgerState::new();
        state.seed_standard_chart();

        let journals = wal.read_all().await?;
        let replay_count = journals.len();
        for mut journal in journals {
            state.apply_journal(&mut journal)?;
            if let Some(hash) = &journal.hash {
                state.last_posted_hash = hash.clone();
            }
            state.journals.push(journal);
        }
        if replay_count > 0 {
            tracing::info!(replay_count, "🏛️ replayed posted journals from wal");
        }

        Ok(LedgerService {
            state: Arc::new(RwLock::new(state)),
            posting_lock: Arc::new(Mutex::new(())),
            wal: Some(Arc::new(wal)),
        })
    }

    pub async fn exists_by_idempotency_key(&self, key: &str) -> bool {
        self.state.read().await.idempotency_keys.contains_key(key)
    }

    pub async fn account_by_code(&self, code: u32) -> Result<Account> {
        self.state.read().await.account_by_code(code).cloned()
    }

    /// Ledger-authoritative balance for an account, summed from posted
    /// journal entries rather than the cached running balance — used by
    /// the reconciliation path to detect drift.
    pub async fn compute_balance(&self, account_id: &str) -> Result<Amount> {
        let state = self.state.read().await;
        let account = state
            .accounts_by_id
            .get(account_id)
            .ok_or_else(|| CoreError::NotFound(format!("account {account_id} not found")))?;
        let mut balance = Amount::ZERO;
        for journal in &state.journals {
            if journal.status != crate::journal::JournalStatus::Posted
                && journal.status != crate::journal::JournalStatus::Reversed
            {
                continue;
            }
            for entry in &journal.entries {
                if entry.account_id != account_id {
                    continue;
                }
                let increases = match entry.entry_type {
                    EntryType::Debit => account.account_type.is_debit_normal(),
                    EntryType::Credit => !account.account_type.is_debit_normal(),
                };
                balance = if increases { balance + entry.amount } else { balance - entry.amount };
            }
        }
        Ok(balance)
    }

    /// Ledger-authoritative balance for one (user, currency) pair — the
    /// shape reconciliation actually needs, since a user's liability
    /// sub-account is keyed on both (§4.7). Returns zero for a currency
    /// the user has never transacted in rather than erroring, matching
    /// the wallet aggregate's own zero-default convention.
    pub async fn compute_user_balance(&self, user_id: &str, currency: Currency) -> Result<Amount> {
        let account_id = {
            let state = self.state.read().await;
            state.user_liability_account_id_if_exists(user_id, currency)
        };
        match account_id {
            Some(account_id) => self.compute_balance(&account_id).await,
            None => Ok(Amount::ZERO),
        }
    }

    /// Posts a balanced, already-validated journal: assigns the hash
    /// chain link, applies balance movements, persists to the WAL (if
    /// any) and records its idempotency key. The single posting mutex
    /// serializes this whole section so concurrent callers never
    /// interleave balance movements (§5).
    async fn post(&self, mut journal: JournalEntry, idempotency_key: Option<&str>) -> Result<JournalEntry> {
        let _guard = self.posting_lock.lock().await;

        journal.validate()?;
        journal.submit_for_approval()?;
        journal.mark_approved("system")?;
        journal.mark_posted()?;

        let mut state = self.state.write().await;
        if let Some(key) = idempotency_key {
            if state.idempotency_keys.contains_key(key) {
                return Err(CoreError::DuplicateOperation(format!(
                    "journal with idempotency key {key} already posted"
                )));
            }
        }

        journal.previous_hash = Some(state.last_posted_hash.clone());
        journal.hash = Some(hashchain::compute_hash(&journal, &state.last_posted_hash));

        state.apply_journal(&mut journal)?;
        state.last_posted_hash = journal.hash.clone().unwrap();
        if let Some(key) = idempotency_key {
            state.idempotency_keys.insert(key.to_string(), journal.id.clone());
        }
        state.journals.push(journal.clone());
        drop(state);

        if let Some(wal) = &self.wal {
            wal.append(&journal).await?;
        }

        tracing::info!(
            journal_id = %journal.id,
            transaction_type = %journal.transaction_type,
            "⚖️ posted journal"
        );
        Ok(journal)
    }

    async fn ensure_user_account(&self, user_id: &str, currency: Currency) -> String {
        let mut state = self.state.write().await;
        state.user_liability_account_id(user_id, currency)
    }

    /// §4.4: moves cash from Operating Cash into a user's wallet balance.
    pub async fn deposit(
        &self,
        user_id: &str,
        amount: Amount,
        currency: Currency,
        idempotency_key: Option<&str>,
        created_by: &str,
    ) -> Result<JournalEntry> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("deposit amount must be positive".to_string()));
        }
        let user_account_id = self.ensure_user_account(user_id, currency).await;
        let cash_account_id = self.account_by_code(chart::CODE_OPERATING_CASH).await?.id;

        let mut journal = JournalEntry::new_draft(
            TransactionType::Deposit,
            &format!("DEP-{}", uuid::Uuid::new_v4()),
            &format!("Deposit for user {user_id}"),
            currency,
            created_by,
        )
        .with_resource_owner(user_id);

        journal.add_debit(LedgerEntry::new_entry(
            &journal.id, &cash_account_id, AccountType::Asset, EntryType::Debit, AssetType::Fiat,
            amount, currency, "cash received", idempotency_key.map(|k| k.to_string()), created_by,
        ))?;
        journal.add_credit(LedgerEntry::new_entry(
            &journal.id, &user_account_id, AccountType::Liability, EntryType::Credit, AssetType::Fiat,
            amount, currency, "wallet balance credited", idempotency_key.map(|k| k.to_string()), created_by,
        ))?;

        self.post(journal, idempotency_key).await
    }

    /// §4.4: withdraws from a user's wallet balance, optionally deducting
    /// a processing fee recognized as platform revenue in the same
    /// journal.
    pub async fn withdraw(
        &self,
        user_id: &str,
        amount: Amount,
        fee: Amount,
        currency: Currency,
        idempotency_key: Option<&str>,
        created_by: &str,
    ) -> Result<JournalEntry> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("withdrawal amount must be positive".to_string()));
        }
        if fee.is_negative() || fee > amount {
            return Err(CoreError::Validation("fee must be non-negative and not exceed the withdrawal amount".to_string()));
        }
        let user_account_id = self.ensure_user_account(user_id, currency).await;
        let cash_account_id = self.account_by_code(chart::CODE_OPERATING_CASH).await?.id;

        // `amount` is what leaves the user's wallet balance; the fee is
        // carved out of it rather than added on top, so only `net_amount`
        // (amount - fee) actually leaves Operating Cash (§8 scenario 2).
        let net_amount = amount.checked_sub(fee).ok_or_else(|| {
            CoreError::Validation("withdrawal fee exceeds amount".to_string())
        })?;

        let mut journal = JournalEntry::new_draft(
            TransactionType::Withdrawal,
            &format!("WD-{}", uuid::Uuid::new_v4()),
            &format!("Withdrawal for user {user_id}"),
            currency,
            created_by,
        )
        .with_resource_owner(user_id)
        .with_metadata("fee", fee.to_decimal_string(currency.decimals()))
        .with_metadata("net_amount", net_amount.to_decimal_string(currency.decimals()));

        journal.add_debit(LedgerEntry::new_entry(
            &journal.id, &user_account_id, AccountType::Liability, EntryType::Debit, AssetType::Fiat,
            amount, currency, "wallet balance debited", idempotency_key.map(|k| k.to_string()), created_by,
        ))?;
        if net_amount.is_positive() {
            journal.add_credit(LedgerEntry::new_entry(
                &journal.id, &cash_account_id, AccountType::Asset, EntryType::Credit, AssetType::Fiat,
                net_amount, currency, "cash paid out", None, created_by,
            ))?;
        }
        if fee.is_positive() {
            let fee_account_id = self.account_by_code(chart::CODE_PLATFORM_FEES_REVENUE).await?.id;
            journal.add_credit(LedgerEntry::new_entry(
                &journal.id, &fee_account_id, AccountType::Revenue, EntryType::Credit, AssetType::Fiat,
                fee, currency, "withdrawal processing fee", None, created_by,
            ))?;
        }

        self.post(journal, idempotency_key).await
    }

    /// §4.4: deducts a competition entry fee from a user's wallet into
    /// the prize pool escrow.
    pub async fn entry_fee(
        &self,
        user_id: &str,
        amount: Amount,
        currency: Currency,
        idempotency_key: Option<&str>,
        created_by: &str,
    ) -> Result<JournalEntry> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("entry fee amount must be positive".to_string()));
        }
        let user_account_id = self.ensure_user_account(user_id, currency).await;
        let escrow_account_id = self.account_by_code(chart::CODE_PRIZE_POOL_ESCROW).await?.id;

        let mut journal = JournalEntry::new_draft(
            TransactionType::EntryFee,
            &format!("FEE-{}", uuid::Uuid::new_v4()),
            &format!("Entry fee for user {user_id}"),
            currency,
            created_by,
        )
        .with_resource_owner(user_id);

        journal.add_debit(LedgerEntry::new_entry(
            &journal.id, &user_account_id, AccountType::Liability, EntryType::Debit, AssetType::Fiat,
            amount, currency, "entry fee debited", idempotency_key.map(|k| k.to_string()), created_by,
        ))?;
        journal.add_credit(LedgerEntry::new_entry(
            &journal.id, &escrow_account_id, AccountType::Liability, EntryType::Credit, AssetType::Fiat,
            amount, currency, "moved to prize pool escrow", None, created_by,
        ))?;

        self.post(journal, idempotency_key).await
    }

    /// §4.4: pays a prize out of the escrow into a user's wallet balance.
    pub async fn prize_distribution(
        &self,
        user_id: &str,
        amount: Amount,
        currency: Currency,
        idempotency_key: Option<&str>,
        created_by: &str,
    ) -> Result<JournalEntry> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("prize amount must be positive".to_string()));
        }
        let user_account_id = self.ensure_user_account(user_id, currency).await;
        let escrow_account_id = self.account_by_code(chart::CODE_PRIZE_POOL_ESCROW).await?.id;

        let mut journal = JournalEntry::new_draft(
            TransactionType::PrizeDistribution,
            &format!("PRIZE-{}", uuid::Uuid::new_v4()),
            &format!("Prize distribution for user {user_id}"),
            currency,
            created_by,
        )
        .with_resource_owner(user_id);

        journal.add_debit(LedgerEntry::new_entry(
            &journal.id, &escrow_account_id, AccountType::Liability, EntryType::Debit, AssetType::Fiat,
            amount, currency, "paid out of prize pool escrow", idempotency_key.map(|k| k.to_string()), created_by,
        ))?;
        journal.add_credit(LedgerEntry::new_entry(
            &journal.id, &user_account_id, AccountType::Liability, EntryType::Credit, AssetType::Fiat,
            amount, currency, "wallet balance credited", None, created_by,
        ))?;

        self.post(journal, idempotency_key).await
    }

    /// §4.4 supplement: a manual, non-prize, non-fee correction to a
    /// user's wallet, balanced against Platform Equity. `credit` is
    /// `true` to add funds, `false` to remove them.
    pub async fn adjustment(
        &self,
        user_id: &str,
        amount: Amount,
        currency: Currency,
        credit: bool,
        idempotency_key: Option<&str>,
        created_by: &str,
    ) -> Result<JournalEntry> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("adjustment amount must be positive".to_string()));
        }
        let user_account_id = self.ensure_user_account(user_id, currency).await;
        let equity_account_id = self.account_by_code(chart::CODE_PLATFORM_EQUITY).await?.id;

        let mut journal = JournalEntry::new_draft(
            TransactionType::Adjustment,
            &format!("ADJ-{}", uuid::Uuid::new_v4()),
            &format!("Manual adjustment for user {user_id}"),
            currency,
            created_by,
        )
        .with_resource_owner(user_id);

        if credit {
            journal.add_debit(LedgerEntry::new_entry(
                &journal.id, &equity_account_id, AccountType::Equity, EntryType::Debit, AssetType::Fiat,
                amount, currency, "equity funds an adjustment credit", idempotency_key.map(|k| k.to_string()), created_by,
            ))?;
            journal.add_credit(LedgerEntry::new_entry(
                &journal.id, &user_account_id, AccountType::Liability, EntryType::Credit, AssetType::Fiat,
                amount, currency, "wallet balance credited by adjustment", None, created_by,
            ))?;
        } else {
            journal.add_debit(LedgerEntry::new_entry(
                &journal.id, &user_account_id, AccountType::Liability, EntryType::Debit, AssetType::Fiat,
                amount, currency, "wallet balance debited by adjustment", idempotency_key.map(|k| k.to_string()), created_by,
            ))?;
            journal.add_credit(LedgerEntry::new_entry(
                &journal.id, &equity_account_id, AccountType::Equity, EntryType::Credit, AssetType::Fiat,
                amount, currency, "adjustment debit absorbed by equity", None, created_by,
            ))?;
        }

        self.post(journal, idempotency_key).await
    }

    /// §4.4: moves funds from a user's available balance into Held Funds,
    /// e.g. pending withdrawal review.
    pub async fn hold(
        &self,
        user_id: &str,
        amount: Amount,
        currency: Currency,
        idempotency_key: Option<&str>,
        created_by: &str,
    ) -> Result<JournalEntry> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("hold amount must be positive".to_string()));
        }
        let user_account_id = self.ensure_user_account(user_id, currency).await;
        let held_account_id = self.account_by_code(chart::CODE_HELD_USER_FUNDS).await?.id;

        let mut journal = JournalEntry::new_draft(
            TransactionType::Hold,
            &format!("HOLD-{}", uuid::Uuid::new_v4()),
            &format!("Hold placed for user {user_id}"),
            currency,
            created_by,
        )
        .with_resource_owner(user_id);

        journal.add_debit(LedgerEntry::new_entry(
            &journal.id, &user_account_id, AccountType::Liability, EntryType::Debit, AssetType::Fiat,
            amount, currency, "funds held", idempotency_key.map(|k| k.to_string()), created_by,
        ))?;
        journal.add_credit(LedgerEntry::new_entry(
            &journal.id, &held_account_id, AccountType::Liability, EntryType::Credit, AssetType::Fiat,
            amount, currency, "funds moved to held", None, created_by,
        ))?;

        self.post(journal, idempotency_key).await
    }

    /// §4.4: releases previously held funds back to the user's available
    /// balance.
    pub async fn release(
        &self,
        user_id: &str,
        amount: Amount,
        currency: Currency,
        idempotency_key: Option<&str>,
        created_by: &str,
    ) -> Result<JournalEntry> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("release amount must be positive".to_string()));
        }
        let user_account_id = self.ensure_user_account(user_id, currency).await;
        let held_account_id = self.account_by_code(chart::CODE_HELD_USER_FUNDS).await?.id;

        let mut journal = JournalEntry::new_draft(
            TransactionType::Release,
            &format!("RELEASE-{}", uuid::Uuid::new_v4()),
            &format!("Hold released for user {user_id}"),
            currency,
            created_by,
        )
        .with_resource_owner(user_id);

        journal.add_debit(LedgerEntry::new_entry(
            &journal.id, &held_account_id, AccountType::Liability, EntryType::Debit, AssetType::Fiat,
            amount, currency, "funds released from held", idempotency_key.map(|k| k.to_string()), created_by,
        ))?;
        journal.add_credit(LedgerEntry::new_entry(
            &journal.id, &user_account_id, AccountType::Liability, EntryType::Credit, AssetType::Fiat,
            amount, currency, "funds available again", None, created_by,
        ))?;

        self.post(journal, idempotency_key).await
    }

    /// Reverses a previously posted journal in full. `RecordRefund`
    /// (§4.4) is implemented as a reversal rather than a hand-built
    /// journal, so a refund always exactly undoes its source transaction.
    pub async fn refund(&self, original_journal_id: &str, reason: &str, created_by: &str) -> Result<JournalEntry> {
        let _guard = self.posting_lock.lock().await;
        let mut state = self.state.write().await;

        let index = state
            .journals
            .iter()
            .position(|j| j.id == original_journal_id)
            .ok_or_else(|| CoreError::NotFound(format!("journal {original_journal_id} not found")))?;

        let mut original = state.journals[index].clone();
        let mut reversal = original.create_reversal(reason, created_by)?;

        reversal.previous_hash = Some(state.last_posted_hash.clone());
        reversal.hash = Some(hashchain::compute_hash(&reversal, &state.last_posted_hash));

        state.apply_journal(&mut reversal)?;
        state.last_posted_hash = reversal.hash.clone().unwrap();
        state.journals[index] = original.clone();
        state.journals.push(reversal.clone());
        drop(state);

        if let Some(wal) = &self.wal {
            wal.append(&reversal).await?;
        }

        tracing::info!(original_journal_id, reversal_id = %reversal.id, "🔄 recorded refund as reversal");
        Ok(reversal)
    }

    /// §4.4 supplement: a trial balance across the standard chart, used
    /// by reconciliation and by any future audit surface.
    pub async fn trial_balance(&self) -> TrialBalanceReport {
        let state = self.state.read().await;
        let mut lines = Vec::new();
        let mut total_debit_balances = Amount::ZERO;
        let mut total_credit_balances = Amount::ZERO;

        for account in state.accounts_by_id.values() {
            if account.account_type.is_debit_normal() {
                total_debit_balances = total_debit_balances + account.total_balance;
            } else {
                total_credit_balances = total_credit_balances + account.total_balance;
            }
            lines.push(TrialBalanceLine {
                account_code: account.code,
                account_name: account.name.clone(),
                account_type: account.account_type,
                balance: account.total_balance,
            });
        }
        lines.sort_by_key(|line| line.account_code);

        let is_balanced = (total_debit_balances - total_credit_balances).abs() <= Amount::from_cents(1);
        TrialBalanceReport { lines, total_debit_balances, total_credit_balances, is_balanced }
    }

    /// Walks every posted journal between two ids (inclusive) and checks
    /// that each one is internally balanced and correctly hash-chained to
    /// its predecessor. Used by reconciliation's integrity pass.
    pub async fn verify_chain(&self) -> Result<bool> {
        let state = self.state.read().await;
        let mut previous = GENESIS_HASH.to_string();
        for journal in &state.journals {
            if journal.status != crate::journal::JournalStatus::Posted
                && journal.status != crate::journal::JournalStatus::Reversed
            {
                continue;
            }
            journal.validate()?;
            if journal.previous_hash.as_deref() != Some(previous.as_str()) {
                return Ok(false);
            }
            if !hashchain::verify_link(journal) {
                return Ok(false);
            }
            previous = journal.hash.clone().unwrap();
        }
        Ok(true)
    }

    pub async fn journals_for_owner(&self, owner: &str) -> Vec<JournalEntry> {
        self.state
            .read()
            .await
            .journals
            .iter()
            .filter(|j| j.resource_owner.as_deref() == Some(owner))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deposit_credits_user_and_debits_cash() {
        let ledger = LedgerService::new_in_memory();
        let journal = ledger
            .deposit("alice", Amount::from_cents(10_000), Currency::Usd, Some("idem-1"), "system")
            .await
            .unwrap();
        assert_eq!(journal.status, crate::journal::JournalStatus::Posted);
        assert!(hashchain::verify_link(&journal));
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_is_rejected() {
        let ledger = LedgerService::new_in_memory();
        ledger.deposit("alice", Amount::from_cents(1_000), Currency::Usd, Some("idem-x"), "system").await.unwrap();
        let second = ledger.deposit("alice", Amount::from_cents(1_000), Currency::Usd, Some("idem-x"), "system").await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn withdrawal_with_fee_credits_revenue_account() {
        let ledger = LedgerService::new_in_memory();
        ledger.deposit("bob", Amount::from_cents(20_000), Currency::Usd, None, "system").await.unwrap();
        let journal = ledger
            .withdraw("bob", Amount::from_cents(5_000), Amount::from_cents(150), Currency::Usd, None, "system")
            .await
            .unwrap();
        assert_eq!(journal.entries.len(), 3);
    }

    #[tokio::test]
    async fn withdrawal_records_fee_and_net_amount_metadata() {
        let ledger = LedgerService::new_in_memory();
        ledger.deposit("heidi", Amount::from_cents(10_000), Currency::Usd, None, "system").await.unwrap();
        let journal = ledger
            .withdraw("heidi", Amount::from_cents(5_000), Amount::from_cents(250), Currency::Usd, None, "system")
            .await
            .unwrap();
        assert_eq!(journal.metadata.get("fee").map(String::as_str), Some("2.50"));
        assert_eq!(journal.metadata.get("net_amount").map(String::as_str), Some("47.50"));
    }

    #[tokio::test]
    async fn a_user_with_two_currencies_gets_two_independent_sub_accounts() {
        let ledger = LedgerService::new_in_memory();
        ledger.deposit("ivan", Amount::from_cents(10_000), Currency::Usd, None, "system").await.unwrap();
        ledger.deposit("ivan", Amount::from_cents(2_000_000), Currency::Usdc, None, "system").await.unwrap();

        assert_eq!(ledger.compute_user_balance("ivan", Currency::Usd).await.unwrap(), Amount::from_cents(10_000));
        assert_eq!(ledger.compute_user_balance("ivan", Currency::Usdc).await.unwrap(), Amount::from_cents(2_000_000));
    }

    #[tokio::test]
    async fn entry_fee_then_prize_round_trips_through_escrow() {
        let ledger = LedgerService::new_in_memory();
        ledger.deposit("carol", Amount::from_cents(10_000), Currency::Usd, None, "system").await.unwrap();
        ledger.entry_fee("carol", Amount::from_cents(1_000), Currency::Usd, None, "system").await.unwrap();
        ledger.prize_distribution("carol", Amount::from_cents(2_500), Currency::Usd, None, "system").await.unwrap();

        let escrow = ledger.account_by_code(chart::CODE_PRIZE_POOL_ESCROW).await.unwrap();
        assert_eq!(escrow.total_balance, Amount::from_cents(1_000) - Amount::from_cents(2_500));
    }

    #[tokio::test]
    async fn refund_reverses_original_journal() {
        let ledger = LedgerService::new_in_memory();
        let original = ledger.deposit("dave", Amount::from_cents(5_000), Currency::Usd, None, "system").await.unwrap();
        let reversal = ledger.refund(&original.id, "chargeback", "agent-1").await.unwrap();
        assert_eq!(reversal.total_debit, original.total_debit);

        let balance = ledger.compute_user_balance("dave", Currency::Usd).await.unwrap();
        assert_eq!(balance, Amount::ZERO);
    }

    #[tokio::test]
    async fn adjustment_credit_and_debit_stay_balanced_against_equity() {
        let ledger = LedgerService::new_in_memory();
        ledger.adjustment("gina", Amount::from_cents(2_000), Currency::Usd, true, None, "support-agent").await.unwrap();
        ledger.adjustment("gina", Amount::from_cents(500), Currency::Usd, false, None, "support-agent").await.unwrap();

        let equity = ledger.account_by_code(chart::CODE_PLATFORM_EQUITY).await.unwrap();
        assert_eq!(equity.total_balance, Amount::from_cents(500) - Amount::from_cents(2_000));
        assert!(ledger.trial_balance().await.is_balanced);
    }

    #[tokio::test]
    async fn verify_chain_detects_a_tampered_journal() {
        let ledger = LedgerService::new_in_memory();
        ledger.deposit("erin", Amount::from_cents(1_000), Currency::Usd, None, "system").await.unwrap();
        assert!(ledger.verify_chain().await.unwrap());

        let mut state = ledger.state.write().await;
        state.journals[0].total_debit = state.journals[0].total_debit + Amount::from_cents(1);
        drop(state);
        assert!(!ledger.verify_chain().await.unwrap());
    }

    #[tokio::test]
    async fn trial_balance_ties_out_after_several_postings() {
        let ledger = LedgerService::new_in_memory();
        ledger.deposit("frank", Amount::from_cents(10_000), Currency::Usd, None, "system").await.unwrap();
        ledger.withdraw("frank", Amount::from_cents(2_000), Amount::from_cents(50), Currency::Usd, None, "system").await.unwrap();
        let report = ledger.trial_balance().await;
        assert!(report.is_balanced);
    }
}
