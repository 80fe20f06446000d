use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use wallet_common::{Amount, CoreError, Currency, Result};
use wallet_ledger::{JournalEntry, LedgerEntry, LedgerService};

use crate::audit::{AuditSink, FinancialEvent, TracingAuditSink};
use crate::commands::TransactionQuery;
use crate::wallet::WalletAggregate;

/// Orchestrates a transaction as a saga of ordered steps — post to the
/// ledger, then mutate the in-memory wallet aggregate — running the
/// ledger step's compensating reversal if the wallet step fails (§4.7).
/// A failure of the compensation itself is reported as
/// `CoreError::CompensationFailed` rather than silently swallowed, since
/// at that point the ledger and the wallet have diverged and need manual
/// attention.
pub struct TransactionCoordinator {
    ledger: Arc<LedgerService>,
    wallets: Arc<RwLock<HashMap<String, WalletAggregate>>>,
    audit: Arc<dyn AuditSink>,
}

impl TransactionCoordinator {
    pub fn new(ledger: Arc<LedgerService>) -> Self {
        TransactionCoordinator {
            ledger,
            wallets: Arc::new(RwLock::new(HashMap::new())),
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Exposes the underlying ledger for read-only reporting (trial
    /// balance, chain verification) and for reconciliation, which needs
    /// both this and the wallet repository.
    pub fn ledger(&self) -> &Arc<LedgerService> {
        &self.ledger
    }

    pub async fn wallet_snapshot(&self, user_id: &str) -> WalletAggregate {
        self.wallets
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| WalletAggregate::new(user_id))
    }

    /// Applies `mutate` to the wallet's in-memory copy and, only if it
    /// succeeds and the resulting wallet still satisfies its invariants,
    /// commits it back into the shared map. This folds the "mutate" and
    /// "persist" saga steps into one atomic critical section, since there
    /// is no separate persistence failure mode for an in-memory store.
    async fn apply_wallet_mutation<F>(&self, user_id: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut WalletAggregate) -> Result<()>,
    {
        let mut wallets = self.wallets.write().await;
        let mut wallet = wallets
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| WalletAggregate::new(user_id));
        mutate(&mut wallet)?;
        wallet.validate()?;
        wallets.insert(user_id.to_string(), wallet);
        Ok(())
    }

    /// Reverses the ledger side of a saga after the wallet side failed.
    /// If the reversal itself fails, the ledger and the wallet are left
    /// in a diverged state that no automatic retry can fix.
    async fn compensate_ledger(&self, journal: &JournalEntry, trigger: &CoreError) -> CoreError {
        match self
            .ledger
            .refund(&journal.id, "saga compensation: wallet-side step failed", "saga-coordinator")
            .await
        {
            Ok(_) => trigger.clone(),
            Err(compensation_error) => CoreError::CompensationFailed {
                trigger: trigger.to_string(),
                compensation_error: compensation_error.to_string(),
            },
        }
    }

    async fn emit_audit(&self, event_type: &str, user_id: &str, journal: &JournalEntry, amount: Amount, currency: Currency, actor: &str) {
        let event = FinancialEvent {
            event_type: event_type.to_string(),
            user_id: user_id.to_string(),
            journal_id: journal.id.clone(),
            amount,
            currency,
            actor: actor.to_string(),
            occurred_at: chrono::Utc::now(),
        };
        if let Err(e) = self.audit.record_financial_event(event).await {
            tracing::warn!(error = %e, "audit sink failed; transaction already committed, continuing");
        }
    }

    pub async fn deposit(
        &self,
        user_id: &str,
        amount: Amount,
        currency: Currency,
        idempotency_key: Option<&str>,
        actor: &str,
    ) -> Result<JournalEntry> {
        let journal = self.ledger.deposit(user_id, amount, currency, idempotency_key, actor).await?;

        match self.apply_wallet_mutation(user_id, |w| w.deposit(currency, amount)).await {
            Ok(()) => {
                self.emit_audit("DEPOSIT", user_id, &journal, amount, currency, actor).await;
                Ok(journal)
            }
            Err(e) => Err(self.compensate_ledger(&journal, &e).await),
        }
    }

    /// `amount` is deducted from the wallet in full; `fee` is carved out
    /// of it on the ledger side rather than charged on top (§8 scenario
    /// 2: a $50 withdrawal with a $2.50 fee leaves the wallet $50 lighter,
    /// not $52.50).
    pub async fn withdraw(
        &self,
        user_id: &str,
        amount: Amount,
        fee: Amount,
        currency: Currency,
        idempotency_key: Option<&str>,
        actor: &str,
    ) -> Result<JournalEntry> {
        let journal = self.ledger.withdraw(user_id, amount, fee, currency, idempotency_key, actor).await?;

        match self.apply_wallet_mutation(user_id, |w| w.withdraw(currency, amount)).await {
            Ok(()) => {
                self.emit_audit("WITHDRAWAL", user_id, &journal, amount, currency, actor).await;
                Ok(journal)
            }
            Err(e) => Err(self.compensate_ledger(&journal, &e).await),
        }
    }

    pub async fn deduct_entry_fee(
        &self,
        user_id: &str,
        amount: Amount,
        currency: Currency,
        idempotency_key: Option<&str>,
        actor: &str,
    ) -> Result<JournalEntry> {
        let journal = self.ledger.entry_fee(user_id, amount, currency, idempotency_key, actor).await?;

        match self.apply_wallet_mutation(user_id, |w| w.deduct_entry_fee(currency, amount)).await {
            Ok(()) => {
                self.emit_audit("ENTRY_FEE", user_id, &journal, amount, currency, actor).await;
                Ok(journal)
            }
            Err(e) => Err(self.compensate_ledger(&journal, &e).await),
        }
    }

    pub async fn add_prize(
        &self,
        user_id: &str,
        amount: Amount,
        currency: Currency,
        max_daily_cap: Amount,
        idempotency_key: Option<&str>,
        actor: &str,
    ) -> Result<JournalEntry> {
        // Reject before touching the ledger if the cap is already known to
        // be exceeded, so a doomed prize never posts a journal it would
        // immediately have to compensate.
        {
            let wallets = self.wallets.read().await;
            let mut preview = wallets.get(user_id).cloned().unwrap_or_else(|| WalletAggregate::new(user_id));
            drop(wallets);
            preview.add_prize(currency, amount, max_daily_cap)?;
        }

        let journal = self.ledger.prize_distribution(user_id, amount, currency, idempotency_key, actor).await?;

        match self.apply_wallet_mutation(user_id, |w| w.add_prize(currency, amount, max_daily_cap)).await {
            Ok(()) => {
                self.emit_audit("PRIZE_DISTRIBUTION", user_id, &journal, amount, currency, actor).await;
                Ok(journal)
            }
            Err(e) => Err(self.compensate_ledger(&journal, &e).await),
        }
    }

    /// Reverses a previously posted journal end-to-end: the ledger side
    /// via `LedgerService::refund`, then the wallet side via the
    /// inverse of whichever mutation the original transaction applied.
    /// `amount` and `currency` describe the wallet-side correction, not
    /// the ledger-side one (the ledger derives its own reversal from the
    /// original journal's legs).
    pub async fn refund(
        &self,
        user_id: &str,
        original_journal_id: &str,
        amount: Amount,
        currency: Currency,
        reason: &str,
        actor: &str,
    ) -> Result<JournalEntry> {
        let reversal = self.ledger.refund(original_journal_id, reason, actor).await?;

        // The wallet-side correction has no compensator of its own: if it
        // fails here the ledger has already recorded the reversal, which
        // is the source of truth, and the wallet will re-derive the right
        // balance on the next reconciliation pass.
        self.apply_wallet_mutation(user_id, |w| w.deposit(currency, amount)).await?;
        self.emit_audit("REFUND", user_id, &reversal, amount, currency, actor).await;
        Ok(reversal)
    }

    /// Manual correction that adds funds to a wallet, balanced against
    /// Platform Equity rather than a prize or deposit source (§4.4
    /// supplement's `ADJUSTMENT` type).
    pub async fn credit_wallet(&self, user_id: &str, amount: Amount, currency: Currency, reason: &str, actor: &str) -> Result<JournalEntry> {
        let journal = self.ledger.adjustment(user_id, amount, currency, true, None, actor).await?;
        match self.apply_wallet_mutation(user_id, |w| w.deposit(currency, amount)).await {
            Ok(()) => {
                self.emit_audit("ADJUSTMENT_CREDIT", user_id, &journal, amount, currency, actor).await;
                tracing::info!(user_id, reason, "credited wallet via manual adjustment");
                Ok(journal)
            }
            Err(e) => Err(self.compensate_ledger(&journal, &e).await),
        }
    }

    /// Manual correction that removes funds from a wallet, balanced
    /// against Platform Equity.
    pub async fn debit_wallet(&self, user_id: &str, amount: Amount, currency: Currency, reason: &str, actor: &str) -> Result<JournalEntry> {
        let journal = self.ledger.adjustment(user_id, amount, currency, false, None, actor).await?;
        match self.apply_wallet_mutation(user_id, |w| w.withdraw(currency, amount)).await {
            Ok(()) => {
                self.emit_audit("ADJUSTMENT_DEBIT", user_id, &journal, amount, currency, actor).await;
                tracing::info!(user_id, reason, "debited wallet via manual adjustment");
                Ok(journal)
            }
            Err(e) => Err(self.compensate_ledger(&journal, &e).await),
        }
    }

    /// Executes a `TransactionQuery`: flattens every posted journal owned
    /// by the user into its individual ledger legs, applies the query's
    /// filters, sorts newest-first, and applies offset/limit pagination.
    /// `operation_type` filters on the owning journal's transaction type
    /// (§6) and so is applied before journals are flattened into legs.
    pub async fn get_transactions(&self, query: &TransactionQuery) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self
            .ledger
            .journals_for_owner(&query.user_id)
            .await
            .into_iter()
            .filter(|journal| query.operation_type.map_or(true, |t| t == journal.transaction_type))
            .flat_map(|journal| journal.entries)
            .filter(|entry| query.currency.map_or(true, |c| c == entry.currency))
            .filter(|entry| query.asset_type.map_or(true, |a| a == entry.asset_type))
            .filter(|entry| query.entry_type.map_or(true, |t| t == entry.entry_type))
            .filter(|entry| query.from.map_or(true, |from| entry.created_at >= from))
            .filter(|entry| query.to.map_or(true, |to| entry.created_at <= to))
            .collect();

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> TransactionCoordinator {
        TransactionCoordinator::new(Arc::new(LedgerService::new_in_memory()))
    }

    #[tokio::test]
    async fn deposit_updates_both_ledger_and_wallet() {
        let coordinator = coordinator();
        coordinator
            .deposit("alice", Amount::from_cents(10_000), Currency::Usd, Some("idem-1"), "system")
            .await
            .unwrap();
        let wallet = coordinator.wallet_snapshot("alice").await;
        assert_eq!(wallet.balance(Currency::Usd), Amount::from_cents(10_000));
    }

    #[tokio::test]
    async fn withdraw_failure_compensates_the_ledger_posting() {
        let coordinator = coordinator();
        // No prior deposit: the wallet-side withdraw will fail with
        // InsufficientFunds, triggering compensation of the ledger post.
        let result = coordinator
            .withdraw("bob", Amount::from_cents(1_000), Amount::ZERO, Currency::Usd, None, "system")
            .await;
        assert!(result.is_err());

        let trial_balance = coordinator.ledger.trial_balance().await;
        assert!(trial_balance.is_balanced, "compensating reversal must keep the books balanced");
    }

    #[tokio::test]
    async fn prize_beyond_cap_never_reaches_the_ledger() {
        let coordinator = coordinator();
        coordinator
            .add_prize("carol", Amount::from_cents(6_000), Currency::Usd, Amount::from_cents(10_000), None, "system")
            .await
            .unwrap();
        let before = coordinator.ledger.trial_balance().await;

        let result = coordinator
            .add_prize("carol", Amount::from_cents(8_000), Currency::Usd, Amount::from_cents(10_000), None, "system")
            .await;
        assert!(result.is_err());

        let after = coordinator.ledger.trial_balance().await;
        assert_eq!(before.total_debit_balances, after.total_debit_balances);
    }

    #[tokio::test]
    async fn idempotent_redeposit_with_same_key_is_rejected() {
        let coordinator = coordinator();
        coordinator
            .deposit("dave", Amount::from_cents(1_000), Currency::Usd, Some("idem-dave"), "system")
            .await
            .unwrap();
        let second = coordinator
            .deposit("dave", Amount::from_cents(1_000), Currency::Usd, Some("idem-dave"), "system")
            .await;
        assert!(second.is_err());
        let wallet = coordinator.wallet_snapshot("dave").await;
        assert_eq!(wallet.balance(Currency::Usd), Amount::from_cents(1_000));
    }
}
