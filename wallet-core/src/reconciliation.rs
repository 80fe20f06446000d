use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallet_common::{Amount, CoreError, Currency, Result};
use wallet_ledger::LedgerService;

use crate::wallet::WalletAggregate;

/// How far a wallet's cached balance has drifted from what the ledger
/// computes, bucketed by absolute cent value (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    fn classify(discrepancy: Amount) -> Self {
        let cents = discrepancy.abs().minor_units();
        if cents < 100 {
            Severity::Low
        } else if cents < 10_000 {
            Severity::Medium
        } else if cents < 100_000 {
            Severity::High
        } else {
            Severity::Critical
        }
    }
}

/// `Matched`: every currency in the wallet ties out. `Mismatched`: every
/// currency checked has a discrepancy. `PartialMatch`: some currencies
/// tie out and some don't. `ManualReview` overrides all three whenever
/// any discrepancy is `High` or `Critical` (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Matched,
    Mismatched,
    PartialMatch,
    ManualReview,
}

/// A single (wallet, currency) pair whose cached balance disagrees with
/// the ledger's computed balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discrepancy {
    pub user_id: String,
    pub currency: Currency,
    pub cached_balance: Amount,
    pub ledger_balance: Amount,
    pub difference: Amount,
    pub severity: Severity,
}

/// The result of `ReconcileWallet(walletID)`: every currency the wallet
/// holds a balance in was checked against the ledger, and `discrepancies`
/// lists the ones that disagreed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletReconciliationReport {
    pub user_id: String,
    pub status: ReconciliationStatus,
    pub discrepancies: Vec<Discrepancy>,
    pub currencies_checked: usize,
    pub checked_at: DateTime<Utc>,
}

/// Compares one (user, currency) pair's cached balance against the
/// ledger's authoritative, entry-derived balance, returning `None` when
/// they agree (§4.7).
pub async fn reconcile_currency(
    ledger: &LedgerService,
    user_id: &str,
    currency: Currency,
    cached_balance: Amount,
) -> Result<Option<Discrepancy>> {
    let ledger_balance = ledger.compute_user_balance(user_id, currency).await?;
    let difference = cached_balance - ledger_balance;
    if difference.is_zero() {
        return Ok(None);
    }
    Ok(Some(Discrepancy {
        user_id: user_id.to_string(),
        currency,
        cached_balance,
        ledger_balance,
        difference,
        severity: Severity::classify(difference),
    }))
}

/// `ReconcileWallet(walletID)` (§4.7): iterates each currency balance the
/// wallet holds, reconciles it against the ledger, and derives a single
/// wallet-level status from the resulting set of discrepancies.
pub async fn reconcile_wallet(ledger: &LedgerService, wallet: &WalletAggregate) -> Result<WalletReconciliationReport> {
    let currencies_checked = wallet.balances.len();
    let mut discrepancies = Vec::with_capacity(currencies_checked);
    for (&currency, &cached_balance) in &wallet.balances {
        if let Some(discrepancy) = reconcile_currency(ledger, &wallet.user_id, currency, cached_balance).await? {
            discrepancies.push(discrepancy);
        }
    }

    let any_high_or_critical = discrepancies
        .iter()
        .any(|d| matches!(d.severity, Severity::High | Severity::Critical));

    let status = if any_high_or_critical {
        ReconciliationStatus::ManualReview
    } else if discrepancies.is_empty() {
        ReconciliationStatus::Matched
    } else if discrepancies.len() == currencies_checked {
        ReconciliationStatus::Mismatched
    } else {
        ReconciliationStatus::PartialMatch
    };

    Ok(WalletReconciliationReport {
        user_id: wallet.user_id.clone(),
        status,
        discrepancies,
        currencies_checked,
        checked_at: Utc::now(),
    })
}

/// Returns the ledger-computed balance to use as the corrected cached
/// value for one (user, currency) pair, refusing outright on a
/// `Critical` discrepancy (§4.7: those need a human, not an automatic
/// fix) and never posting any new ledger entry — this is a read of the
/// existing ledger state, not a correction to it.
pub async fn auto_correct_currency(
    ledger: &LedgerService,
    user_id: &str,
    currency: Currency,
    cached_balance: Amount,
) -> Result<Amount> {
    match reconcile_currency(ledger, user_id, currency, cached_balance).await? {
        None => Ok(cached_balance),
        Some(discrepancy) if discrepancy.severity == Severity::Critical => Err(CoreError::InvariantViolation(format!(
            "user {user_id} {currency} discrepancy of {} is critical and requires manual review",
            discrepancy.difference
        ))),
        Some(discrepancy) => Ok(discrepancy.ledger_balance),
    }
}

/// Walks the ledger's full posted history and checks every journal is
/// internally balanced and correctly hash-chained (§4.7, §5).
pub async fn verify_ledger_integrity(ledger: &Arc<LedgerService>) -> Result<bool> {
    ledger.verify_chain().await
}
