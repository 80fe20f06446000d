pub mod audit;
pub mod commands;
pub mod coordinator;
pub mod idempotency;
pub mod ledger_wallet;
pub mod reconciliation;
pub mod settings;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use audit::{AuditSink, FinancialEvent, TracingAuditSink};
pub use coordinator::TransactionCoordinator;
pub use idempotency::{IdempotencyStore, IdempotentOperation, OperationStatus};
pub use ledger_wallet::LedgerWallet;
pub use reconciliation::{
    auto_correct_currency, reconcile_currency, reconcile_wallet, verify_ledger_integrity, Discrepancy, ReconciliationStatus, Severity,
    WalletReconciliationReport,
};
pub use settings::CoreSettings;
pub use wallet::WalletAggregate;
