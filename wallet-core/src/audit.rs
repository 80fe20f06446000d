use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallet_common::{Amount, Currency, Result};

/// One posted, user-visible financial event, handed to an `AuditSink`
/// after a transaction has already committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialEvent {
    pub event_type: String,
    pub user_id: String,
    pub journal_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

/// Sink for financial events, invoked best-effort after a saga has
/// already posted its journal and updated the wallet. Implementations
/// must never be allowed to roll back a completed transaction: the
/// coordinator only logs a sink failure, it never propagates one.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_financial_event(&self, event: FinancialEvent) -> Result<()>;
}

/// Default sink used when no audit destination is configured: writes a
/// structured log line and nothing else.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_financial_event(&self, event: FinancialEvent) -> Result<()> {
        tracing::info!(
            event_type = %event.event_type,
            user_id = %event.user_id,
            journal_id = %event.journal_id,
            amount = %event.amount,
            currency = %event.currency,
            "📒 financial event recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracing_sink_never_errors() {
        let sink = TracingAuditSink;
        let event = FinancialEvent {
            event_type: "DEPOSIT".to_string(),
            user_id: "user-1".to_string(),
            journal_id: "journal-1".to_string(),
            amount: Amount::from_cents(100),
            currency: Currency::Usd,
            actor: "system".to_string(),
            occurred_at: Utc::now(),
        };
        assert!(sink.record_financial_event(event).await.is_ok());
    }
}
