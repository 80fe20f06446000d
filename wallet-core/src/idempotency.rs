use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use wallet_common::{CoreError, Result};

/// Default lifetime of a completed or failed idempotency record before it
/// is eligible for eviction (§4.6).
pub const DEFAULT_TTL: Duration = Duration::hours(24);

/// How long an operation may sit in `Processing` before it is considered
/// abandoned and safe to retry (§4.6).
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotentOperation {
    pub key: String,
    pub operation_type: String,
    pub status: OperationStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdempotentOperation {
    fn new(key: &str, operation_type: &str) -> Self {
        let now = Utc::now();
        IdempotentOperation {
            key: key.to_string(),
            operation_type: operation_type.to_string(),
            status: OperationStatus::Processing,
            result: None,
            error: None,
            attempts: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.status == OperationStatus::Processing
    }

    pub fn is_completed(&self) -> bool {
        self.status == OperationStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == OperationStatus::Failed
    }

    pub fn can_retry(&self, max_attempts: u32) -> bool {
        self.is_failed() && self.attempts < max_attempts
    }

    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.is_processing() && Utc::now() - self.updated_at > threshold
    }
}

/// In-memory idempotency ledger keyed by caller-supplied key. Entries
/// expire after `DEFAULT_TTL`; a `Processing` entry older than
/// `DEFAULT_STALE_THRESHOLD` is treated as abandoned and may be retried.
pub struct IdempotencyStore {
    records: Arc<RwLock<HashMap<String, IdempotentOperation>>>,
    ttl: Duration,
    stale_threshold: Duration,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        IdempotencyStore {
            records: Arc::new(RwLock::new(HashMap::new())),
            ttl: DEFAULT_TTL,
            stale_threshold: DEFAULT_STALE_THRESHOLD,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = threshold;
        self
    }

    async fn purge_expired(&self, records: &mut HashMap<String, IdempotentOperation>) {
        let ttl = self.ttl;
        let now = Utc::now();
        records.retain(|_, record| now - record.updated_at <= ttl);
    }

    pub async fn get(&self, key: &str) -> Option<IdempotentOperation> {
        self.records.read().await.get(key).cloned()
    }

    /// Runs `operation` exactly once per key (§4.6): a fresh key starts a
    /// new `Processing` record and runs the future; a key already
    /// `Completed` short-circuits with the stored result; a key that is
    /// `Processing` but stale is reclaimed and retried; anything else
    /// (still processing, or failed past its retry budget) is rejected as
    /// a duplicate in flight.
    pub async fn execute_with_idempotency<F, Fut>(
        &self,
        key: &str,
        operation_type: &str,
        max_attempts: u32,
        operation: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        {
            let mut records = self.records.write().await;
            self.purge_expired(&mut records).await;

            if let Some(existing) = records.get(key) {
                if existing.is_completed() {
                    return existing
                        .result
                        .clone()
                        .ok_or_else(|| CoreError::Other("completed operation missing result".to_string()));
                }
                if existing.is_processing() && !existing.is_stale(self.stale_threshold) {
                    return Err(CoreError::DuplicateOperation(format!(
                        "operation {key} is already in progress"
                    )));
                }
                if existing.is_failed() && !existing.can_retry(max_attempts) {
                    return Err(CoreError::DuplicateOperation(format!(
                        "operation {key} has exhausted its retry budget"
                    )));
                }
            }

            let attempts = records.get(key).map(|r| r.attempts + 1).unwrap_or(1);
            let mut record = IdempotentOperation::new(key, operation_type);
            record.attempts = attempts;
            records.insert(key.to_string(), record);
        }

        match operation().await {
            Ok(result) => {
                let mut records = self.records.write().await;
                if let Some(record) = records.get_mut(key) {
                    record.status = OperationStatus::Completed;
                    record.result = Some(result.clone());
                    record.updated_at = Utc::now();
                }
                Ok(result)
            }
            Err(err) => {
                let mut records = self.records.write().await;
                if let Some(record) = records.get_mut(key) {
                    record.status = OperationStatus::Failed;
                    record.error = Some(err.to_string());
                    record.updated_at = Utc::now();
                }
                Err(err)
            }
        }
    }
}

impl Default for IdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_call_runs_operation_and_caches_result() {
        let store = IdempotencyStore::new();
        let result = store
            .execute_with_idempotency("key-1", "deposit", 3, || async { Ok("ok".to_string()) })
            .await
            .unwrap();
        assert_eq!(result, "ok");
        assert!(store.get("key-1").await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn second_call_with_same_key_returns_cached_result_without_rerunning() {
        let store = IdempotencyStore::new();
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            store
                .execute_with_idempotency("key-2", "deposit", 3, || async move {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok("done".to_string())
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_operation_can_be_retried_within_budget() {
        let store = IdempotencyStore::new();
        let first = store
            .execute_with_idempotency("key-3", "withdraw", 3, || async {
                Err(CoreError::Other("boom".to_string()))
            })
            .await;
        assert!(first.is_err());

        let second = store
            .execute_with_idempotency("key-3", "withdraw", 3, || async { Ok("recovered".to_string()) })
            .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn stale_processing_record_is_reclaimed() {
        let store = IdempotencyStore::new().with_stale_threshold(Duration::seconds(0));
        {
            let mut records = store.records.write().await;
            records.insert(
                "key-4".to_string(),
                IdempotentOperation::new("key-4", "deposit"),
            );
        }
        let result = store
            .execute_with_idempotency("key-4", "deposit", 3, || async { Ok("done".to_string()) })
            .await;
        assert!(result.is_ok());
    }
}
