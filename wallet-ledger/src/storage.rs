use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wallet_common::{CoreError, Result};

use crate::journal::JournalEntry;

/// Append-only write-ahead log of posted journals, replayed into memory at
/// startup. One JSON object per line so a truncated last write never
/// corrupts earlier entries.
#[derive(Debug)]
pub struct JournalWal {
    file_path: PathBuf,
}

impl JournalWal {
    pub async fn new(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .map_err(|e| CoreError::Other(format!("failed to create ledger data dir: {e}")))?;
        let file_path = dir.join("journals.wal");
        if !file_path.exists() {
            File::create(&file_path)
                .await
                .map_err(|e| CoreError::Other(format!("failed to create wal file: {e}")))?;
        }
        Ok(JournalWal { file_path })
    }

    /// Appends one posted journal as a single JSON line. Intended to be
    /// called only after a journal has been fully validated and hashed.
    pub async fn append(&self, journal: &JournalEntry) -> Result<()> {
        let mut line = serde_json::to_vec(journal)
            .map_err(|e| CoreError::Other(format!("failed to serialize journal: {e}")))?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .await
            .map_err(|e| CoreError::Other(format!("failed to open wal file: {e}")))?;
        file.write_all(&line)
            .await
            .map_err(|e| CoreError::Other(format!("failed to append to wal file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| CoreError::Other(format!("failed to flush wal file: {e}")))?;
        Ok(())
    }

    /// Replays every previously posted journal in append order. Called
    /// once at `LedgerService` construction.
    pub async fn read_all(&self) -> Result<Vec<JournalEntry>> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }
        let mut file = File::open(&self.file_path)
            .await
            .map_err(|e| CoreError::Other(format!("failed to open wal file: {e}")))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .await
            .map_err(|e| CoreError::Other(format!("failed to read wal file: {e}")))?;

        let mut journals = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(line) {
                Ok(journal) => journals.push(journal),
                Err(e) => {
                    tracing::error!(line_no, error = %e, "skipping unreadable wal line during replay");
                }
            }
        }
        tracing::info!(count = journals.len(), "replayed journals from wal");
        Ok(journals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountType;
    use crate::entry::{AssetType, EntryType, LedgerEntry};
    use crate::journal::TransactionType;
    use wallet_common::{Amount, Currency};

    fn sample_journal() -> JournalEntry {
        let mut journal = JournalEntry::new_draft(
            TransactionType::Deposit,
            "ref-1",
            "test",
            Currency::Usd,
            "system",
        );
        journal
            .add_debit(LedgerEntry::new_entry(
                "tx-1", "cash", AccountType::Asset, EntryType::Debit, AssetType::Fiat,
                Amount::from_cents(100), Currency::Usd, "in", None, "system",
            ))
            .unwrap();
        journal
            .add_credit(LedgerEntry::new_entry(
                "tx-1", "liability", AccountType::Liability, EntryType::Credit, AssetType::Fiat,
                Amount::from_cents(100), Currency::Usd, "out", None, "system",
            ))
            .unwrap();
        journal
    }

    #[tokio::test]
    async fn append_then_replay_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let wal = JournalWal::new(dir.path().to_str().unwrap()).await.unwrap();
        let journal = sample_journal();
        wal.append(&journal).await.unwrap();

        let replayed = wal.read_all().await.unwrap();
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].id, journal.id);
    }

    #[tokio::test]
    async fn empty_wal_replays_to_empty_vec() {
        let dir = tempfile::tempdir().unwrap();
        let wal = JournalWal::new(dir.path().to_str().unwrap()).await.unwrap();
        assert!(wal.read_all().await.unwrap().is_empty());
    }
}
