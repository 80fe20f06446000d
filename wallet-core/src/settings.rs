use std::{fs, io};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use wallet_common::Amount;

use crate::commands::TransactionQuery;
use crate::idempotency::{DEFAULT_STALE_THRESHOLD, DEFAULT_TTL};

/// Plain, JSON-loadable runtime configuration for the wallet core (§4.4/
/// §4.6/§4.9 supplement). Durations are stored in whole seconds so the
/// file stays human-editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreSettings {
    pub idempotency_stale_threshold_secs: i64,
    pub idempotency_ttl_secs: i64,
    pub default_daily_prize_cap_cents: i64,
    pub transaction_query_default_limit: u32,
    pub transaction_query_max_limit: u32,
}

impl Default for CoreSettings {
    fn default() -> Self {
        CoreSettings {
            idempotency_stale_threshold_secs: DEFAULT_STALE_THRESHOLD.num_seconds(),
            idempotency_ttl_secs: DEFAULT_TTL.num_seconds(),
            default_daily_prize_cap_cents: 100_000_00,
            transaction_query_default_limit: TransactionQuery::DEFAULT_LIMIT,
            transaction_query_max_limit: TransactionQuery::MAX_LIMIT,
        }
    }
}

impl CoreSettings {
    pub fn idempotency_stale_threshold(&self) -> Duration {
        Duration::seconds(self.idempotency_stale_threshold_secs)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::seconds(self.idempotency_ttl_secs)
    }

    pub fn default_daily_prize_cap(&self) -> Amount {
        Amount::from_cents(self.default_daily_prize_cap_cents)
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)
    }

    pub fn load_from_file(path: &str) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = CoreSettings::default();
        settings.save_to_file(&path).unwrap();

        let loaded = CoreSettings::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.transaction_query_default_limit, settings.transaction_query_default_limit);
    }
}
