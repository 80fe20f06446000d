use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallet_common::{time, Amount, CoreError, Currency, EvmAddress, Result};

/// The per-player financial aggregate (§3). Tracks balances across
/// currencies plus the invariants that must hold regardless of which
/// operation touches the wallet: non-negative balances, a lock gate, and a
/// rolling UTC-day prize cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletAggregate {
    pub id: String,
    pub user_id: String,
    pub evm_address: Option<EvmAddress>,
    pub balances: HashMap<Currency, Amount>,
    pub pending_transaction_ids: Vec<String>,
    pub cumulative_deposits: Amount,
    pub cumulative_withdrawals: Amount,
    pub cumulative_winnings: Amount,
    pub cumulative_losses: Amount,
    pub cumulative_fees: Amount,
    pub daily_prize_total: Amount,
    pub last_prize_win_date: Option<DateTime<Utc>>,
    pub is_locked: bool,
    pub lock_reason: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletAggregate {
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        WalletAggregate {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            evm_address: None,
            balances: HashMap::new(),
            pending_transaction_ids: Vec::new(),
            cumulative_deposits: Amount::ZERO,
            cumulative_withdrawals: Amount::ZERO,
            cumulative_winnings: Amount::ZERO,
            cumulative_losses: Amount::ZERO,
            cumulative_fees: Amount::ZERO,
            daily_prize_total: Amount::ZERO,
            last_prize_win_date: None,
            is_locked: false,
            lock_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_evm_address(mut self, address: EvmAddress) -> Self {
        self.evm_address = Some(address);
        self
    }

    pub fn balance(&self, currency: Currency) -> Amount {
        self.balances.get(&currency).copied().unwrap_or(Amount::ZERO)
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    fn require_unlocked(&self) -> Result<()> {
        if self.is_locked {
            return Err(CoreError::Locked {
                reason: self
                    .lock_reason
                    .clone()
                    .unwrap_or_else(|| "wallet is locked".to_string()),
            });
        }
        Ok(())
    }

    pub fn deposit(&mut self, currency: Currency, amount: Amount) -> Result<()> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("deposit amount must be positive".to_string()));
        }
        self.require_unlocked()?;
        let current = self.balance(currency);
        self.balances.insert(currency, current + amount);
        self.cumulative_deposits = self.cumulative_deposits + amount;
        self.touch();
        Ok(())
    }

    pub fn withdraw(&mut self, currency: Currency, amount: Amount) -> Result<()> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("withdrawal amount must be positive".to_string()));
        }
        self.require_unlocked()?;
        let current = self.balance(currency);
        if current < amount {
            return Err(CoreError::InsufficientFunds {
                available: current.to_string(),
                required: amount.to_string(),
            });
        }
        self.balances.insert(currency, current - amount);
        self.cumulative_withdrawals = self.cumulative_withdrawals + amount;
        self.touch();
        Ok(())
    }

    pub fn deduct_entry_fee(&mut self, currency: Currency, amount: Amount) -> Result<()> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("entry fee must be positive".to_string()));
        }
        self.require_unlocked()?;
        let current = self.balance(currency);
        if current < amount {
            return Err(CoreError::InsufficientFunds {
                available: current.to_string(),
                required: amount.to_string(),
            });
        }
        self.balances.insert(currency, current - amount);
        self.cumulative_fees = self.cumulative_fees + amount;
        self.touch();
        Ok(())
    }

    /// §4.5: credits a prize, first rolling the daily accumulator over if
    /// the last win fell on an earlier UTC day, then rejecting the credit
    /// if it would exceed `max_daily_cap` for today.
    pub fn add_prize(&mut self, currency: Currency, amount: Amount, max_daily_cap: Amount) -> Result<()> {
        if !amount.is_positive() {
            return Err(CoreError::Validation("prize amount must be positive".to_string()));
        }
        self.require_unlocked()?;

        let now = Utc::now();
        if time::is_new_utc_day(self.last_prize_win_date, now) {
            self.daily_prize_total = Amount::ZERO;
        }

        let projected = self.daily_prize_total.checked_add(amount).ok_or_else(|| {
            CoreError::Validation("daily prize total would overflow".to_string())
        })?;
        if projected > max_daily_cap {
            return Err(CoreError::LimitExceeded(format!(
                "prize of {amount} would push today's total to {projected}, exceeding cap {max_daily_cap}"
            )));
        }

        let current = self.balance(currency);
        self.balances.insert(currency, current + amount);
        self.cumulative_winnings = self.cumulative_winnings + amount;
        self.daily_prize_total = projected;
        self.last_prize_win_date = Some(now);
        self.touch();
        Ok(())
    }

    pub fn record_loss(&mut self, amount: Amount) {
        self.cumulative_losses = self.cumulative_losses + amount;
        self.touch();
    }

    pub fn lock(&mut self, reason: &str) {
        self.is_locked = true;
        self.lock_reason = Some(reason.to_string());
        self.touch();
    }

    pub fn unlock(&mut self) {
        self.is_locked = false;
        self.lock_reason = None;
        self.touch();
    }

    pub fn add_pending_transaction(&mut self, transaction_id: &str) {
        self.pending_transaction_ids.push(transaction_id.to_string());
        self.touch();
    }

    pub fn remove_pending_transaction(&mut self, transaction_id: &str) {
        self.pending_transaction_ids.retain(|id| id != transaction_id);
        self.touch();
    }

    /// §3 invariant: no currency balance may be negative.
    pub fn validate(&self) -> Result<()> {
        for (currency, amount) in &self.balances {
            if amount.is_negative() {
                return Err(CoreError::InvariantViolation(format!(
                    "wallet {} has negative {currency} balance {amount}",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_increases_balance_and_cumulative() {
        let mut wallet = WalletAggregate::new("user-1");
        wallet.deposit(Currency::Usd, Amount::from_cents(5_000)).unwrap();
        assert_eq!(wallet.balance(Currency::Usd), Amount::from_cents(5_000));
        assert_eq!(wallet.cumulative_deposits, Amount::from_cents(5_000));
    }

    #[test]
    fn withdraw_beyond_balance_is_rejected() {
        let mut wallet = WalletAggregate::new("user-1");
        wallet.deposit(Currency::Usd, Amount::from_cents(1_000)).unwrap();
        assert!(wallet.withdraw(Currency::Usd, Amount::from_cents(2_000)).is_err());
    }

    #[test]
    fn locked_wallet_rejects_mutation() {
        let mut wallet = WalletAggregate::new("user-1");
        wallet.lock("under review");
        assert!(wallet.deposit(Currency::Usd, Amount::from_cents(100)).is_err());
        wallet.unlock();
        assert!(wallet.deposit(Currency::Usd, Amount::from_cents(100)).is_ok());
    }

    #[test]
    fn prize_cap_rejects_once_daily_total_would_be_exceeded() {
        let mut wallet = WalletAggregate::new("user-1");
        let cap = Amount::from_cents(10_000);
        wallet.add_prize(Currency::Usd, Amount::from_cents(6_000), cap).unwrap();
        let second = wallet.add_prize(Currency::Usd, Amount::from_cents(5_000), cap);
        assert!(second.is_err());
        assert_eq!(wallet.balance(Currency::Usd), Amount::from_cents(6_000));
    }

    #[test]
    fn validate_catches_negative_balance() {
        let mut wallet = WalletAggregate::new("user-1");
        wallet.balances.insert(Currency::Usd, Amount::from_cents(-1));
        assert!(wallet.validate().is_err());
    }
}
