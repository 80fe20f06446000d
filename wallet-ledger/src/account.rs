use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallet_common::{Amount, CoreError, Currency, Result};

/// The five balance-sheet classes (§3). Asset/Expense are debit-normal;
/// Liability/Equity/Revenue are credit-normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asset" => Some(AccountType::Asset),
            "liability" => Some(AccountType::Liability),
            "equity" => Some(AccountType::Equity),
            "revenue" => Some(AccountType::Revenue),
            "expense" => Some(AccountType::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Revenue => "Revenue",
            AccountType::Expense => "Expense",
        };
        write!(f, "{s}")
    }
}

/// A ledger account: either a system account from the standard chart (§3)
/// or a per-user liability sub-account created on demand under the 2001
/// family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub code: u32,
    pub name: String,
    pub account_type: AccountType,
    pub currency: Currency,
    pub total_balance: Amount,
    pub available_balance: Amount,
    pub held_balance: Amount,
    pub owner_user_id: Option<String>,
    pub is_active: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new_system(code: u32, name: &str, account_type: AccountType, currency: Currency) -> Self {
        let now = Utc::now();
        Account {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            name: name.to_string(),
            account_type,
            currency,
            total_balance: Amount::ZERO,
            available_balance: Amount::ZERO,
            held_balance: Amount::ZERO,
            owner_user_id: None,
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_user_subaccount(code: u32, user_id: &str, currency: Currency) -> Self {
        let now = Utc::now();
        Account {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            name: format!("User Wallet Balance ({user_id})"),
            account_type: AccountType::Liability,
            currency,
            total_balance: Amount::ZERO,
            available_balance: Amount::ZERO,
            held_balance: Amount::ZERO,
            owner_user_id: Some(user_id.to_string()),
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// §3 invariant: total = available + held.
    pub fn check_invariant(&self) -> Result<()> {
        if self.total_balance != self.available_balance + self.held_balance {
            return Err(CoreError::InvariantViolation(format!(
                "account {}: total {} != available {} + held {}",
                self.id, self.total_balance, self.available_balance, self.held_balance
            )));
        }
        Ok(())
    }

    /// Applies a signed movement (positive = debit-direction increase per
    /// account convention, negative = credit-direction increase) to the
    /// available balance, bumping the optimistic version.
    pub(crate) fn apply_available_delta(&mut self, delta: Amount) {
        self.available_balance = self.available_balance + delta;
        self.total_balance = self.available_balance + self.held_balance;
        self.version += 1;
        self.updated_at = Utc::now();
    }

    pub(crate) fn move_available_to_held(&mut self, amount: Amount) {
        self.available_balance = self.available_balance - amount;
        self.held_balance = self.held_balance + amount;
        self.total_balance = self.available_balance + self.held_balance;
        self.version += 1;
        self.updated_at = Utc::now();
    }

    pub(crate) fn move_held_to_available(&mut self, amount: Amount) {
        self.held_balance = self.held_balance - amount;
        self.available_balance = self.available_balance + amount;
        self.total_balance = self.available_balance + self.held_balance;
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
