use crate::account::AccountType;
use wallet_common::Currency;

/// Stable numeric codes for the standard chart of accounts (§3). These are
/// part of the protocol: callers MAY add new codes, but these are reserved.
pub const CODE_OPERATING_CASH: u32 = 1001;
pub const CODE_SETTLEMENT: u32 = 1002;
pub const CODE_CRYPTO_CUSTODY: u32 = 1003;
pub const CODE_HELD_FUNDS: u32 = 1005;
pub const CODE_USER_WALLET_BALANCES: u32 = 2001;
pub const CODE_PRIZE_POOL_ESCROW: u32 = 2002;
pub const CODE_PENDING_WITHDRAWALS: u32 = 2003;
pub const CODE_HELD_USER_FUNDS: u32 = 2005;
pub const CODE_PLATFORM_EQUITY: u32 = 3001;
pub const CODE_PLATFORM_FEES_REVENUE: u32 = 4001;
pub const CODE_PAYMENT_PROCESSING_FEES: u32 = 5001;
pub const CODE_REFUNDS: u32 = 5002;

/// Static metadata for one entry of the standard chart.
pub struct StandardAccount {
    pub code: u32,
    pub name: &'static str,
    pub account_type: AccountType,
}

/// The pre-seeded chart of accounts (§3 table). `LedgerService` creates
/// these idempotently by code on first use.
pub const STANDARD_CHART: &[StandardAccount] = &[
    StandardAccount { code: CODE_OPERATING_CASH, name: "Operating Cash", account_type: AccountType::Asset },
    StandardAccount { code: CODE_SETTLEMENT, name: "Settlement", account_type: AccountType::Asset },
    StandardAccount { code: CODE_CRYPTO_CUSTODY, name: "Crypto Custody", account_type: AccountType::Asset },
    StandardAccount { code: CODE_HELD_FUNDS, name: "Held Funds", account_type: AccountType::Asset },
    StandardAccount { code: CODE_USER_WALLET_BALANCES, name: "User Wallet Balances", account_type: AccountType::Liability },
    StandardAccount { code: CODE_PRIZE_POOL_ESCROW, name: "Prize Pool Escrow", account_type: AccountType::Liability },
    StandardAccount { code: CODE_PENDING_WITHDRAWALS, name: "Pending Withdrawals", account_type: AccountType::Liability },
    StandardAccount { code: CODE_HELD_USER_FUNDS, name: "Held User Funds", account_type: AccountType::Liability },
    StandardAccount { code: CODE_PLATFORM_EQUITY, name: "Platform Equity", account_type: AccountType::Equity },
    StandardAccount { code: CODE_PLATFORM_FEES_REVENUE, name: "Platform Fees Revenue", account_type: AccountType::Revenue },
    StandardAccount { code: CODE_PAYMENT_PROCESSING_FEES, name: "Payment Processing Fees", account_type: AccountType::Expense },
    StandardAccount { code: CODE_REFUNDS, name: "Refunds", account_type: AccountType::Expense },
];

/// Per-user, per-currency liability sub-accounts live under the 2001
/// family: the low 6 digits of a synthetic code are a stable hash of the
/// (user id, currency) pair, so the same user always maps to the same
/// sub-code per currency across a restart (informational only — account
/// identity is the UUID, not this code). Hashing the currency in keeps a
/// user's USD and USDC sub-accounts distinct instead of colliding onto one
/// shared account with a frozen currency.
pub fn user_subaccount_code(user_id: &str, currency: Currency) -> u32 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    user_id.hash(&mut hasher);
    currency.hash(&mut hasher);
    CODE_USER_WALLET_BALANCES * 1_000_000 + (hasher.finish() % 1_000_000) as u32
}

pub fn default_currency_for_system_accounts() -> Currency {
    Currency::Usd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_chart_has_reserved_codes() {
        let codes: Vec<u32> = STANDARD_CHART.iter().map(|a| a.code).collect();
        assert!(codes.contains(&1001));
        assert!(codes.contains(&2001));
        assert!(codes.contains(&4001));
        assert_eq!(codes.len(), 12);
    }

    #[test]
    fn user_subaccount_code_is_deterministic() {
        assert_eq!(user_subaccount_code("alice", Currency::Usd), user_subaccount_code("alice", Currency::Usd));
        assert_ne!(user_subaccount_code("alice", Currency::Usd), user_subaccount_code("bob", Currency::Usd));
    }

    #[test]
    fn user_subaccount_code_is_distinct_per_currency() {
        assert_ne!(user_subaccount_code("alice", Currency::Usd), user_subaccount_code("alice", Currency::Usdc));
    }
}
