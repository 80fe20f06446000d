use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallet_common::{Amount, Currency};

/// A read-oriented projection of a wallet's ledger-backed position (§3
/// supplement): the numbers a statement or support dashboard would show,
/// kept separate from `WalletAggregate` so the write-side aggregate never
/// has to carry reporting-only fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerWallet {
    pub user_id: String,
    pub ledger_account_id: String,
    pub currency: Currency,
    pub total_balance: Amount,
    pub available_balance: Amount,
    pub held_balance: Amount,
    pub cumulative_deposits: Amount,
    pub cumulative_withdrawals: Amount,
    pub cumulative_winnings: Amount,
    pub cumulative_losses: Amount,
    pub cumulative_fees: Amount,
    pub version: u64,
    pub as_of: DateTime<Utc>,
}

impl LedgerWallet {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: &str,
        ledger_account_id: &str,
        currency: Currency,
        total_balance: Amount,
        available_balance: Amount,
        held_balance: Amount,
    ) -> Self {
        LedgerWallet {
            user_id: user_id.to_string(),
            ledger_account_id: ledger_account_id.to_string(),
            currency,
            total_balance,
            available_balance,
            held_balance,
            cumulative_deposits: Amount::ZERO,
            cumulative_withdrawals: Amount::ZERO,
            cumulative_winnings: Amount::ZERO,
            cumulative_losses: Amount::ZERO,
            cumulative_fees: Amount::ZERO,
            version: 0,
            as_of: Utc::now(),
        }
    }
}
