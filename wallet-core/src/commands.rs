use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallet_common::{Amount, CoreError, Currency, Result};
use wallet_ledger::{AssetType, EntryType, TransactionType};

/// Correlation context every external command carries, so downstream
/// logging and audit trails can trace a command back to its caller
/// without threading separate parameters through every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandContext {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub user_id: String,
    pub correlation_id: String,
}

impl CommandContext {
    pub fn new(user_id: &str) -> Self {
        CommandContext {
            tenant_id: None,
            client_id: None,
            user_id: user_id.to_string(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWalletCommand {
    pub context: CommandContext,
}

impl CreateWalletCommand {
    pub fn validate(&self) -> Result<()> {
        if self.context.user_id.trim().is_empty() {
            return Err(CoreError::Validation("user_id must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCommand {
    pub context: CommandContext,
    pub amount: Amount,
    pub currency: Currency,
    pub idempotency_key: Option<String>,
}

impl DepositCommand {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(CoreError::Validation("deposit amount must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCommand {
    pub context: CommandContext,
    pub amount: Amount,
    pub fee: Amount,
    pub currency: Currency,
    pub idempotency_key: Option<String>,
}

impl WithdrawCommand {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(CoreError::Validation("withdrawal amount must be positive".to_string()));
        }
        if self.fee.is_negative() {
            return Err(CoreError::Validation("fee must not be negative".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductEntryFeeCommand {
    pub context: CommandContext,
    pub amount: Amount,
    pub currency: Currency,
    pub idempotency_key: Option<String>,
}

impl DeductEntryFeeCommand {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(CoreError::Validation("entry fee must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPrizeCommand {
    pub context: CommandContext,
    pub amount: Amount,
    pub currency: Currency,
    pub max_daily_cap: Amount,
    pub idempotency_key: Option<String>,
}

impl AddPrizeCommand {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(CoreError::Validation("prize amount must be positive".to_string()));
        }
        if self.max_daily_cap.is_negative() {
            return Err(CoreError::Validation("daily cap must not be negative".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundCommand {
    pub context: CommandContext,
    pub original_journal_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub reason: String,
}

impl RefundCommand {
    pub fn validate(&self) -> Result<()> {
        if self.original_journal_id.trim().is_empty() {
            return Err(CoreError::Validation("original_journal_id is required".to_string()));
        }
        if self.reason.trim().is_empty() {
            return Err(CoreError::Validation("a refund must carry a reason".to_string()));
        }
        Ok(())
    }
}

/// Directly debits or credits a wallet outside the named operations
/// above — used for manual adjustments (`ADJUSTMENT` in the chart).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebitWalletCommand {
    pub context: CommandContext,
    pub amount: Amount,
    pub currency: Currency,
    pub reason: String,
}

impl DebitWalletCommand {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(CoreError::Validation("debit amount must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditWalletCommand {
    pub context: CommandContext,
    pub amount: Amount,
    pub currency: Currency,
    pub reason: String,
}

impl CreditWalletCommand {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(CoreError::Validation("credit amount must be positive".to_string()));
        }
        Ok(())
    }
}

/// Filters and pagination for `GetTransactions` (§4.9 supplement).
/// `limit` is clamped into `[1, 100]`; the default sort is
/// `created_at DESC`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub user_id: String,
    pub currency: Option<Currency>,
    pub asset_type: Option<AssetType>,
    pub entry_type: Option<EntryType>,
    pub operation_type: Option<TransactionType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

impl TransactionQuery {
    pub const MIN_LIMIT: u32 = 1;
    pub const MAX_LIMIT: u32 = 100;
    pub const DEFAULT_LIMIT: u32 = 50;

    pub fn new(user_id: &str) -> Self {
        TransactionQuery {
            user_id: user_id.to_string(),
            currency: None,
            asset_type: None,
            entry_type: None,
            operation_type: None,
            from: None,
            to: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(Self::MIN_LIMIT, Self::MAX_LIMIT);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}
