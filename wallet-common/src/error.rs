use thiserror::Error;

/// Errors surfaced across the wallet/ledger core (§7).
///
/// Every variant is distinguishable by the caller so that HTTP/CLI layers
/// built on top can map them to the right status code without inspecting
/// message text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate operation for idempotency key {0}")]
    DuplicateOperation(String),

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: String, required: String },

    #[error("wallet locked: {reason}")]
    Locked { reason: String },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("integrity failure: {0}")]
    IntegrityFailure(String),

    #[error("compensation failed after {trigger}: {compensation_error}")]
    CompensationFailed {
        trigger: String,
        compensation_error: String,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// A stable, machine-checkable kind string for the error (§7: "a stable
    /// kind and a human message").
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "ValidationError",
            CoreError::Authorization(_) => "AuthorizationError",
            CoreError::NotFound(_) => "NotFound",
            CoreError::DuplicateOperation(_) => "DuplicateOperation",
            CoreError::InsufficientFunds { .. } => "InsufficientFunds",
            CoreError::Locked { .. } => "Locked",
            CoreError::LimitExceeded(_) => "LimitExceeded",
            CoreError::InvariantViolation(_) => "InvariantViolation",
            CoreError::IntegrityFailure(_) => "IntegrityFailure",
            CoreError::CompensationFailed { .. } => "CompensationFailed",
            CoreError::Other(_) => "Other",
        }
    }
}
