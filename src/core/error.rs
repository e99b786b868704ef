use crate::core::payment::PaymentId;
use crate::rates::RateError;
use thiserror::Error;

/// Errors returned by ledger operations.
///
/// Every error surfaces synchronously from the operation that detected it.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Invalid input: non-positive amount, empty participant list, blank
    /// name, unknown alias target or empty currency code.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("payment not found: {0}")]
    PaymentNotFound(PaymentId),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// An amount left the representable range while converting or summing.
    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    /// Currency conversion lookup failed or timed out.
    #[error(transparent)]
    Rate(#[from] RateError),

    #[error("malformed payment sheet: {0}")]
    Csv(#[from] csv::Error),
}

impl LedgerError {
    /// Whether this is one of the not-found kinds.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::PaymentNotFound(_) | LedgerError::AccountNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
