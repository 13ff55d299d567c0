//! Error types for the credit ledger.

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors raised while parsing ledger inputs.
///
/// The calculator itself never fails; these only surface at parsing boundaries
/// (request bodies, configuration) where rejecting bad input is preferable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A billing month was not in `YYYY-MM` form.
    #[error("invalid billing month: {0}")]
    InvalidMonth(String),

    /// A device identifier was empty, too long or contained invalid characters.
    #[error("invalid device id: {0}")]
    InvalidDeviceId(String),

    /// A purchase carried a non-positive credit amount.
    #[error("invalid purchase: {0}")]
    InvalidPurchase(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
