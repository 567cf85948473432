use core_types::CategoryCode;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Reasons a ledger operation refuses to complete.
///
/// Every variant except `Fault` is an expected, caller-recoverable validation
/// failure. `Fault` marks an internal error such as arithmetic overflow.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum LedgerError {
    #[error("Amount must be positive, got {0}.")]
    NonPositiveAmount(Decimal),

    #[error("The account is frozen due to previous violations.")]
    AccountFrozen,

    #[error("A transaction is already pending. Complete or cancel the current payment first.")]
    PendingTransactionExists,

    #[error("No pending transaction found. Scan a payment QR first.")]
    NoPendingTransaction,

    #[error("Insufficient funds for category {category}. Available: {available}, requested: {requested}")]
    InsufficientCategoryFunds {
        category: CategoryCode,
        available: Decimal,
        requested: Decimal,
    },

    #[error("There is no debt to pay.")]
    NoDebt,

    #[error("Total grant cost cannot be negative, got {0}.")]
    NegativeTotal(Decimal),

    #[error("Receipt is invalid: {0}")]
    InvalidReceipt(String),

    #[error("Internal ledger fault: {0}")]
    Fault(String),
}

impl LedgerError {
    pub fn is_fault(&self) -> bool {
        matches!(self, LedgerError::Fault(_))
    }
}
