use ledger::LedgerError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Upstream service error: {0}")]
    Service(#[from] services::error::ServiceError),

    #[error("Invalid budget: {0}")]
    InvalidBudget(#[from] core_types::CoreError),

    #[error("Transaction blocked: {0}")]
    Blocked(LedgerError),

    #[error("Bank error: payment declined.")]
    PaymentDeclined,

    #[error("No receipt provided.")]
    MissingReceipt,

    #[error("Invalid repayment amount: {0}")]
    InvalidRepayment(Decimal),

    #[error("Reconciliation deadline of {0} hours is out of range.")]
    DeadlineOutOfRange(u32),

    #[error("No new budget items provided.")]
    EmptyBudget,

    #[error("{stage} failed: {reason}")]
    Rejected {
        stage: &'static str,
        reason: LedgerError,
    },
}
