use chrono::{DateTime, Utc};
use core_types::CategoryCode;
use ledger::OperationResult;
use rust_decimal::Decimal;
use std::fmt;

/// What a lifecycle stage accomplished.
#[derive(Debug, Clone, PartialEq)]
pub enum StageReport {
    /// Pre-authorized and paid; a receipt is due before `deadline`.
    ReceiptRequired {
        amount: Decimal,
        category: CategoryCode,
        deadline: DateTime<Utc>,
    },
    Reconciled(OperationResult),
    TimeoutSanction(OperationResult),
    NothingToSanction,
    Repaid(OperationResult),
    BudgetUpdated(OperationResult),
}

impl StageReport {
    /// True when the stage committed but the ledger sanctioned the account.
    pub fn is_warning(&self) -> bool {
        match self {
            StageReport::Reconciled(result) | StageReport::TimeoutSanction(result) => {
                result.is_warning()
            }
            _ => false,
        }
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageReport::ReceiptRequired { deadline, .. } => write!(
                f,
                "Payment successful. Status: RECEIPT REQUIRED before {}.",
                deadline.format("%Y-%m-%d %H:%M UTC")
            ),
            StageReport::Reconciled(result) => write!(f, "Result: {result}"),
            StageReport::TimeoutSanction(result) => write!(f, "TIMEOUT SANCTION APPLIED: {result}"),
            StageReport::NothingToSanction => write!(f, "No pending transactions to sanction."),
            StageReport::Repaid(result) => write!(f, "Repayment success: {result}"),
            StageReport::BudgetUpdated(result) => write!(f, "Update success: {result}"),
        }
    }
}
