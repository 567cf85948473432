use crate::error::ServiceError;
use async_trait::async_trait;
use core_types::{BudgetList, CategoryCode};
use rust_decimal::Decimal;

pub mod error;
pub mod qr;
pub mod simulated;

// --- Public API ---
pub use qr::PaymentQr;
pub use simulated::{SimulatedBank, SimulatedCategoryDirectory, SimulatedReceiptParser};

/// Looks up the activity category a merchant sells under.
///
/// An unknown merchant maps to a default code; that is a valid answer, not an error.
#[async_trait]
pub trait CategoryDirectory: Send + Sync {
    async fn lookup_category(&self, tax_id: &str) -> Result<CategoryCode, ServiceError>;
}

/// Executes a payment at the bank.
///
/// The ledger never calls this itself; the lifecycle engine sequences it after a
/// successful pre-authorization.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns `Ok(false)` when the bank declines.
    async fn process_payment(&self, amount: Decimal, tax_id: &str) -> Result<bool, ServiceError>;
}

/// Resolves an opaque receipt token into the purchased line items.
#[async_trait]
pub trait ReceiptParser: Send + Sync {
    /// Malformed input yields an empty list rather than an error.
    async fn parse_receipt(&self, token: &str) -> BudgetList;
}
