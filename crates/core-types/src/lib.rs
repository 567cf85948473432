pub mod category;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use category::CategoryCode;
pub use error::CoreError;
pub use structs::{BudgetItem, BudgetList, PendingTransaction, SANCTION_LINE_NAME};
