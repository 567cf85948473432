//! # SmartGrant Ledger Crate
//!
//! This crate holds the budget ledger of a single grant: its balance, the
//! category-scoped budget items, the freeze flag, accumulated debt, and the optional
//! pending pre-authorization.
//!
//! ## Architectural Principles
//!
//! - **Pure State Machine:** Operations mutate a `LedgerState` in place and report
//!   either an `OperationResult` or a `LedgerError`. They perform no I/O and know
//!   nothing about rollback; all-or-nothing semantics come from the `executor` crate,
//!   which runs every operation on a snapshot.
//! - **Policy vs. Validation:** A receipt with unmatched items is not an error. The
//!   operation succeeds with `OperationResult::Sanctioned` and its effects (debt,
//!   freeze, balance, item decrements) are committed.
//!
//! ## Public API
//!
//! - `LedgerState`: the ledger data and its operations (`pre_authorize`, `reconcile`,
//!   `pay_debt`, `re_price`).
//! - `OperationResult`: what a completed operation reports.
//! - `LedgerError`: the validation failures and internal faults.

// Declare the modules that constitute this crate.
pub mod error;
pub mod operations;
pub mod state;

// Re-export the key components to provide a clean, public-facing API.
pub use error::LedgerError;
pub use operations::OperationResult;
pub use state::LedgerState;
