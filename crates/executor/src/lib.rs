//! # SmartGrant Executor Crate
//!
//! This crate provides the transaction executor that gives every ledger operation
//! all-or-nothing semantics. It takes a snapshot of the `LedgerState`, dispatches a
//! `Command` to the ledger, and either commits the mutated copy or discards it.
//!
//! ## Architectural Principles
//!
//! - **Closed Dispatch:** Operations are a fixed enum. A name coming from outside is
//!   parsed into `OperationKind` first; an unknown name is a caller error and never
//!   reaches the ledger.
//! - **Failures as Data:** `apply` never returns `Err` for a ledger failure. The
//!   caller receives a `TransactionOutcome` whose `Failure` variant carries the
//!   reason and the untouched snapshot.
//! - **Contained Faults:** A panic inside an operation is caught, logged at `error`,
//!   and handled like any other failure: the working copy is dropped.
//!
//! ## Public API
//!
//! - `Command` / `OperationKind`: the invocable operations.
//! - `apply`: the stateless snapshot-execute-commit step.
//! - `Ledger`: owner of a committed state built on `apply`.
//! - `TransactionOutcome` / `Status`: what a call produced.
//! - `ExecutorError`: caller errors (unknown operation, malformed arguments).

// Declare the modules that constitute this crate.
pub mod command;
pub mod error;
pub mod transaction;

// Re-export the key components to provide a clean, public-facing API.
pub use command::{Command, OperationKind};
pub use error::ExecutorError;
pub use transaction::{Ledger, Status, TransactionOutcome, apply};
