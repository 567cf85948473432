//! # SmartGrant Engine
//!
//! Orchestrates the lifecycle of a grant purchase around the ledger: payment QR
//! scan and pre-authorization, bank payment, receipt reconciliation, deadline
//! sanctions, debt repayment and budget amendments.
//!
//! The engine owns the only copy of the ledger and serializes every stage behind a
//! single lock. Upstream services are injected as trait objects so tests and the
//! CLI can run against simulations.

pub mod deadline;
pub mod error;
pub mod lifecycle;
pub mod report;

pub use deadline::DeadlineWatcher;
pub use error::EngineError;
pub use lifecycle::{GrantLifecycle, Services};
pub use report::StageReport;
