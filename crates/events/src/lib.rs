//! # SmartGrant Events
//!
//! This crate defines the audit events the lifecycle engine publishes whenever a
//! stage touches the ledger.
//!
//! As a Layer 0 crate, it depends only on `core-types` and provides the definitive
//! language for observing a grant's history from outside the engine.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{EventKind, LedgerEvent};
