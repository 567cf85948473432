use thiserror::Error;

/// Caller errors: the request never reached the ledger.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Unknown ledger operation: '{0}'")]
    UnknownOperation(String),

    #[error("Invalid arguments for {operation}: {reason}")]
    InvalidArguments { operation: String, reason: String },
}
