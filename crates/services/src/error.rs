use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Invalid payment QR format: {0}")]
    InvalidQr(String),

    #[error("The upstream service returned an error: {0}")]
    Upstream(String),
}
