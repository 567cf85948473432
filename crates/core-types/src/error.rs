use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Declared total cost {declared} does not match the sum of item costs {computed}")]
    TotalMismatch {
        declared: Decimal,
        computed: Decimal,
    },

    #[error("Calculation error: {0}")]
    Calculation(String),
}
