use core_types::CategoryCode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Upper bound for `ledger.reconciliation_deadline_hours`: one year.
pub const MAX_DEADLINE_HOURS: u32 = 24 * 365;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub services: ServiceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Contains the rules the lifecycle engine applies around the ledger.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Reserved category placed on synthetic sanction receipts.
    /// It must never be used by a real budget item.
    #[serde(default = "default_violation_category")]
    pub violation_category: CategoryCode,

    /// How long a pending transaction may wait for its receipt before it is sanctioned.
    #[serde(default = "default_deadline_hours")]
    pub reconciliation_deadline_hours: u32,

    /// Allowed gap between a receipt's total and the pre-authorized amount
    /// before a warning is logged. Covers bank fees and rounding.
    #[serde(default = "default_receipt_tolerance")]
    pub receipt_tolerance: Decimal,

    /// How often the background watcher checks for missed deadlines.
    #[serde(default = "default_check_interval")]
    pub deadline_check_interval_secs: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            violation_category: default_violation_category(),
            reconciliation_deadline_hours: default_deadline_hours(),
            receipt_tolerance: default_receipt_tolerance(),
            deadline_check_interval_secs: default_check_interval(),
        }
    }
}

/// Parameters for the simulated upstream services.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    /// Category returned for tax ids missing from the directory.
    #[serde(default = "default_category")]
    pub default_category: CategoryCode,

    /// Tax id -> category code.
    #[serde(default)]
    pub category_directory: HashMap<String, CategoryCode>,

    /// When false the simulated bank declines every payment.
    #[serde(default = "default_true")]
    pub approve_payments: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_category: default_category(),
            category_directory: HashMap::new(),
            approve_payments: true,
        }
    }
}

/// Output format of the console log layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

impl Config {
    /// Checks cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ledger = &self.ledger;
        if ledger.violation_category.as_str().trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ledger.violation_category must not be empty".to_string(),
            ));
        }
        if ledger.reconciliation_deadline_hours == 0 {
            return Err(ConfigError::ValidationError(
                "ledger.reconciliation_deadline_hours must be greater than 0".to_string(),
            ));
        }
        if ledger.reconciliation_deadline_hours > MAX_DEADLINE_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "ledger.reconciliation_deadline_hours must be at most {MAX_DEADLINE_HOURS}"
            )));
        }
        if ledger.receipt_tolerance.is_sign_negative() {
            return Err(ConfigError::ValidationError(
                "ledger.receipt_tolerance must not be negative".to_string(),
            ));
        }
        if ledger.deadline_check_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "ledger.deadline_check_interval_secs must be greater than 0".to_string(),
            ));
        }

        let collides = self.services.default_category == ledger.violation_category
            || self
                .services
                .category_directory
                .values()
                .any(|code| *code == ledger.violation_category);
        if collides {
            return Err(ConfigError::ValidationError(format!(
                "violation category '{}' is also handed out by the category directory",
                ledger.violation_category
            )));
        }
        Ok(())
    }
}

fn default_violation_category() -> CategoryCode {
    CategoryCode::new("TIMEOUT_VIOLATION")
}

fn default_deadline_hours() -> u32 {
    24
}

fn default_receipt_tolerance() -> Decimal {
    dec!(1.0)
}

fn default_check_interval() -> u64 {
    60
}

fn default_category() -> CategoryCode {
    CategoryCode::new("00.00")
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}
