use crate::error::EventsError;
use chrono::{DateTime, Utc};
use core_types::CategoryCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A timestamped entry in a grant's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// What happened.
///
/// The `#[serde(tag = "type", content = "payload")]` attribute serializes a
/// `Sanctioned` event as
/// `{ "timestamp": "...", "type": "Sanctioned", "payload": { "invalid_spend": "100", ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventKind {
    /// A spend passed the category pre-check and is now pending.
    Authorized {
        amount: Decimal,
        category: CategoryCode,
    },
    /// The bank executed the payment; the receipt deadline is running.
    PaymentSettled { amount: Decimal, tax_id: String },
    /// The bank declined; the pre-authorization was undone.
    PaymentDeclined { amount: Decimal, tax_id: String },
    /// A receipt fully matched the budget.
    Reconciled {
        spent: Decimal,
        matched_lines: usize,
    },
    /// A receipt (or a missed deadline) produced invalid spend.
    Sanctioned {
        invalid_spend: Decimal,
        debt: Decimal,
        timeout: bool,
    },
    DebtRepaid {
        amount: Decimal,
        remaining_debt: Decimal,
        unfrozen: bool,
    },
    BudgetRepriced { balance: Decimal },
    /// A stage was refused by the ledger; nothing was committed.
    Rejected { stage: String, reason: String },
}

impl LedgerEvent {
    pub fn new(kind: EventKind) -> Self {
        Self::at(Utc::now(), kind)
    }

    pub fn at(timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self { timestamp, kind }
    }

    pub fn to_json(&self) -> Result<String, EventsError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_json_shape() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let event = LedgerEvent::at(
            timestamp,
            EventKind::Sanctioned {
                invalid_spend: dec!(100),
                debt: dec!(100),
                timeout: true,
            },
        );

        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "Sanctioned");
        assert_eq!(value["payload"]["timeout"], true);
        assert!(value["timestamp"].as_str().unwrap().starts_with("2024-03-01T12:00:00"));
    }
}
