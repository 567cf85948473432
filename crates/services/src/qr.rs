use crate::error::ServiceError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// The payload of a payment QR code: `tin:<tax id>|amount:<decimal>`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentQr {
    pub tax_id: String,
    pub amount: Decimal,
}

impl PaymentQr {
    pub fn parse(payload: &str) -> Result<Self, ServiceError> {
        let mut tax_id = None;
        let mut amount = None;

        for field in payload.trim().split('|') {
            let (key, value) = field
                .split_once(':')
                .ok_or_else(|| ServiceError::InvalidQr(format!("field '{field}' has no value")))?;
            match key.trim() {
                "tin" => tax_id = Some(value.trim().to_string()),
                "amount" => {
                    let parsed = Decimal::from_str(value.trim())
                        .map_err(|e| ServiceError::InvalidQr(format!("amount '{value}': {e}")))?;
                    amount = Some(parsed);
                }
                other => tracing::debug!(field = other, "Ignoring unknown payment QR field."),
            }
        }

        match (tax_id, amount) {
            (Some(tax_id), Some(amount)) if !tax_id.is_empty() => Ok(Self { tax_id, amount }),
            _ => Err(ServiceError::InvalidQr(format!(
                "expected 'tin:<id>|amount:<value>', got '{payload}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_well_formed_payload() {
        let qr = PaymentQr::parse("tin:7700000000|amount:100.50").unwrap();
        assert_eq!(qr.tax_id, "7700000000");
        assert_eq!(qr.amount, dec!(100.50));
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        for payload in [
            "",
            "tin:7700000000",
            "amount:10",
            "tin:|amount:10",
            "tin:1|amount:ten",
            "garbage",
        ] {
            assert!(PaymentQr::parse(payload).is_err(), "accepted {payload:?}");
        }
    }
}
