use crate::error::ServiceError;
use crate::{CategoryDirectory, PaymentGateway, ReceiptParser};
use async_trait::async_trait;
use configuration::ServiceSettings;
use core_types::{BudgetItem, BudgetList, CategoryCode};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// An in-memory stand-in for the tax registry's activity-code lookup.
#[derive(Debug, Clone)]
pub struct SimulatedCategoryDirectory {
    directory: HashMap<String, CategoryCode>,
    default_category: CategoryCode,
}

impl SimulatedCategoryDirectory {
    pub fn new(settings: &ServiceSettings) -> Self {
        Self {
            directory: settings.category_directory.clone(),
            default_category: settings.default_category.clone(),
        }
    }
}

#[async_trait]
impl CategoryDirectory for SimulatedCategoryDirectory {
    async fn lookup_category(&self, tax_id: &str) -> Result<CategoryCode, ServiceError> {
        let category = self
            .directory
            .get(tax_id)
            .cloned()
            .unwrap_or_else(|| self.default_category.clone());
        tracing::debug!(tax_id, %category, "Category lookup.");
        Ok(category)
    }
}

/// The "virtual bank": approves or declines every payment according to configuration.
#[derive(Debug, Clone)]
pub struct SimulatedBank {
    approve: bool,
}

impl SimulatedBank {
    pub fn new(settings: &ServiceSettings) -> Self {
        Self {
            approve: settings.approve_payments,
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedBank {
    async fn process_payment(&self, amount: Decimal, tax_id: &str) -> Result<bool, ServiceError> {
        tracing::debug!(%amount, tax_id, approved = self.approve, "Simulated payment.");
        Ok(self.approve)
    }
}

/// Turns receipt tokens into purchase lists without contacting the fiscal service.
///
/// A token holding a JSON `BudgetList` is decoded as-is. Otherwise two canned
/// receipts are recognised by keyword, and anything else is an empty list.
#[derive(Debug, Clone, Default)]
pub struct SimulatedReceiptParser;

impl SimulatedReceiptParser {
    pub fn new() -> Self {
        Self
    }

    fn canned(token: &str) -> Option<BudgetList> {
        let line = if token.contains("valid_food") {
            BudgetItem::new("Milk", 1, Decimal::ONE_HUNDRED, ["47.11"])
        } else if token.contains("invalid_alcohol") {
            BudgetItem::new("Vodka", 1, Decimal::ONE_HUNDRED, ["99.99"])
        } else {
            return None;
        };
        BudgetList::from_items(vec![line]).ok()
    }
}

#[async_trait]
impl ReceiptParser for SimulatedReceiptParser {
    async fn parse_receipt(&self, token: &str) -> BudgetList {
        let token = token.trim();
        if token.starts_with('{') {
            match serde_json::from_str::<BudgetList>(token) {
                Ok(list) => return list,
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed receipt payload. Treating as empty.");
                    return BudgetList::empty();
                }
            }
        }
        Self::canned(token).unwrap_or_else(|| {
            tracing::warn!(token, "Unrecognised receipt token. Treating as empty.");
            BudgetList::empty()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn settings() -> ServiceSettings {
        let mut settings = ServiceSettings::default();
        settings
            .category_directory
            .insert("7700000000".to_string(), CategoryCode::new("47.11"));
        settings
    }

    #[tokio::test]
    async fn test_lookup_falls_back_to_default() {
        let directory = SimulatedCategoryDirectory::new(&settings());
        assert_eq!(directory.lookup_category("7700000000").await.unwrap().as_str(), "47.11");
        assert_eq!(directory.lookup_category("0000000000").await.unwrap().as_str(), "00.00");
    }

    #[tokio::test]
    async fn test_bank_follows_settings() {
        let mut settings = settings();
        assert!(SimulatedBank::new(&settings).process_payment(dec!(10), "1").await.unwrap());
        settings.approve_payments = false;
        assert!(!SimulatedBank::new(&settings).process_payment(dec!(10), "1").await.unwrap());
    }

    #[tokio::test]
    async fn test_receipt_parser_tokens() {
        let parser = SimulatedReceiptParser::new();

        let food = parser.parse_receipt("fns://valid_food/123").await;
        assert_eq!(food.total_cost(), dec!(100));
        assert_eq!(food.items()[0].name, "Milk");

        let alcohol = parser.parse_receipt("invalid_alcohol").await;
        assert!(alcohol.items()[0].has_category(&"99.99".into()));

        assert!(parser.parse_receipt("unknown").await.is_empty());
        assert!(parser.parse_receipt("{not json").await.is_empty());
    }

    #[tokio::test]
    async fn test_receipt_parser_json_payload() {
        let parser = SimulatedReceiptParser::new();
        let token = r#"{"items":[{"name":"Bread","cost":"30","categories":["47.11"]},{"name":"Cheese","cost":"70","categories":["47.11"]}],"totalCost":"100"}"#;
        let receipt = parser.parse_receipt(token).await;
        assert_eq!(receipt.items().len(), 2);
        assert_eq!(receipt.total_cost(), dec!(100));

        // Inconsistent totals are malformed input, not an error.
        let inconsistent = r#"{"items":[{"name":"Bread","cost":"30","categories":["47.11"]}],"totalCost":"100"}"#;
        assert!(parser.parse_receipt(inconsistent).await.is_empty());
    }
}
