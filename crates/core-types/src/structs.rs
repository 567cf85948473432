use crate::category::CategoryCode;
use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name of the single line carried by a timeout sanction receipt.
pub const SANCTION_LINE_NAME: &str = "TIMEOUT_PENALTY";

/// One allocatable budget line.
///
/// The same shape doubles as a receipt line: a purchased item with its own cost
/// and the categories it was sold under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    pub name: String,
    /// Informational only; never used in matching.
    #[serde(default, alias = "amount")]
    pub quantity: u32,
    /// Funds still available on this line. Receipt lines carry their purchase cost here.
    #[serde(alias = "cost")]
    pub remaining_cost: Decimal,
    pub categories: BTreeSet<CategoryCode>,
}

impl BudgetItem {
    pub fn new<I, C>(name: impl Into<String>, quantity: u32, cost: Decimal, categories: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CategoryCode>,
    {
        Self {
            name: name.into(),
            quantity,
            remaining_cost: cost,
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true when this line may be spent under at least one of `categories`.
    pub fn accepts(&self, categories: &BTreeSet<CategoryCode>) -> bool {
        !self.categories.is_disjoint(categories)
    }

    pub fn has_category(&self, category: &CategoryCode) -> bool {
        self.categories.contains(category)
    }

    pub fn can_cover(&self, cost: Decimal) -> bool {
        self.remaining_cost >= cost
    }
}

/// An ordered list of budget items with a declared total.
///
/// Used as the initial budget, as a re-priced budget, and as the shape of an
/// incoming receipt. Item costs must be non-negative and the declared total must
/// equal their sum; both are checked on construction and on deserialization alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawBudgetList")]
pub struct BudgetList {
    items: Vec<BudgetItem>,
    total_cost: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBudgetList {
    #[serde(alias = "objects")]
    items: Vec<BudgetItem>,
    total_cost: Decimal,
}

impl TryFrom<RawBudgetList> for BudgetList {
    type Error = CoreError;

    fn try_from(raw: RawBudgetList) -> Result<Self, Self::Error> {
        BudgetList::new(raw.items, raw.total_cost)
    }
}

impl BudgetList {
    /// Creates a list with an explicitly declared total, rejecting inconsistent totals.
    pub fn new(items: Vec<BudgetItem>, total_cost: Decimal) -> Result<Self, CoreError> {
        let computed = sum_costs(&items)?;
        if computed != total_cost {
            tracing::debug!(
                %computed,
                declared = %total_cost,
                "Rejected budget list with inconsistent total."
            );
            return Err(CoreError::TotalMismatch {
                declared: total_cost,
                computed,
            });
        }
        Ok(Self { items, total_cost })
    }

    /// Creates a list whose total is derived from its items.
    pub fn from_items(items: Vec<BudgetItem>) -> Result<Self, CoreError> {
        let total_cost = sum_costs(&items)?;
        Ok(Self { items, total_cost })
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_cost: Decimal::ZERO,
        }
    }

    /// Builds the synthetic receipt used to sanction a missed reconciliation deadline.
    ///
    /// The single line sits under `violation_category`, which must never appear on a
    /// real budget item, so the whole amount is treated as invalid spend.
    pub fn sanction(amount: Decimal, violation_category: &CategoryCode) -> Self {
        Self {
            items: vec![BudgetItem::new(
                SANCTION_LINE_NAME,
                1,
                amount,
                [violation_category.clone()],
            )],
            total_cost: amount,
        }
    }

    pub fn items(&self) -> &[BudgetItem] {
        &self.items
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_parts(self) -> (Vec<BudgetItem>, Decimal) {
        (self.items, self.total_cost)
    }
}

fn sum_costs(items: &[BudgetItem]) -> Result<Decimal, CoreError> {
    items.iter().try_fold(Decimal::ZERO, |acc, item| {
        if item.remaining_cost < Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                format!("cost of '{}'", item.name),
                format!("{} is negative", item.remaining_cost),
            ));
        }
        acc.checked_add(item.remaining_cost).ok_or_else(|| {
            CoreError::Calculation(format!("overflow while summing cost of '{}'", item.name))
        })
    })
}

/// A logically reserved, not yet deducted, spend awaiting its receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub amount: Decimal,
    pub expected_category: CategoryCode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn food(cost: Decimal) -> BudgetItem {
        BudgetItem::new("Food", 1, cost, ["47.11"])
    }

    #[test]
    fn test_new_rejects_mismatched_total() {
        let err = BudgetList::new(vec![food(dec!(500))], dec!(600)).unwrap_err();
        assert_eq!(
            err,
            CoreError::TotalMismatch {
                declared: dec!(600),
                computed: dec!(500)
            }
        );
    }

    #[test]
    fn test_from_items_derives_total() {
        let list = BudgetList::from_items(vec![food(dec!(500)), food(dec!(250.50))]).unwrap();
        assert_eq!(list.total_cost(), dec!(750.50));
        assert_eq!(list.items().len(), 2);
    }

    #[test]
    fn test_negative_item_cost_is_rejected() {
        let items = vec![food(dec!(500)), BudgetItem::new("Bogus", 1, dec!(-300), ["47.11"])];

        assert!(matches!(
            BudgetList::from_items(items.clone()),
            Err(CoreError::InvalidInput(ref field, _)) if field == "cost of 'Bogus'"
        ));
        assert!(matches!(
            BudgetList::new(items, dec!(200)),
            Err(CoreError::InvalidInput(..))
        ));

        let json = r#"{"items":[{"name":"Food","cost":500,"categories":["47.11"]},
            {"name":"Bogus","cost":-300,"categories":["47.11"]}],"totalCost":200}"#;
        assert!(serde_json::from_str::<BudgetList>(json).is_err());
    }

    #[test]
    fn test_zero_cost_line_is_allowed() {
        let list = BudgetList::from_items(vec![food(Decimal::ZERO)]).unwrap();
        assert_eq!(list.total_cost(), Decimal::ZERO);
    }

    #[test]
    fn test_accepts_requires_intersection() {
        let item = BudgetItem::new("Office", 2, dec!(100), ["47.11", "47.62"]);
        let hit: BTreeSet<CategoryCode> = [CategoryCode::from("47.62")].into_iter().collect();
        let miss: BTreeSet<CategoryCode> = [CategoryCode::from("99.99")].into_iter().collect();
        assert!(item.accepts(&hit));
        assert!(!item.accepts(&miss));
        assert!(!item.accepts(&BTreeSet::new()));
    }

    #[test]
    fn test_sanction_receipt_is_consistent() {
        let violation = CategoryCode::new("TIMEOUT_VIOLATION");
        let receipt = BudgetList::sanction(dec!(100), &violation);
        assert_eq!(receipt.total_cost(), dec!(100));
        assert_eq!(receipt.items()[0].name, SANCTION_LINE_NAME);
        assert!(receipt.items()[0].has_category(&violation));
    }

    #[test]
    fn test_deserialize_validates_total() {
        let ok = r#"{"items":[{"name":"Milk","cost":100.0,"categories":["47.11"]}],"totalCost":100}"#;
        let list: BudgetList = serde_json::from_str(ok).unwrap();
        assert_eq!(list.items()[0].remaining_cost, dec!(100));
        assert_eq!(list.items()[0].quantity, 0);

        let bad = r#"{"items":[{"name":"Milk","cost":100.0,"categories":["47.11"]}],"totalCost":90}"#;
        assert!(serde_json::from_str::<BudgetList>(bad).is_err());
    }
}
