use crate::error::LedgerError;
use core_types::{BudgetItem, BudgetList, CategoryCode, PendingTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The full state of a grant's budget ledger.
///
/// Budget items live behind an `Arc` and are copied on first write, so cloning the
/// state is a cheap structural snapshot. A clone and its origin never observe each
/// other's mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    pub(crate) balance: Decimal,
    pub(crate) items: Arc<Vec<BudgetItem>>,
    pub(crate) frozen: bool,
    pub(crate) debt: Decimal,
    pub(crate) pending: Option<PendingTransaction>,
}

impl LedgerState {
    /// Creates the ledger for a new grant from its initial budget.
    pub fn new(initial: BudgetList) -> Result<Self, LedgerError> {
        if initial.total_cost().is_sign_negative() {
            return Err(LedgerError::NegativeTotal(initial.total_cost()));
        }
        let (items, balance) = initial.into_parts();
        tracing::debug!(%balance, items = items.len(), "Ledger created.");
        Ok(Self {
            balance,
            items: Arc::new(items),
            frozen: false,
            debt: Decimal::ZERO,
            pending: None,
        })
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn items(&self) -> &[BudgetItem] {
        &self.items
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn debt(&self) -> Decimal {
        self.debt
    }

    pub fn pending(&self) -> Option<&PendingTransaction> {
        self.pending.as_ref()
    }

    /// Sum of the remaining cost of every item that may be spent under `category`.
    pub fn available_for(&self, category: &CategoryCode) -> Result<Decimal, LedgerError> {
        self.items
            .iter()
            .filter(|item| item.has_category(category))
            .try_fold(Decimal::ZERO, |acc, item| {
                acc.checked_add(item.remaining_cost).ok_or_else(|| {
                    LedgerError::Fault("overflow while summing category funds".to_string())
                })
            })
    }

    /// Returns true when `self` and `other` still share the same item allocation.
    pub fn shares_items_with(&self, other: &LedgerState) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::CoreError;
    use rust_decimal_macros::dec;

    fn budget() -> BudgetList {
        BudgetList::from_items(vec![
            BudgetItem::new("Food", 5, dec!(500), ["47.11"]),
            BudgetItem::new("Snacks", 1, dec!(50), ["47.11", "47.24"]),
            BudgetItem::new("Books", 2, dec!(120), ["47.61"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_ledger_starts_clean() {
        let state = LedgerState::new(budget()).unwrap();
        assert_eq!(state.balance(), dec!(670));
        assert_eq!(state.items().len(), 3);
        assert!(!state.is_frozen());
        assert_eq!(state.debt(), Decimal::ZERO);
        assert!(state.pending().is_none());
    }

    #[test]
    fn test_negative_line_never_reaches_the_ledger() {
        let budget = BudgetList::new(
            vec![
                BudgetItem::new("Food", 1, dec!(500), ["47.11"]),
                BudgetItem::new("Bogus", 1, dec!(-300), ["47.11"]),
            ],
            dec!(200),
        );
        assert!(matches!(budget, Err(CoreError::InvalidInput(..))));

        // The genuine lines alone keep their full category funds.
        let mut state = LedgerState::new(
            BudgetList::from_items(vec![BudgetItem::new("Food", 1, dec!(500), ["47.11"])]).unwrap(),
        )
        .unwrap();
        assert_eq!(state.available_for(&"47.11".into()).unwrap(), dec!(500));
        assert!(state.pre_authorize(dec!(300), "47.11".into()).is_ok());
    }

    #[test]
    fn test_available_for_sums_matching_items() {
        let state = LedgerState::new(budget()).unwrap();
        assert_eq!(state.available_for(&"47.11".into()).unwrap(), dec!(550));
        assert_eq!(state.available_for(&"47.61".into()).unwrap(), dec!(120));
        assert_eq!(state.available_for(&"99.99".into()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_clone_is_isolated() {
        let original = LedgerState::new(budget()).unwrap();
        let mut copy = original.clone();
        assert!(copy.shares_items_with(&original));

        Arc::make_mut(&mut copy.items)[0].remaining_cost = dec!(1);
        copy.balance = dec!(1);

        assert!(!copy.shares_items_with(&original));
        assert_eq!(original.items()[0].remaining_cost, dec!(500));
        assert_eq!(original.balance(), dec!(670));
    }
}
