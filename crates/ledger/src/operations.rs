use crate::error::LedgerError;
use crate::state::LedgerState;
use core_types::{BudgetList, CategoryCode, PendingTransaction};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The value an operation returns when it completes.
///
/// `Sanctioned` is a policy outcome: the operation succeeded and its effects are
/// committed, but the receipt contained spend that could not be matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OperationResult {
    Authorized {
        amount: Decimal,
        category: CategoryCode,
    },
    Reconciled {
        matched_lines: usize,
        spent: Decimal,
    },
    Sanctioned {
        invalid_spend: Decimal,
        debt: Decimal,
    },
    DebtReduced {
        remaining: Decimal,
    },
    Unfrozen,
    RePriced {
        balance: Decimal,
    },
}

impl OperationResult {
    pub fn is_warning(&self) -> bool {
        matches!(self, OperationResult::Sanctioned { .. })
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationResult::Authorized { amount, category } => write!(
                f,
                "Initially verified {amount} under {category}. Waiting for receipt..."
            ),
            OperationResult::Reconciled { .. } => {
                write!(f, "Receipt verified successfully. Transaction cleared.")
            }
            OperationResult::Sanctioned { invalid_spend, .. } => write!(
                f,
                "Warning! Receipt contained invalid items. Debt: {invalid_spend}. Account frozen."
            ),
            OperationResult::DebtReduced { remaining } => {
                write!(f, "Debt reduced. Remaining debt: {remaining}")
            }
            OperationResult::Unfrozen => write!(f, "Debt paid off. Account unfrozen."),
            OperationResult::RePriced { balance } => {
                write!(f, "Grant estimate successfully updated. New balance: {balance}")
            }
        }
    }
}

/// What matching a receipt against the budget items produced.
struct MatchSummary {
    matched_lines: usize,
    invalid_spend: Decimal,
}

impl LedgerState {
    /// Step 1: checks a spend against the category limits before payment.
    ///
    /// Records the pending transaction only. No item or balance is reserved.
    pub fn pre_authorize(
        &mut self,
        spent: Decimal,
        category: CategoryCode,
    ) -> Result<OperationResult, LedgerError> {
        if spent <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(spent));
        }
        if self.frozen {
            return Err(LedgerError::AccountFrozen);
        }
        if self.pending.is_some() {
            return Err(LedgerError::PendingTransactionExists);
        }

        let available = self.available_for(&category)?;
        if available < spent {
            return Err(LedgerError::InsufficientCategoryFunds {
                category,
                available,
                requested: spent,
            });
        }

        tracing::debug!(%spent, %category, %available, "Spend pre-authorized.");
        self.pending = Some(PendingTransaction {
            amount: spent,
            expected_category: category.clone(),
        });
        Ok(OperationResult::Authorized {
            amount: spent,
            category,
        })
    }

    /// Step 2: settles the pending transaction against the actual receipt.
    ///
    /// Each receipt line is matched greedily to the first budget item, in list
    /// order, that shares a category with it and still covers its cost. Unmatched
    /// cost becomes debt and freezes the account. The receipt's declared total
    /// leaves the balance whatever the match outcome.
    pub fn reconcile(&mut self, receipt: &BudgetList) -> Result<OperationResult, LedgerError> {
        let pending_amount = match &self.pending {
            Some(pending) => pending.amount,
            None => return Err(LedgerError::NoPendingTransaction),
        };
        if let Some(line) = receipt
            .items()
            .iter()
            .find(|line| line.remaining_cost.is_sign_negative())
        {
            return Err(LedgerError::InvalidReceipt(format!(
                "line '{}' has negative cost {}",
                line.name, line.remaining_cost
            )));
        }

        // An empty receipt settles nothing, so whatever was pending is unaccounted for.
        let (summary, charged) = if receipt.is_empty() && pending_amount > Decimal::ZERO {
            let summary = MatchSummary {
                matched_lines: 0,
                invalid_spend: pending_amount,
            };
            (summary, pending_amount)
        } else {
            (self.match_receipt(receipt)?, receipt.total_cost())
        };

        self.balance = self
            .balance
            .checked_sub(charged)
            .ok_or_else(|| LedgerError::Fault("balance underflow".to_string()))?;
        self.pending = None;

        if summary.invalid_spend > Decimal::ZERO {
            self.debt = self
                .debt
                .checked_add(summary.invalid_spend)
                .ok_or_else(|| LedgerError::Fault("debt overflow".to_string()))?;
            self.freeze();
            tracing::warn!(
                invalid_spend = %summary.invalid_spend,
                debt = %self.debt,
                "Receipt contained invalid spend. Account frozen."
            );
            return Ok(OperationResult::Sanctioned {
                invalid_spend: summary.invalid_spend,
                debt: self.debt,
            });
        }

        tracing::debug!(matched = summary.matched_lines, %charged, "Receipt reconciled.");
        Ok(OperationResult::Reconciled {
            matched_lines: summary.matched_lines,
            spent: charged,
        })
    }

    fn match_receipt(&mut self, receipt: &BudgetList) -> Result<MatchSummary, LedgerError> {
        let items = Arc::make_mut(&mut self.items);
        let mut summary = MatchSummary {
            matched_lines: 0,
            invalid_spend: Decimal::ZERO,
        };

        for line in receipt.items() {
            let cost = line.remaining_cost;
            match items
                .iter_mut()
                .find(|item| item.accepts(&line.categories) && item.can_cover(cost))
            {
                Some(item) => {
                    item.remaining_cost -= cost;
                    summary.matched_lines += 1;
                }
                None => {
                    tracing::debug!(
                        line = %line.name,
                        %cost,
                        "No budget item covers receipt line."
                    );
                    summary.invalid_spend = summary
                        .invalid_spend
                        .checked_add(cost)
                        .ok_or_else(|| LedgerError::Fault("invalid spend overflow".to_string()))?;
                }
            }
        }
        Ok(summary)
    }

    /// Repays debt; reaching zero lifts the freeze. Overpayment clamps debt to zero.
    pub fn pay_debt(&mut self, amount: Decimal) -> Result<OperationResult, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        if self.debt.is_zero() {
            return Err(LedgerError::NoDebt);
        }

        self.debt = self
            .debt
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::Fault("debt underflow".to_string()))?;
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Fault("balance overflow".to_string()))?;

        if self.debt <= Decimal::ZERO {
            self.debt = Decimal::ZERO;
            self.frozen = false;
            tracing::info!(%amount, "Debt paid off. Account unfrozen.");
            return Ok(OperationResult::Unfrozen);
        }

        tracing::debug!(%amount, remaining = %self.debt, "Debt reduced.");
        Ok(OperationResult::DebtReduced {
            remaining: self.debt,
        })
    }

    /// Replaces the budget items and balance wholesale, e.g. after a grant amendment.
    pub fn re_price(&mut self, budget: BudgetList) -> Result<OperationResult, LedgerError> {
        if self.frozen {
            return Err(LedgerError::AccountFrozen);
        }
        if self.pending.is_some() {
            return Err(LedgerError::PendingTransactionExists);
        }
        if budget.total_cost().is_sign_negative() {
            return Err(LedgerError::NegativeTotal(budget.total_cost()));
        }

        let (items, balance) = budget.into_parts();
        self.items = Arc::new(items);
        self.balance = balance;
        tracing::debug!(%balance, items = self.items.len(), "Budget re-priced.");
        Ok(OperationResult::RePriced { balance })
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }
}
