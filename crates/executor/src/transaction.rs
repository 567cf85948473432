use crate::command::Command;
use crate::error::ExecutorError;
use core_types::BudgetList;
use ledger::{LedgerError, LedgerState, OperationResult};
use serde::{Serialize, Serializer};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Whether a transaction committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Success,
    Error,
}

/// The result of running one command against a ledger state.
///
/// Failures are data, never panics or propagated errors: on `Failure` the carried
/// state is the untouched pre-call snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    Success {
        result: OperationResult,
        state: LedgerState,
    },
    Failure {
        reason: LedgerError,
        state: LedgerState,
    },
}

impl TransactionOutcome {
    pub fn status(&self) -> Status {
        match self {
            TransactionOutcome::Success { .. } => Status::Success,
            TransactionOutcome::Failure { .. } => Status::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == Status::Success
    }

    pub fn result(&self) -> Option<&OperationResult> {
        match self {
            TransactionOutcome::Success { result, .. } => Some(result),
            TransactionOutcome::Failure { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&LedgerError> {
        match self {
            TransactionOutcome::Success { .. } => None,
            TransactionOutcome::Failure { reason, .. } => Some(reason),
        }
    }

    /// The state after the call: the new state on success, the snapshot on failure.
    pub fn state(&self) -> &LedgerState {
        match self {
            TransactionOutcome::Success { state, .. }
            | TransactionOutcome::Failure { state, .. } => state,
        }
    }

    /// Human-readable summary: the result on success, the failure reason otherwise.
    pub fn message(&self) -> String {
        match self {
            TransactionOutcome::Success { result, .. } => result.to_string(),
            TransactionOutcome::Failure { reason, .. } => reason.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeView<'a> {
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a OperationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a LedgerError>,
    message: String,
    new_state: &'a LedgerState,
}

impl Serialize for TransactionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OutcomeView {
            status: self.status(),
            result: self.result(),
            reason: self.reason(),
            message: self.message(),
            new_state: self.state(),
        }
        .serialize(serializer)
    }
}

/// Runs `command` against an independent copy of `state`.
///
/// The copy becomes the new state only if the operation completes. A validation
/// failure, an internal fault, or a panic inside the operation all yield a
/// `Failure` carrying the original state unchanged.
pub fn apply(state: &LedgerState, command: Command) -> TransactionOutcome {
    let operation = command.name();
    let mut working = state.clone();

    let attempt = panic::catch_unwind(AssertUnwindSafe(|| dispatch(&mut working, command)));

    match attempt {
        Ok(Ok(result)) => {
            if result.is_warning() {
                tracing::warn!(operation, %result, "Committed with policy warning.");
            } else {
                tracing::info!(operation, %result, "Committed.");
            }
            TransactionOutcome::Success {
                result,
                state: working,
            }
        }
        Ok(Err(reason)) => {
            if reason.is_fault() {
                tracing::error!(operation, %reason, "Internal fault. Rolled back.");
            } else {
                tracing::warn!(operation, %reason, "Rejected. Rolled back.");
            }
            TransactionOutcome::Failure {
                reason,
                state: state.clone(),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(operation, panic = %message, "Operation panicked. Rolled back.");
            TransactionOutcome::Failure {
                reason: LedgerError::Fault(format!("operation '{operation}' panicked: {message}")),
                state: state.clone(),
            }
        }
    }
}

fn dispatch(state: &mut LedgerState, command: Command) -> Result<OperationResult, LedgerError> {
    match command {
        Command::PreAuthorize { spent, category } => state.pre_authorize(spent, category),
        Command::Reconcile { receipt } => state.reconcile(&receipt),
        Command::PayDebt { amount } => state.pay_debt(amount),
        Command::RePrice { budget } => state.re_price(budget),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Owner of a grant's committed ledger state.
///
/// Every mutation goes through `apply`, which commits on success and leaves the
/// committed state untouched on failure.
#[derive(Debug, Clone)]
pub struct Ledger {
    state: LedgerState,
}

impl Ledger {
    pub fn new(initial: BudgetList) -> Result<Self, LedgerError> {
        Ok(Self {
            state: LedgerState::new(initial)?,
        })
    }

    pub fn apply(&mut self, command: Command) -> TransactionOutcome {
        let outcome = apply(&self.state, command);
        if let TransactionOutcome::Success { state, .. } = &outcome {
            self.state = state.clone();
        }
        outcome
    }

    /// Name-based entry point. Unknown names and malformed arguments are caller
    /// errors and never touch the ledger.
    pub fn apply_named(
        &mut self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<TransactionOutcome, ExecutorError> {
        let command = Command::from_named(name, args)?;
        Ok(self.apply(command))
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn snapshot(&self) -> LedgerState {
        self.state.clone()
    }

    /// Reinstates a snapshot taken earlier with `snapshot`. Callers use this to
    /// undo a committed command when an external step that belongs to the same
    /// unit of work fails.
    pub fn restore(&mut self, snapshot: LedgerState) {
        tracing::debug!("Ledger restored from snapshot.");
        self.state = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::BudgetItem;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn food_budget() -> BudgetList {
        BudgetList::new(vec![BudgetItem::new("Food", 1, dec!(500), ["47.11"])], dec!(500)).unwrap()
    }

    fn line(cost: Decimal, category: &str) -> BudgetList {
        BudgetList::from_items(vec![BudgetItem::new("line", 1, cost, [category])]).unwrap()
    }

    fn pre_authorize(spent: Decimal) -> Command {
        Command::PreAuthorize {
            spent,
            category: "47.11".into(),
        }
    }

    fn reconcile(cost: Decimal, category: &str) -> Command {
        Command::Reconcile {
            receipt: line(cost, category),
        }
    }

    #[test]
    fn test_success_commits() {
        let mut ledger = Ledger::new(food_budget()).unwrap();
        let outcome = ledger.apply(pre_authorize(dec!(100)));

        assert_eq!(outcome.status(), Status::Success);
        assert_eq!(outcome.state(), ledger.state());
        assert_eq!(ledger.state().pending().map(|p| p.amount), Some(dec!(100)));
    }

    #[test]
    fn test_failure_leaves_state_untouched() {
        let mut ledger = Ledger::new(food_budget()).unwrap();
        let before = ledger.snapshot();

        for command in [
            pre_authorize(dec!(0)),
            pre_authorize(dec!(900)),
            reconcile(dec!(10), "47.11"),
            Command::PayDebt { amount: dec!(10) },
        ] {
            let outcome = ledger.apply(command);
            assert_eq!(outcome.status(), Status::Error);
            assert_eq!(outcome.state(), &before);
            assert_eq!(ledger.state(), &before);
        }
    }

    #[test]
    fn test_policy_warning_commits() {
        let mut ledger = Ledger::new(food_budget()).unwrap();
        ledger.apply(pre_authorize(dec!(100)));

        let outcome = ledger.apply(reconcile(dec!(100), "99.99"));

        assert!(outcome.is_success());
        assert!(outcome.result().is_some_and(OperationResult::is_warning));
        assert!(ledger.state().is_frozen());
        assert_eq!(ledger.state().debt(), dec!(100));
        assert_eq!(ledger.state().balance(), dec!(400));
        assert!(ledger.state().pending().is_none());
    }

    #[test]
    fn test_re_price_on_frozen_ledger_keeps_frozen_state() {
        let mut ledger = Ledger::new(food_budget()).unwrap();
        ledger.apply(pre_authorize(dec!(50)));
        ledger.apply(reconcile(dec!(50), "99.99"));
        let frozen = ledger.snapshot();

        let outcome = ledger.apply(Command::RePrice {
            budget: food_budget(),
        });
        assert_eq!(outcome.reason(), Some(&LedgerError::AccountFrozen));
        assert_eq!(ledger.state(), &frozen);
    }

    #[test]
    fn test_apply_named_rejects_unknown_operation() {
        let mut ledger = Ledger::new(food_budget()).unwrap();
        let before = ledger.snapshot();
        assert!(matches!(
            ledger.apply_named("freeze", json!({})),
            Err(ExecutorError::UnknownOperation(_))
        ));
        assert_eq!(ledger.state(), &before);
    }

    #[test]
    fn test_outcome_serializes_status_and_new_state() {
        let mut ledger = Ledger::new(food_budget()).unwrap();
        let outcome = ledger
            .apply_named("preAuthorize", json!({ "spent": "100", "category": "47.11" }))
            .unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "SUCCESS");
        assert!(value["newState"]["pending"].is_object());

        let outcome = ledger.apply_named("payDebt", json!({ "amount": "5" })).unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "ERROR");
        assert_eq!(value["message"], "There is no debt to pay.");
    }

    #[test]
    fn test_restore_reinstates_snapshot() {
        let mut ledger = Ledger::new(food_budget()).unwrap();
        let snapshot = ledger.snapshot();
        ledger.apply(pre_authorize(dec!(10)));
        assert!(ledger.state().pending().is_some());

        ledger.restore(snapshot.clone());
        assert_eq!(ledger.state(), &snapshot);
    }
}
