use crate::error::ExecutorError;
use core_types::{BudgetList, CategoryCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of operations a caller may invoke on a ledger.
///
/// Serialized as `{"op": "preAuthorize", "args": {...}}`. `freeze` is deliberately
/// absent: it only ever happens as a side effect of `reconcile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "camelCase")]
pub enum Command {
    PreAuthorize {
        spent: Decimal,
        #[serde(alias = "OKVED")]
        category: CategoryCode,
    },
    Reconcile {
        receipt: BudgetList,
    },
    PayDebt {
        amount: Decimal,
    },
    RePrice {
        #[serde(alias = "newItemList")]
        budget: BudgetList,
    },
}

impl Command {
    pub fn kind(&self) -> OperationKind {
        match self {
            Command::PreAuthorize { .. } => OperationKind::PreAuthorize,
            Command::Reconcile { .. } => OperationKind::Reconcile,
            Command::PayDebt { .. } => OperationKind::PayDebt,
            Command::RePrice { .. } => OperationKind::RePrice,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Builds a command from an operation name and its JSON arguments.
    pub fn from_named(name: &str, args: serde_json::Value) -> Result<Self, ExecutorError> {
        let kind: OperationKind = name.parse()?;
        let envelope = serde_json::json!({ "op": kind.as_str(), "args": args });
        serde_json::from_value(envelope).map_err(|e| ExecutorError::InvalidArguments {
            operation: kind.as_str().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Names of the invocable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    PreAuthorize,
    Reconcile,
    PayDebt,
    RePrice,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::PreAuthorize,
        OperationKind::Reconcile,
        OperationKind::PayDebt,
        OperationKind::RePrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::PreAuthorize => "preAuthorize",
            OperationKind::Reconcile => "reconcile",
            OperationKind::PayDebt => "payDebt",
            OperationKind::RePrice => "rePrice",
        }
    }
}

impl FromStr for OperationKind {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ExecutorError::UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
