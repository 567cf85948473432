use crate::error::EngineError;
use crate::report::StageReport;
use chrono::{DateTime, Duration, Utc};
use configuration::{LedgerSettings, ServiceSettings};
use core_types::{BudgetItem, BudgetList};
use events::{EventKind, LedgerEvent};
use executor::{Command, Ledger, TransactionOutcome};
use ledger::{LedgerState, OperationResult};
use rust_decimal::Decimal;
use services::{
    CategoryDirectory, PaymentGateway, PaymentQr, ReceiptParser, SimulatedBank,
    SimulatedCategoryDirectory, SimulatedReceiptParser,
};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The upstream collaborators a lifecycle talks to.
#[derive(Clone)]
pub struct Services {
    pub categories: Arc<dyn CategoryDirectory>,
    pub bank: Arc<dyn PaymentGateway>,
    pub receipts: Arc<dyn ReceiptParser>,
}

impl Services {
    /// Wires the in-memory simulations configured by `[services]`.
    pub fn simulated(settings: &ServiceSettings) -> Self {
        Self {
            categories: Arc::new(SimulatedCategoryDirectory::new(settings)),
            bank: Arc::new(SimulatedBank::new(settings)),
            receipts: Arc::new(SimulatedReceiptParser::new()),
        }
    }
}

/// The ledger together with the moment its pending transaction was paid.
/// Both live behind one lock so they never disagree.
struct LedgerSlot {
    ledger: Ledger,
    pending_since: Option<DateTime<Utc>>,
}

/// The central orchestrator for a single grant.
///
/// Each stage holds the ledger lock for its whole duration, including any upstream
/// call that belongs to the same unit of work, so two callers can never interleave
/// a check and the action that depends on it.
pub struct GrantLifecycle {
    slot: Mutex<LedgerSlot>,
    services: Services,
    settings: LedgerSettings,
    events: broadcast::Sender<LedgerEvent>,
}

impl GrantLifecycle {
    pub fn new(ledger: Ledger, services: Services, settings: LedgerSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            slot: Mutex::new(LedgerSlot {
                ledger,
                pending_since: None,
            }),
            services,
            settings,
            events,
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// A copy of the committed ledger state.
    pub async fn state(&self) -> LedgerState {
        self.slot.lock().await.ledger.snapshot()
    }

    /// When the current pending transaction has to be reconciled by, if any.
    pub async fn receipt_deadline(&self) -> Option<DateTime<Utc>> {
        let slot = self.slot.lock().await;
        slot.pending_since.and_then(|since| self.deadline_after(since).ok())
    }

    /// Stage 1: scan the payment QR, pre-authorize, and pay.
    ///
    /// A declined or failed payment undoes the pre-authorization so no pending
    /// transaction survives a purchase that never happened.
    pub async fn initiate(&self, payment_qr: &str) -> Result<StageReport, EngineError> {
        let qr = PaymentQr::parse(payment_qr)?;
        let started = Utc::now();
        let deadline = self.deadline_after(started)?;
        let category = self.services.categories.lookup_category(&qr.tax_id).await?;
        tracing::info!(tax_id = %qr.tax_id, amount = %qr.amount, %category, "Initiating payment.");

        let mut slot = self.slot.lock().await;
        let before = slot.ledger.snapshot();

        let outcome = slot.ledger.apply(Command::PreAuthorize {
            spent: qr.amount,
            category: category.clone(),
        });
        if let TransactionOutcome::Failure { reason, .. } = outcome {
            self.publish(EventKind::Rejected {
                stage: "initiate".to_string(),
                reason: reason.to_string(),
            });
            return Err(EngineError::Blocked(reason));
        }
        self.publish(EventKind::Authorized {
            amount: qr.amount,
            category: category.clone(),
        });

        let approved = match self.services.bank.process_payment(qr.amount, &qr.tax_id).await {
            Ok(approved) => approved,
            Err(e) => {
                tracing::error!(error = %e, "Payment gateway failed. Undoing pre-authorization.");
                slot.ledger.restore(before);
                return Err(e.into());
            }
        };
        if !approved {
            tracing::warn!(
                tax_id = %qr.tax_id,
                amount = %qr.amount,
                "Payment declined. Undoing pre-authorization."
            );
            slot.ledger.restore(before);
            self.publish(EventKind::PaymentDeclined {
                amount: qr.amount,
                tax_id: qr.tax_id,
            });
            return Err(EngineError::PaymentDeclined);
        }

        slot.pending_since = Some(started);
        self.publish(EventKind::PaymentSettled {
            amount: qr.amount,
            tax_id: qr.tax_id,
        });
        Ok(StageReport::ReceiptRequired {
            amount: qr.amount,
            category,
            deadline,
        })
    }

    /// Stage 2: reconcile the receipt against the pending transaction.
    pub async fn finalize(&self, receipt_token: &str) -> Result<StageReport, EngineError> {
        if receipt_token.trim().is_empty() {
            return Err(EngineError::MissingReceipt);
        }
        let receipt = self.services.receipts.parse_receipt(receipt_token).await;

        let mut slot = self.slot.lock().await;
        if let Some(pending) = slot.ledger.state().pending() {
            let gap = receipt.total_cost().checked_sub(pending.amount).map(|d| d.abs());
            if gap.is_none_or(|gap| gap > self.settings.receipt_tolerance) {
                tracing::warn!(
                    receipt_total = %receipt.total_cost(),
                    pending = %pending.amount,
                    "Receipt total differs from the pre-authorized amount."
                );
            }
        }

        let outcome = slot.ledger.apply(Command::Reconcile { receipt });
        self.settle_reconciliation(&mut slot, outcome, "finalize", false)
            .map(StageReport::Reconciled)
    }

    /// Stage 3: sanction the pending transaction as if its receipt were entirely invalid.
    pub async fn timeout(&self) -> Result<StageReport, EngineError> {
        let mut slot = self.slot.lock().await;
        self.sanction_pending(&mut slot)
    }

    /// Applies the timeout sanction when the pending transaction is past its deadline.
    /// Returns `None` when there is nothing overdue.
    pub async fn sweep_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<StageReport>, EngineError> {
        let mut slot = self.slot.lock().await;
        let overdue = match slot.pending_since {
            Some(since) => {
                slot.ledger.state().pending().is_some() && now >= self.deadline_after(since)?
            }
            None => false,
        };
        if !overdue {
            return Ok(None);
        }
        tracing::warn!("Reconciliation deadline missed.");
        self.sanction_pending(&mut slot).map(Some)
    }

    /// Repays debt to lift a freeze.
    pub async fn repay(&self, amount: Decimal) -> Result<StageReport, EngineError> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidRepayment(amount));
        }

        let mut slot = self.slot.lock().await;
        match slot.ledger.apply(Command::PayDebt { amount }) {
            TransactionOutcome::Success { result, state } => {
                self.publish(EventKind::DebtRepaid {
                    amount,
                    remaining_debt: state.debt(),
                    unfrozen: result == OperationResult::Unfrozen,
                });
                Ok(StageReport::Repaid(result))
            }
            TransactionOutcome::Failure { reason, .. } => Err(self.reject("repay", reason)),
        }
    }

    /// Replaces the grant's budget. The new balance is the sum of the item costs.
    pub async fn update_budget(&self, items: Vec<BudgetItem>) -> Result<StageReport, EngineError> {
        if items.is_empty() {
            return Err(EngineError::EmptyBudget);
        }
        let budget = BudgetList::from_items(items)?;

        let mut slot = self.slot.lock().await;
        match slot.ledger.apply(Command::RePrice { budget }) {
            TransactionOutcome::Success { result, state } => {
                self.publish(EventKind::BudgetRepriced {
                    balance: state.balance(),
                });
                Ok(StageReport::BudgetUpdated(result))
            }
            TransactionOutcome::Failure { reason, .. } => Err(self.reject("update budget", reason)),
        }
    }

    fn sanction_pending(&self, slot: &mut LedgerSlot) -> Result<StageReport, EngineError> {
        let Some(pending) = slot.ledger.state().pending().cloned() else {
            return Ok(StageReport::NothingToSanction);
        };
        let receipt = BudgetList::sanction(pending.amount, &self.settings.violation_category);
        let outcome = slot.ledger.apply(Command::Reconcile { receipt });
        self.settle_reconciliation(slot, outcome, "timeout", true)
            .map(StageReport::TimeoutSanction)
    }

    fn settle_reconciliation(
        &self,
        slot: &mut LedgerSlot,
        outcome: TransactionOutcome,
        stage: &'static str,
        timeout: bool,
    ) -> Result<OperationResult, EngineError> {
        match outcome {
            TransactionOutcome::Success { result, .. } => {
                slot.pending_since = None;
                match &result {
                    OperationResult::Sanctioned { invalid_spend, debt } => {
                        self.publish(EventKind::Sanctioned {
                            invalid_spend: *invalid_spend,
                            debt: *debt,
                            timeout,
                        })
                    }
                    OperationResult::Reconciled { spent, matched_lines } => {
                        self.publish(EventKind::Reconciled {
                            spent: *spent,
                            matched_lines: *matched_lines,
                        })
                    }
                    other => tracing::debug!(result = %other, "Unexpected reconciliation result."),
                }
                Ok(result)
            }
            TransactionOutcome::Failure { reason, .. } => Err(self.reject(stage, reason)),
        }
    }

    fn reject(&self, stage: &'static str, reason: ledger::LedgerError) -> EngineError {
        self.publish(EventKind::Rejected {
            stage: stage.to_string(),
            reason: reason.to_string(),
        });
        EngineError::Rejected { stage, reason }
    }

    fn publish(&self, kind: EventKind) {
        // No subscribers is fine; the audit trail is optional.
        let _ = self.events.send(LedgerEvent::new(kind));
    }

    fn deadline_after(&self, since: DateTime<Utc>) -> Result<DateTime<Utc>, EngineError> {
        let hours = self.settings.reconciliation_deadline_hours;
        Duration::try_hours(i64::from(hours))
            .and_then(|window| since.checked_add_signed(window))
            .ok_or(EngineError::DeadlineOutOfRange(hours))
    }
}
