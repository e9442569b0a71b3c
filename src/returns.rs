use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::ledger::LoanLedger;
use crate::loan::{Loan, ReturnEvent};
use crate::types::{Currency, ItemRef, LoanBalance, LoanId, LoanStatus, ReturnEventId};

/// return-submission command from the intake surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnInput {
    /// DANFE or equivalent; optional at submission
    pub return_document_id: Option<String>,
    pub received_item: ItemRef,
    pub returned_value: Money,
    pub currency: Currency,
    /// paper date on the return document
    pub return_date: NaiveDate,
    pub processed_by: String,
    pub notes: Option<String>,
}

/// result of an accepted return, ready for immediate display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnOutcome {
    pub event_id: ReturnEventId,
    pub balance: LoanBalance,
    pub status: LoanStatus,
}

/// projected balance and status without committing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPreview {
    pub projected_balance: LoanBalance,
    pub projected_status: LoanStatus,
}

/// applies return events to loans and recomputes balance and status.
///
/// Balance and status are always recomputed over the full event history
/// inside the loan's exclusive section; there are no incremental counters
/// to double-count under retries.
pub struct ReturnProcessor {
    ledger: Arc<LoanLedger>,
}

impl ReturnProcessor {
    pub fn new(ledger: Arc<LoanLedger>) -> Self {
        Self { ledger }
    }

    /// validate and append a return, then derive the new balance and
    /// status from the full history
    pub fn submit_return(
        &self,
        loan_id: LoanId,
        input: ReturnInput,
        time: &SafeTimeProvider,
    ) -> Result<ReturnOutcome> {
        let now = time.now();
        let threshold = self.ledger.config().overdue_threshold_days;
        let event_id = Uuid::new_v4();

        let (outcome, old_status) = self.ledger.with_loan_mut(loan_id, |loan| {
            Self::validate(loan, &input).map_err(|e| {
                warn!(loan_id = %loan_id, reason = %e, "return rejected");
                e
            })?;

            let old_status = loan.derive_status(now, threshold);

            loan.returns.push(ReturnEvent {
                id: event_id,
                sequence: loan.returns.len() as u32 + 1,
                return_document_id: input.return_document_id.clone(),
                received_item: input.received_item.clone(),
                returned_value: input.returned_value,
                return_date: input.return_date,
                submitted_at: now,
                physical_entry: None,
                processed_by: input.processed_by.clone(),
                notes: input.notes.clone(),
            });

            let (balance, status) = loan.derive_with(None, now, threshold);
            let outcome = ReturnOutcome {
                event_id,
                balance: LoanBalance {
                    amount: balance,
                    currency: loan.currency,
                },
                status,
            };
            Ok((outcome, old_status))
        })?;

        self.ledger.index_event(event_id, loan_id);
        self.ledger.emit(Event::ReturnSubmitted {
            loan_id,
            event_id,
            returned_value: input.returned_value,
            new_balance: outcome.balance.amount,
            new_status: outcome.status,
            timestamp: now,
        });
        if old_status != outcome.status {
            self.ledger.emit(Event::StatusChanged {
                loan_id,
                old_status,
                new_status: outcome.status,
                timestamp: now,
            });
        }

        info!(loan_id = %loan_id, event_id = %event_id, value = %input.returned_value,
            balance = %outcome.balance.amount, status = ?outcome.status, "return submitted");

        Ok(outcome)
    }

    /// same validation and arithmetic as `submit_return`, zero side
    /// effects; safe to call any number of times
    pub fn preview_return(
        &self,
        loan_id: LoanId,
        input: &ReturnInput,
        time: &SafeTimeProvider,
    ) -> Result<ReturnPreview> {
        let now = time.now();
        let threshold = self.ledger.config().overdue_threshold_days;

        self.ledger.with_loan(loan_id, |loan| {
            Self::validate(loan, input)?;
            let (balance, status) =
                loan.derive_with(Some(input.returned_value), now, threshold);
            Ok(ReturnPreview {
                projected_balance: LoanBalance {
                    amount: balance,
                    currency: loan.currency,
                },
                projected_status: status,
            })
        })?
    }

    fn validate(loan: &Loan, input: &ReturnInput) -> Result<()> {
        if input.returned_value.is_negative() {
            return Err(LoanError::NegativeReturnValue {
                amount: input.returned_value,
            });
        }
        if input.currency != loan.currency {
            return Err(LoanError::CurrencyMismatch {
                loan_currency: loan.currency,
                return_currency: input.currency,
            });
        }
        // a zero-value return against a settled loan records nothing and
        // is rejected to keep the event log meaningful; a nonzero return
        // after settlement is a surplus and goes through
        if loan.balance().is_zero() && input.returned_value.is_zero() {
            return Err(LoanError::RedundantZeroReturn {
                process_number: loan.process_number.clone(),
            });
        }
        Ok(())
    }
}
