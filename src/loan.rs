use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::overdue;
use crate::types::{ClientRef, Currency, ItemRef, LoanId, LoanStatus, OriginContext, ReturnEventId};

/// physical stock re-entry confirmation, set exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalEntry {
    pub entry_date: NaiveDate,
    pub confirmed_by: String,
    pub confirmed_at: DateTime<Utc>,
}

/// one return submission against a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnEvent {
    pub id: ReturnEventId,
    /// insertion order within the loan, tie-break for equal timestamps
    pub sequence: u32,
    /// DANFE or equivalent acknowledgment document id
    pub return_document_id: Option<String>,
    /// may differ from the loaned item (replacement or upgraded unit)
    pub received_item: ItemRef,
    pub returned_value: Money,
    /// paper date on the return document
    pub return_date: NaiveDate,
    pub submitted_at: DateTime<Utc>,
    pub physical_entry: Option<PhysicalEntry>,
    pub processed_by: String,
    pub notes: Option<String>,
}

impl ReturnEvent {
    /// a return is documented once it carries an acknowledgment document
    pub fn is_documented(&self) -> bool {
        self.return_document_id.is_some()
    }

    pub fn is_physically_received(&self) -> bool {
        self.physical_entry.is_some()
    }
}

/// one unit of equipment lent out against a shipment document.
///
/// A loan owns its return events; balance and status are never stored,
/// always recomputed from the full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    /// creation order across the ledger, stable list tie-break
    pub sequence: u64,
    /// human-referenced process number, unique across the ledger
    pub process_number: String,
    pub client: ClientRef,
    pub item: ItemRef,
    /// fixed at creation, never mutated
    pub loaned_value: Money,
    /// immutable once set
    pub currency: Currency,
    pub origin: OriginContext,
    pub outbound_document_id: String,
    pub loan_date: NaiveDate,
    pub shipment_date: NaiveDate,
    pub import_process_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub returns: Vec<ReturnEvent>,
}

impl Loan {
    /// sum of all returned values, monotonically non-decreasing
    pub fn total_returned(&self) -> Money {
        self.returns.iter().map(|r| r.returned_value).sum()
    }

    /// loaned value minus everything returned; negative means surplus
    pub fn balance(&self) -> Money {
        self.loaned_value - self.total_returned()
    }

    /// most recent return: latest submission timestamp, ties broken by
    /// higher sequence number
    pub fn latest_return(&self) -> Option<&ReturnEvent> {
        self.returns
            .iter()
            .max_by_key(|r| (r.submitted_at, r.sequence))
    }

    pub fn find_return(&self, event_id: ReturnEventId) -> Option<&ReturnEvent> {
        self.returns.iter().find(|r| r.id == event_id)
    }

    pub fn find_return_mut(&mut self, event_id: ReturnEventId) -> Option<&mut ReturnEvent> {
        self.returns.iter_mut().find(|r| r.id == event_id)
    }

    /// derive the current status from the event history and current time
    pub fn derive_status(&self, now: DateTime<Utc>, threshold_days: u32) -> LoanStatus {
        self.derive_with(None, now, threshold_days).1
    }

    /// derive balance and status, optionally including one hypothetical
    /// return that has not been appended yet. Shared by submit and preview
    /// so the arithmetic has a single source of truth.
    pub(crate) fn derive_with(
        &self,
        hypothetical: Option<Money>,
        now: DateTime<Utc>,
        threshold_days: u32,
    ) -> (Money, LoanStatus) {
        let total = self.total_returned() + hypothetical.unwrap_or(Money::ZERO);
        let balance = self.loaned_value - total;

        let status = if balance.is_negative() {
            LoanStatus::Surplus
        } else if balance.is_zero() {
            LoanStatus::Settled
        } else if total.is_zero() {
            if overdue::is_overdue(self, now, threshold_days) {
                LoanStatus::Overdue
            } else {
                LoanStatus::Loaned
            }
        } else {
            // partial: the hypothetical event, when present, is the most
            // recent one and has no physical entry yet
            let latest_unreceived = match hypothetical {
                Some(_) => true,
                None => self
                    .latest_return()
                    .map(|r| !r.is_physically_received())
                    .unwrap_or(false),
            };
            if latest_unreceived {
                LoanStatus::AwaitingPhysicalEntry
            } else {
                LoanStatus::PartialReturnDocumented
            }
        };

        (balance, status)
    }
}
