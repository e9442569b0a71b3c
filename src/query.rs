use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::Result;
use crate::ledger::{LoanFilter, LoanLedger, LoanSnapshot};
use crate::loan::Loan;
use crate::types::{LoanBalance, LoanId, LoanStatus};

/// one loan with its derived balance and status, ready for display or for
/// the billing subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub loan: LoanSnapshot,
    pub balance: LoanBalance,
    pub status: LoanStatus,
    pub return_count: usize,
}

/// read-only projections over the ledger. Every view derives balance and
/// status on read, so nothing here can drift from the event history.
/// Reads run concurrently with writes to other loans.
pub struct QueryService {
    ledger: Arc<LoanLedger>,
}

impl QueryService {
    pub fn new(ledger: Arc<LoanLedger>) -> Self {
        Self { ledger }
    }

    fn summarize(&self, loan: Loan, time: &SafeTimeProvider) -> LoanSummary {
        let threshold = self.ledger.config().overdue_threshold_days;
        let status = loan.derive_status(time.now(), threshold);
        LoanSummary {
            balance: LoanBalance {
                amount: loan.balance(),
                currency: loan.currency,
            },
            status,
            return_count: loan.returns.len(),
            loan,
        }
    }

    /// projection for a single loan
    pub fn loan(&self, id: LoanId, time: &SafeTimeProvider) -> Result<LoanSummary> {
        Ok(self.summarize(self.ledger.get_loan(id)?, time))
    }

    /// projection by human-referenced process number
    pub fn by_process_number(
        &self,
        process_number: &str,
        time: &SafeTimeProvider,
    ) -> Option<LoanSummary> {
        self.ledger
            .find_by_process_number(process_number)
            .map(|loan| self.summarize(loan, time))
    }

    /// all loans for one client, newest first
    pub fn by_client(&self, tax_id: &str, time: &SafeTimeProvider) -> Vec<LoanSummary> {
        self.ledger
            .list_loans(&LoanFilter {
                client_tax_id: Some(tax_id.to_string()),
                ..Default::default()
            })
            .into_iter()
            .map(|loan| self.summarize(loan, time))
            .collect()
    }

    /// loans for one client still carrying something outstanding; settled
    /// and surplus loans drop out of this billing view
    pub fn outstanding_by_client(&self, tax_id: &str, time: &SafeTimeProvider) -> Vec<LoanSummary> {
        self.by_client(tax_id, time)
            .into_iter()
            .filter(|summary| !summary.status.is_closed())
            .collect()
    }

    /// all loans linked to one originating import process
    pub fn by_import_process(
        &self,
        import_process_id: &str,
        time: &SafeTimeProvider,
    ) -> Vec<LoanSummary> {
        self.ledger
            .list_loans(&LoanFilter {
                import_process_id: Some(import_process_id.to_string()),
                ..Default::default()
            })
            .into_iter()
            .map(|loan| self.summarize(loan, time))
            .collect()
    }

    /// loans whose latest return is documented but not yet in stock; the
    /// billing subsystem blocks certain fiscal actions while this view is
    /// non-empty for a client
    pub fn pending_physical_entry(&self, time: &SafeTimeProvider) -> Vec<LoanSummary> {
        self.ledger
            .list_loans(&LoanFilter::default())
            .into_iter()
            .map(|loan| self.summarize(loan, time))
            .filter(|summary| summary.status == LoanStatus::AwaitingPhysicalEntry)
            .collect()
    }

    /// true once the loan balance has reached exactly zero
    pub fn is_settled(&self, id: LoanId, time: &SafeTimeProvider) -> Result<bool> {
        Ok(self.loan(id, time)?.status == LoanStatus::Settled)
    }
}
