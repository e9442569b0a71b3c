use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;

use crate::ledger::LoanLedger;
use crate::loan::Loan;
use crate::types::LoanId;

/// true iff the loan has no returns and the elapsed whole days since the
/// loan date have reached the threshold. Pure function of its inputs;
/// there are no stored timers.
pub fn is_overdue(loan: &Loan, now: DateTime<Utc>, threshold_days: u32) -> bool {
    if !loan.returns.is_empty() {
        return false;
    }
    let elapsed = (now.date_naive() - loan.loan_date).num_days();
    elapsed >= threshold_days as i64
}

/// read-only sweep over the ledger for alerting surfaces. Correctness
/// never depends on it running; status is recomputed on every read.
pub struct OverdueMonitor {
    ledger: Arc<LoanLedger>,
}

impl OverdueMonitor {
    pub fn new(ledger: Arc<LoanLedger>) -> Self {
        Self { ledger }
    }

    /// ids of loans currently overdue, ordered like `list_loans`
    pub fn sweep(&self, time: &SafeTimeProvider) -> Vec<LoanId> {
        let now = time.now();
        let threshold = self.ledger.config().overdue_threshold_days;
        self.ledger
            .list_loans(&Default::default())
            .into_iter()
            .filter(|loan| is_overdue(loan, now, threshold))
            .map(|loan| loan.id)
            .collect()
    }
}
