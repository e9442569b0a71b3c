pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod overdue;
pub mod query;
pub mod receipt;
pub mod returns;
pub mod types;

// re-export key types
pub use config::LedgerConfig;
pub use decimal::Money;
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use ledger::{CreateLoanInput, LoanFilter, LoanLedger, LoanSnapshot};
pub use loan::{Loan, PhysicalEntry, ReturnEvent};
pub use overdue::{is_overdue, OverdueMonitor};
pub use query::{LoanSummary, QueryService};
pub use receipt::PhysicalReceiptTracker;
pub use returns::{ReturnInput, ReturnOutcome, ReturnPreview, ReturnProcessor};
pub use types::{
    ClientRef, Currency, ItemRef, LoanBalance, LoanId, LoanStatus, OriginContext, ReturnEventId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
