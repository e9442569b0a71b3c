use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{Currency, LoanId, LoanStatus, OriginContext, ReturnEventId};

/// notifications emitted towards collaborating subsystems. The loan's own
/// return list stays the authoritative history; these are one-way signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    LoanCreated {
        loan_id: LoanId,
        process_number: String,
        client_tax_id: String,
        loaned_value: Money,
        currency: Currency,
        origin: OriginContext,
        timestamp: DateTime<Utc>,
    },
    ReturnSubmitted {
        loan_id: LoanId,
        event_id: ReturnEventId,
        returned_value: Money,
        new_balance: Money,
        new_status: LoanStatus,
        timestamp: DateTime<Utc>,
    },
    PhysicalEntryConfirmed {
        loan_id: LoanId,
        event_id: ReturnEventId,
        entry_date: NaiveDate,
        confirmed_by: String,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
