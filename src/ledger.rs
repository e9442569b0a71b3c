use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::loan::Loan;
use crate::types::{ClientRef, Currency, ItemRef, LoanId, OriginContext, ReturnEventId};

/// detached copy of a loan, safe to hand to read-model consumers
pub type LoanSnapshot = Loan;

/// loan-creation command from the intake surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLoanInput {
    pub process_number: String,
    pub client: ClientRef,
    pub item: ItemRef,
    pub loaned_value: Money,
    pub currency: Currency,
    pub origin: OriginContext,
    pub outbound_document_id: String,
    pub loan_date: NaiveDate,
    pub shipment_date: NaiveDate,
    pub import_process_id: Option<String>,
}

/// filter for loan listings; empty filter matches everything
#[derive(Debug, Clone, Default)]
pub struct LoanFilter {
    pub client_tax_id: Option<String>,
    pub origin: Option<OriginContext>,
    pub import_process_id: Option<String>,
}

impl LoanFilter {
    fn matches(&self, loan: &Loan) -> bool {
        if let Some(tax_id) = &self.client_tax_id {
            if &loan.client.tax_id != tax_id {
                return false;
            }
        }
        if let Some(origin) = self.origin {
            if loan.origin != origin {
                return false;
            }
        }
        if let Some(import_id) = &self.import_process_id {
            if loan.import_process_id.as_ref() != Some(import_id) {
                return false;
            }
        }
        true
    }
}

/// source of truth for loan and return records.
///
/// Loans live in a concurrent arena keyed by id; every write against one
/// loan holds that loan's entry exclusively, so submissions against the
/// same loan serialize while different loans never contend. All invariant
/// enforcement happens here; no other component writes a loan directly.
#[derive(Debug)]
pub struct LoanLedger {
    config: LedgerConfig,
    loans: DashMap<LoanId, Loan>,
    by_process: DashMap<String, LoanId>,
    by_event: DashMap<ReturnEventId, LoanId>,
    sequence: AtomicU64,
    events: Mutex<EventStore>,
}

impl LoanLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            loans: DashMap::new(),
            by_process: DashMap::new(),
            by_event: DashMap::new(),
            sequence: AtomicU64::new(1),
            events: Mutex::new(EventStore::new()),
        }
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    /// validate and append a new loan record
    pub fn create_loan(
        &self,
        input: CreateLoanInput,
        time: &SafeTimeProvider,
    ) -> Result<LoanId> {
        if !input.loaned_value.is_positive() {
            warn!(process_number = %input.process_number, amount = %input.loaned_value,
                "loan rejected: non-positive value");
            return Err(LoanError::NonPositiveLoanValue {
                amount: input.loaned_value,
            });
        }
        if input.client.tax_id.trim().is_empty() {
            warn!(process_number = %input.process_number, "loan rejected: missing client tax id");
            return Err(LoanError::MissingClientIdentifier);
        }
        if input.item.reference.trim().is_empty() {
            warn!(process_number = %input.process_number, "loan rejected: missing item reference");
            return Err(LoanError::MissingItemReference);
        }

        let id = Uuid::new_v4();

        // reserve the process number before touching the arena so two
        // racing creates cannot both succeed
        match self.by_process.entry(input.process_number.clone()) {
            Entry::Occupied(_) => {
                warn!(process_number = %input.process_number, "loan rejected: duplicate process number");
                return Err(LoanError::DuplicateProcessNumber {
                    process_number: input.process_number,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let now = time.now();
        let loan = Loan {
            id,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            process_number: input.process_number,
            client: input.client,
            item: input.item,
            loaned_value: input.loaned_value,
            currency: input.currency,
            origin: input.origin,
            outbound_document_id: input.outbound_document_id,
            loan_date: input.loan_date,
            shipment_date: input.shipment_date,
            import_process_id: input.import_process_id,
            created_at: now,
            returns: Vec::new(),
        };

        let created = Event::LoanCreated {
            loan_id: id,
            process_number: loan.process_number.clone(),
            client_tax_id: loan.client.tax_id.clone(),
            loaned_value: loan.loaned_value,
            currency: loan.currency,
            origin: loan.origin,
            timestamp: now,
        };
        info!(loan_id = %id, process_number = %loan.process_number,
            value = %loan.loaned_value, currency = %loan.currency, "loan created");

        self.loans.insert(id, loan);
        self.emit(created);
        Ok(id)
    }

    /// snapshot of one loan
    pub fn get_loan(&self, id: LoanId) -> Result<LoanSnapshot> {
        self.loans
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(LoanError::LoanNotFound { id })
    }

    pub fn find_by_process_number(&self, process_number: &str) -> Option<LoanSnapshot> {
        let id = *self.by_process.get(process_number)?;
        self.loans.get(&id).map(|entry| entry.clone())
    }

    /// filtered snapshots, loan date descending, creation order for equal
    /// dates
    pub fn list_loans(&self, filter: &LoanFilter) -> Vec<LoanSnapshot> {
        let mut loans: Vec<Loan> = self
            .loans
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.clone())
            .collect();
        loans.sort_by(|a, b| {
            b.loan_date
                .cmp(&a.loan_date)
                .then(a.sequence.cmp(&b.sequence))
        });
        loans
    }

    /// read one loan under a consistent snapshot
    pub(crate) fn with_loan<T>(&self, id: LoanId, f: impl FnOnce(&Loan) -> T) -> Result<T> {
        self.loans
            .get(&id)
            .map(|entry| f(entry.value()))
            .ok_or(LoanError::LoanNotFound { id })
    }

    /// per-loan exclusive section: the entry is held mutably for the whole
    /// closure, so a concurrent submit against the same loan waits
    pub(crate) fn with_loan_mut<T>(
        &self,
        id: LoanId,
        f: impl FnOnce(&mut Loan) -> Result<T>,
    ) -> Result<T> {
        match self.loans.get_mut(&id) {
            Some(mut entry) => f(entry.value_mut()),
            None => Err(LoanError::LoanNotFound { id }),
        }
    }

    pub(crate) fn index_event(&self, event_id: ReturnEventId, loan_id: LoanId) {
        self.by_event.insert(event_id, loan_id);
    }

    pub(crate) fn loan_for_event(&self, event_id: ReturnEventId) -> Result<LoanId> {
        self.by_event
            .get(&event_id)
            .map(|entry| *entry)
            .ok_or(LoanError::ReturnEventNotFound { id: event_id })
    }

    pub(crate) fn emit(&self, event: Event) {
        // poisoning only happens if an emitting thread panicked; keep the
        // log usable either way
        match self.events.lock() {
            Ok(mut store) => store.emit(event),
            Err(poisoned) => poisoned.into_inner().emit(event),
        }
    }

    /// drain collected notification events
    pub fn take_events(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(mut store) => store.take_events(),
            Err(poisoned) => poisoned.into_inner().take_events(),
        }
    }

    /// all loans in creation order, for persistence or inspection
    pub fn export_snapshots(&self) -> Vec<LoanSnapshot> {
        let mut loans: Vec<Loan> = self.loans.iter().map(|entry| entry.clone()).collect();
        loans.sort_by_key(|loan| loan.sequence);
        loans
    }

    /// serialize the full loan set to pretty-printed json
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export_snapshots()).map_err(|e| {
            LoanError::InvalidSnapshot {
                message: e.to_string(),
            }
        })
    }

    /// rebuild a ledger, including all indexes, from exported json
    pub fn from_json(config: LedgerConfig, json: &str) -> Result<Self> {
        let loans: Vec<Loan> =
            serde_json::from_str(json).map_err(|e| LoanError::InvalidSnapshot {
                message: e.to_string(),
            })?;

        let ledger = Self::new(config);
        let mut max_sequence = 0;
        for loan in loans {
            // a snapshot must satisfy the same invariants create_loan
            // enforces; a tampered or hand-built file is rejected whole
            if !loan.loaned_value.is_positive() {
                return Err(LoanError::InvalidSnapshot {
                    message: format!(
                        "non-positive loaned value on {}",
                        loan.process_number
                    ),
                });
            }
            if loan.client.tax_id.trim().is_empty() {
                return Err(LoanError::InvalidSnapshot {
                    message: format!("missing client tax id on {}", loan.process_number),
                });
            }
            if loan.item.reference.trim().is_empty() {
                return Err(LoanError::InvalidSnapshot {
                    message: format!("missing item reference on {}", loan.process_number),
                });
            }
            if ledger.by_process.contains_key(&loan.process_number) {
                return Err(LoanError::InvalidSnapshot {
                    message: format!("duplicate process number {}", loan.process_number),
                });
            }
            max_sequence = max_sequence.max(loan.sequence);
            ledger.by_process.insert(loan.process_number.clone(), loan.id);
            for event in &loan.returns {
                ledger.by_event.insert(event.id, loan.id);
            }
            ledger.loans.insert(loan.id, loan);
        }
        ledger.sequence.store(max_sequence + 1, Ordering::SeqCst);
        Ok(ledger)
    }
}

impl Default for LoanLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        ))
    }

    fn input(process: &str, value: &str, date: NaiveDate) -> CreateLoanInput {
        CreateLoanInput {
            process_number: process.to_string(),
            client: ClientRef::new("12.345.678/0001-90", "Cliente Exemplo SA"),
            item: ItemRef::new("EQ-100", "spectrum analyzer"),
            loaned_value: Money::from_str_exact(value).unwrap(),
            currency: Currency::Usd,
            origin: OriginContext::Sales,
            outbound_document_id: "DANFE-0001".to_string(),
            loan_date: date,
            shipment_date: date,
            import_process_id: None,
        }
    }

    #[test]
    fn test_create_and_get() {
        let ledger = LoanLedger::default();
        let time = test_time();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let id = ledger.create_loan(input("EMP-001", "1000.00", date), &time).unwrap();
        let loan = ledger.get_loan(id).unwrap();
        assert_eq!(loan.process_number, "EMP-001");
        assert_eq!(loan.loaned_value, Money::from_major(1000));
        assert!(loan.returns.is_empty());

        let events = ledger.take_events();
        assert!(matches!(events[0], Event::LoanCreated { loan_id, .. } if loan_id == id));
    }

    #[test]
    fn test_rejects_non_positive_value() {
        let ledger = LoanLedger::default();
        let time = test_time();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let err = ledger
            .create_loan(input("EMP-002", "0.00", date), &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::NonPositiveLoanValue { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn test_rejects_missing_client_and_item() {
        let ledger = LoanLedger::default();
        let time = test_time();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let mut no_client = input("EMP-003", "100.00", date);
        no_client.client.tax_id = "  ".to_string();
        assert!(matches!(
            ledger.create_loan(no_client, &time),
            Err(LoanError::MissingClientIdentifier)
        ));

        let mut no_item = input("EMP-004", "100.00", date);
        no_item.item.reference = String::new();
        assert!(matches!(
            ledger.create_loan(no_item, &time),
            Err(LoanError::MissingItemReference)
        ));
    }

    #[test]
    fn test_rejects_duplicate_process_number() {
        let ledger = LoanLedger::default();
        let time = test_time();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        ledger.create_loan(input("EMP-005", "100.00", date), &time).unwrap();
        let err = ledger
            .create_loan(input("EMP-005", "200.00", date), &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::DuplicateProcessNumber { .. }));
    }

    #[test]
    fn test_get_unknown_loan() {
        let ledger = LoanLedger::default();
        let err = ledger.get_loan(Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_ordering_and_filters() {
        let ledger = LoanLedger::default();
        let time = test_time();
        let early = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let late = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        ledger.create_loan(input("EMP-A", "100.00", early), &time).unwrap();
        let mut tech = input("EMP-B", "100.00", late);
        tech.origin = OriginContext::TechnicalDepartment;
        tech.import_process_id = Some("IMP-7".to_string());
        ledger.create_loan(tech, &time).unwrap();
        // same date as EMP-A: creation order breaks the tie
        ledger.create_loan(input("EMP-C", "100.00", early), &time).unwrap();

        let all = ledger.list_loans(&LoanFilter::default());
        let numbers: Vec<&str> = all.iter().map(|l| l.process_number.as_str()).collect();
        assert_eq!(numbers, vec!["EMP-B", "EMP-A", "EMP-C"]);

        let technical = ledger.list_loans(&LoanFilter {
            origin: Some(OriginContext::TechnicalDepartment),
            ..Default::default()
        });
        assert_eq!(technical.len(), 1);
        assert_eq!(technical[0].process_number, "EMP-B");

        let by_import = ledger.list_loans(&LoanFilter {
            import_process_id: Some("IMP-7".to_string()),
            ..Default::default()
        });
        assert_eq!(by_import.len(), 1);

        let by_client = ledger.list_loans(&LoanFilter {
            client_tax_id: Some("00.000.000/0000-00".to_string()),
            ..Default::default()
        });
        assert!(by_client.is_empty());
    }

    #[test]
    fn test_json_restore_rebuilds_indexes() {
        let ledger = LoanLedger::default();
        let time = test_time();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ledger.create_loan(input("EMP-010", "500.00", date), &time).unwrap();

        let json = ledger.to_json().unwrap();
        let restored = LoanLedger::from_json(LedgerConfig::default(), &json).unwrap();

        let found = restored.find_by_process_number("EMP-010").unwrap();
        assert_eq!(found.loaned_value, Money::from_major(500));

        // sequence continues past restored loans
        let next = restored
            .create_loan(input("EMP-011", "100.00", date), &time)
            .unwrap();
        assert!(restored.get_loan(next).unwrap().sequence > found.sequence);
    }

    #[test]
    fn test_json_restore_enforces_creation_invariants() {
        let ledger = LoanLedger::default();
        let time = test_time();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ledger.create_loan(input("EMP-020", "1000.00", date), &time).unwrap();
        let json = ledger.to_json().unwrap();

        // zeroed-out loaned value
        let tampered = json.replace("1000.00", "0.00");
        let err = LoanLedger::from_json(LedgerConfig::default(), &tampered).unwrap_err();
        assert!(matches!(
            err,
            LoanError::InvalidSnapshot { ref message } if message.contains("EMP-020")
        ));

        // blanked client tax id
        let tampered = json.replace("12.345.678/0001-90", "   ");
        let err = LoanLedger::from_json(LedgerConfig::default(), &tampered).unwrap_err();
        assert!(matches!(err, LoanError::InvalidSnapshot { .. }));

        // blanked item reference
        let tampered = json.replace("EQ-100", "");
        let err = LoanLedger::from_json(LedgerConfig::default(), &tampered).unwrap_err();
        assert!(matches!(err, LoanError::InvalidSnapshot { .. }));

        // the untampered snapshot still restores
        assert!(LoanLedger::from_json(LedgerConfig::default(), &json).is_ok());
    }
}
