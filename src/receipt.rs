use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::ledger::LoanLedger;
use crate::loan::PhysicalEntry;
use crate::types::ReturnEventId;

/// separates "return documented" from "return physically received into
/// stock". Flips the per-event received flag exactly once; it never
/// recomputes balance, the status derivation reads the flag instead.
pub struct PhysicalReceiptTracker {
    ledger: Arc<LoanLedger>,
}

impl PhysicalReceiptTracker {
    pub fn new(ledger: Arc<LoanLedger>) -> Self {
        Self { ledger }
    }

    /// confirm goods are physically back in stock. A second confirmation
    /// for the same event is rejected explicitly so the caller can detect
    /// the upstream logic error; the stored state is unchanged either way.
    pub fn confirm_physical_entry(
        &self,
        event_id: ReturnEventId,
        entry_date: NaiveDate,
        confirming_user: &str,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let loan_id = self.ledger.loan_for_event(event_id)?;
        let now = time.now();

        self.ledger.with_loan_mut(loan_id, |loan| {
            let event = loan
                .find_return_mut(event_id)
                .ok_or(LoanError::ReturnEventNotFound { id: event_id })?;

            if let Some(existing) = &event.physical_entry {
                warn!(event_id = %event_id, confirmed_at = %existing.confirmed_at,
                    "duplicate physical entry confirmation");
                return Err(LoanError::PhysicalEntryAlreadyConfirmed {
                    id: event_id,
                    confirmed_at: existing.confirmed_at,
                });
            }

            // goods can physically arrive before the paper acknowledgment
            if !event.is_documented() {
                info!(event_id = %event_id, "physical entry confirmed before return document recorded");
            }

            event.physical_entry = Some(PhysicalEntry {
                entry_date,
                confirmed_by: confirming_user.to_string(),
                confirmed_at: now,
            });
            Ok(())
        })?;

        self.ledger.emit(Event::PhysicalEntryConfirmed {
            loan_id,
            event_id,
            entry_date,
            confirmed_by: confirming_user.to_string(),
            timestamp: now,
        });

        info!(loan_id = %loan_id, event_id = %event_id, %entry_date, "physical entry confirmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::decimal::Money;
    use crate::ledger::CreateLoanInput;
    use crate::returns::{ReturnInput, ReturnProcessor};
    use crate::types::{ClientRef, Currency, ItemRef, LoanId, LoanStatus, OriginContext};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn setup() -> (Arc<LoanLedger>, ReturnProcessor, PhysicalReceiptTracker, LoanId, SafeTimeProvider) {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        ));
        let ledger = Arc::new(LoanLedger::new(LedgerConfig::default()));
        let loan_id = ledger
            .create_loan(
                CreateLoanInput {
                    process_number: "EMP-200".to_string(),
                    client: ClientRef::new("12.345.678/0001-90", "Cliente Exemplo SA"),
                    item: ItemRef::new("EQ-100", "spectrum analyzer"),
                    loaned_value: Money::from_str_exact("1000.00").unwrap(),
                    currency: Currency::Usd,
                    origin: OriginContext::Sales,
                    outbound_document_id: "DANFE-0001".to_string(),
                    loan_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    shipment_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    import_process_id: None,
                },
                &time,
            )
            .unwrap();
        let processor = ReturnProcessor::new(Arc::clone(&ledger));
        let tracker = PhysicalReceiptTracker::new(Arc::clone(&ledger));
        (ledger, processor, tracker, loan_id, time)
    }

    fn partial_return(processor: &ReturnProcessor, loan_id: LoanId, time: &SafeTimeProvider, value: &str) -> ReturnEventId {
        processor
            .submit_return(
                loan_id,
                ReturnInput {
                    return_document_id: Some("DANFE-R001".to_string()),
                    received_item: ItemRef::new("EQ-100", "spectrum analyzer"),
                    returned_value: Money::from_str_exact(value).unwrap(),
                    currency: Currency::Usd,
                    return_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                    processed_by: "operator".to_string(),
                    notes: None,
                },
                time,
            )
            .unwrap()
            .event_id
    }

    #[test]
    fn test_confirmation_moves_status_not_balance() {
        let (ledger, processor, tracker, loan_id, time) = setup();
        let event_id = partial_return(&processor, loan_id, &time, "400.00");

        let entry_date = chrono::NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        tracker
            .confirm_physical_entry(event_id, entry_date, "warehouse", &time)
            .unwrap();

        let loan = ledger.get_loan(loan_id).unwrap();
        assert_eq!(
            loan.derive_status(time.now(), 60),
            LoanStatus::PartialReturnDocumented
        );
        // balance untouched by the confirmation
        assert_eq!(loan.balance(), Money::from_str_exact("600.00").unwrap());
        assert_eq!(
            loan.find_return(event_id).unwrap().physical_entry.as_ref().unwrap().entry_date,
            entry_date
        );
    }

    #[test]
    fn test_second_confirmation_rejected_state_unchanged() {
        let (ledger, processor, tracker, loan_id, time) = setup();
        let event_id = partial_return(&processor, loan_id, &time, "400.00");

        let entry_date = chrono::NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        tracker
            .confirm_physical_entry(event_id, entry_date, "warehouse", &time)
            .unwrap();

        let later = chrono::NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let err = tracker
            .confirm_physical_entry(event_id, later, "warehouse-2", &time)
            .unwrap_err();
        assert!(matches!(
            err,
            LoanError::PhysicalEntryAlreadyConfirmed { id, .. } if id == event_id
        ));

        // first confirmation still stands
        let loan = ledger.get_loan(loan_id).unwrap();
        let entry = loan.find_return(event_id).unwrap().physical_entry.as_ref().unwrap();
        assert_eq!(entry.entry_date, entry_date);
        assert_eq!(entry.confirmed_by, "warehouse");
    }

    #[test]
    fn test_confirm_undocumented_return() {
        let (ledger, processor, tracker, loan_id, time) = setup();

        // no acknowledgment document yet; the goods arrive first
        let event_id = processor
            .submit_return(
                loan_id,
                ReturnInput {
                    return_document_id: None,
                    received_item: ItemRef::new("EQ-100", "spectrum analyzer"),
                    returned_value: Money::from_str_exact("400.00").unwrap(),
                    currency: Currency::Usd,
                    return_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                    processed_by: "operator".to_string(),
                    notes: None,
                },
                &time,
            )
            .unwrap()
            .event_id;

        tracker
            .confirm_physical_entry(
                event_id,
                chrono::NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
                "warehouse",
                &time,
            )
            .unwrap();

        let loan = ledger.get_loan(loan_id).unwrap();
        let event = loan.find_return(event_id).unwrap();
        assert!(!event.is_documented());
        assert!(event.is_physically_received());
    }

    #[test]
    fn test_unknown_event_rejected() {
        let (_ledger, _processor, tracker, _loan_id, time) = setup();
        let err = tracker
            .confirm_physical_entry(
                Uuid::new_v4(),
                chrono::NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
                "warehouse",
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, LoanError::ReturnEventNotFound { .. }));
    }

    #[test]
    fn test_full_settlement_flow() {
        let (ledger, processor, tracker, loan_id, time) = setup();

        let first = partial_return(&processor, loan_id, &time, "400.00");
        tracker
            .confirm_physical_entry(
                first,
                chrono::NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
                "warehouse",
                &time,
            )
            .unwrap();

        let second = partial_return(&processor, loan_id, &time, "600.00");
        tracker
            .confirm_physical_entry(
                second,
                chrono::NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
                "warehouse",
                &time,
            )
            .unwrap();

        let loan = ledger.get_loan(loan_id).unwrap();
        assert!(loan.balance().is_zero());
        assert_eq!(loan.derive_status(time.now(), 60), LoanStatus::Settled);
    }
}
