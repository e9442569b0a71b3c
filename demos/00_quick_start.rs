/// quick start - loan, partial return, physical receipt, settlement
use chrono::{NaiveDate, TimeZone, Utc};
use equipment_loan_rs::{
    ClientRef, CreateLoanInput, Currency, ItemRef, LoanLedger, LedgerConfig, Money,
    OriginContext, PhysicalReceiptTracker, QueryService, ReturnInput, ReturnProcessor,
    SafeTimeProvider, TimeSource,
};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    ));

    let ledger = Arc::new(LoanLedger::new(LedgerConfig::commercial()));
    let processor = ReturnProcessor::new(Arc::clone(&ledger));
    let tracker = PhysicalReceiptTracker::new(Arc::clone(&ledger));
    let query = QueryService::new(Arc::clone(&ledger));

    // lend a USD 1,000.00 analyzer against an outbound shipment
    let loan_id = ledger.create_loan(
        CreateLoanInput {
            process_number: "EMP-2024-001".to_string(),
            client: ClientRef::new("12.345.678/0001-90", "Cliente Exemplo SA"),
            item: ItemRef::new("EQ-100", "spectrum analyzer"),
            loaned_value: Money::from_str_exact("1000.00")?,
            currency: Currency::Usd,
            origin: OriginContext::Sales,
            outbound_document_id: "DANFE-0001".to_string(),
            loan_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            shipment_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            import_process_id: None,
        },
        &time,
    )?;
    println!("loan created: {loan_id}");

    // preview before committing, then submit a partial return
    let input = ReturnInput {
        return_document_id: Some("DANFE-R001".to_string()),
        received_item: ItemRef::new("EQ-100", "spectrum analyzer"),
        returned_value: Money::from_str_exact("400.00")?,
        currency: Currency::Usd,
        return_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        processed_by: "operator".to_string(),
        notes: None,
    };
    let preview = processor.preview_return(loan_id, &input, &time)?;
    println!(
        "projected: {} -> {:?}",
        preview.projected_balance, preview.projected_status
    );

    let outcome = processor.submit_return(loan_id, input, &time)?;
    println!("after submit: {} -> {:?}", outcome.balance, outcome.status);

    // warehouse confirms the goods are physically back in stock
    tracker.confirm_physical_entry(
        outcome.event_id,
        NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
        "warehouse",
        &time,
    )?;

    // second return settles the loan
    let settle = processor.submit_return(
        loan_id,
        ReturnInput {
            return_document_id: Some("DANFE-R002".to_string()),
            received_item: ItemRef::new("EQ-100", "spectrum analyzer"),
            returned_value: Money::from_str_exact("600.00")?,
            currency: Currency::Usd,
            return_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            processed_by: "operator".to_string(),
            notes: None,
        },
        &time,
    )?;
    println!("after settle: {} -> {:?}", settle.balance, settle.status);

    println!("settled: {}", query.is_settled(loan_id, &time)?);

    Ok(())
}
