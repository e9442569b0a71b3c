/// surplus handling and json snapshot export/restore
use chrono::{NaiveDate, TimeZone, Utc};
use equipment_loan_rs::{
    ClientRef, CreateLoanInput, Currency, ItemRef, LoanLedger, LedgerConfig, Money,
    OriginContext, QueryService, ReturnInput, ReturnProcessor, SafeTimeProvider, TimeSource,
};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    ));

    let ledger = Arc::new(LoanLedger::new(LedgerConfig::commercial()));
    let processor = ReturnProcessor::new(Arc::clone(&ledger));

    let loan_id = ledger.create_loan(
        CreateLoanInput {
            process_number: "EMP-2024-003".to_string(),
            client: ClientRef::new("12.345.678/0001-90", "Cliente Exemplo SA"),
            item: ItemRef::new("EQ-300", "power meter"),
            loaned_value: Money::from_str_exact("500.00")?,
            currency: Currency::Brl,
            origin: OriginContext::Sales,
            outbound_document_id: "DANFE-0003".to_string(),
            loan_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            shipment_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            import_process_id: Some("IMP-2023-042".to_string()),
        },
        &time,
    )?;

    // client sends back an upgraded unit worth more than the loan
    let outcome = processor.submit_return(
        loan_id,
        ReturnInput {
            return_document_id: Some("DANFE-R010".to_string()),
            received_item: ItemRef::new("EQ-301", "power meter, upgraded model"),
            returned_value: Money::from_str_exact("650.00")?,
            currency: Currency::Brl,
            return_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            processed_by: "operator".to_string(),
            notes: Some("replacement unit, newer model".to_string()),
        },
        &time,
    )?;
    println!("balance {} -> {:?}", outcome.balance, outcome.status);

    // export the full loan set and rebuild a ledger from it
    let json = ledger.to_json()?;
    println!("snapshot:\n{json}");

    let restored = LoanLedger::from_json(LedgerConfig::commercial(), &json)?;
    let restored = Arc::new(restored);
    let query = QueryService::new(Arc::clone(&restored));

    let summary = query.by_import_process("IMP-2023-042", &time);
    println!(
        "restored: {} loan(s) for IMP-2023-042, status {:?}",
        summary.len(),
        summary[0].status
    );

    Ok(())
}
