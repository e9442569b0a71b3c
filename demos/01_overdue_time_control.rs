/// overdue detection - deterministic testing with controlled time
use chrono::{Duration, TimeZone, Utc};
use equipment_loan_rs::{
    ClientRef, CreateLoanInput, Currency, ItemRef, LoanLedger, LedgerConfig, Money,
    OriginContext, OverdueMonitor, QueryService, SafeTimeProvider, TimeSource,
};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // create controlled time for testing
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let ledger = Arc::new(LoanLedger::new(LedgerConfig::commercial()));
    let query = QueryService::new(Arc::clone(&ledger));
    let monitor = OverdueMonitor::new(Arc::clone(&ledger));

    let loan_id = ledger.create_loan(
        CreateLoanInput {
            process_number: "EMP-2024-002".to_string(),
            client: ClientRef::new("12.345.678/0001-90", "Cliente Exemplo SA"),
            item: ItemRef::new("EQ-200", "signal generator"),
            loaned_value: Money::from_str_exact("1000.00")?,
            currency: Currency::Usd,
            origin: OriginContext::TechnicalDepartment,
            outbound_document_id: "DANFE-0002".to_string(),
            loan_date: time.now().date_naive(),
            shipment_date: time.now().date_naive(),
            import_process_id: None,
        },
        &time,
    )?;

    println!("loan date: {}", time.now().format("%Y-%m-%d"));

    // one day before the threshold: still loaned
    controller.advance(Duration::days(59));
    let summary = query.loan(loan_id, &time)?;
    println!("day 59: {:?}", summary.status);

    // at the threshold: overdue
    controller.advance(Duration::days(1));
    let summary = query.loan(loan_id, &time)?;
    println!("day 60: {:?}, balance {}", summary.status, summary.balance);

    // the sweep sees it too
    let overdue = monitor.sweep(&time);
    println!("overdue loans: {}", overdue.len());

    Ok(())
}
