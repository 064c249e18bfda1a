use chrono::{Duration, TimeZone, Utc};
use credit_ledger::{
    AccountTerms, FixedCode, InMemoryRepository, Ledger, Money, PaymentMethod, Rate, SafeTimeProvider,
    TimeSource, Uuid,
};

fn main() -> credit_ledger::Result<()> {
    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()));
    let control = time.test_control().unwrap();
    let ledger = Ledger::new(InMemoryRepository::new(), FixedCode("482913".to_string()));

    // revolving line: 2,000 limit, due on the 15th, 24% nominal
    let revolving = ledger.open_account(
        AccountTerms::revolving(Uuid::new_v4(), Uuid::new_v4(), Money::from_major(2_000), 15, Rate::from_percentage(24)),
        &time,
    )?;
    ledger.post_purchase(revolving.id, Money::from_major(800), "groceries", &time)?;
    println!("next due date: {}", ledger.next_due_date(revolving.id, &time)?);

    let payment = ledger.post_payment(revolving.id, Money::from_major(300), "wallet", PaymentMethod::Yape, &time)?;
    println!("payment {} pending with code {:?}", payment.id, payment.payment_code);
    ledger.confirm_payment(payment.id, "482913", &time)?;

    control.advance(Duration::days(31));
    let interest = ledger.accrue_interest(revolving.id, &time)?;
    println!("interest after one month: {}", interest);

    // installment line: 12 monthly dues
    let installment = ledger.open_account(
        AccountTerms::installment(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(5_000),
            10,
            Rate::from_percentage(12),
            0,
        ),
        &time,
    )?;
    let posted = ledger.post_purchase(installment.id, Money::from_major(1_200), "laptop", &time)?;
    for due in &posted.installments {
        println!("  #{:>2} {} {}", due.sequence, due.due_date, due.amount);
    }

    let summary = ledger.summary(revolving.id, &time)?;
    println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
    Ok(())
}
