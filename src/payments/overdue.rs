use chrono::{DateTime, NaiveTime, Utc};

use crate::account::CreditAccount;
use crate::decimal::Money;
use crate::installment::Installment;
use crate::transaction::Transaction;
use crate::types::{CreditType, TransactionType};

/// amount past due on an account as of `now`, never more than the balance
///
/// long-term: unpaid part of installments due before today.
/// short-term: once this month's due date has passed, what was owed when the
/// due date began minus net payments made since, floored at zero.
pub fn overdue_balance<'a>(
    account: &CreditAccount,
    transactions: impl IntoIterator<Item = &'a Transaction>,
    installments: &[Installment],
    now: DateTime<Utc>,
) -> Money {
    past_due(account, transactions, installments, now).min(account.balance.max(Money::ZERO))
}

fn past_due<'a>(
    account: &CreditAccount,
    transactions: impl IntoIterator<Item = &'a Transaction>,
    installments: &[Installment],
    now: DateTime<Utc>,
) -> Money {
    let today = now.date_naive();

    match account.credit_type {
        CreditType::LongTerm => installments
            .iter()
            .filter(|i| i.is_past_due(today))
            .map(|i| i.unpaid())
            .sum(),
        CreditType::ShortTerm => {
            let due = account.due_date_in_month(today);
            if today <= due {
                return Money::ZERO;
            }
            let due_start = due.and_time(NaiveTime::MIN).and_utc();

            let mut owed_at_due = Money::ZERO;
            let mut credited_since = Money::ZERO;
            for tx in transactions {
                if tx.timestamp < due_start {
                    owed_at_due += tx.signed_amount();
                } else if tx.timestamp <= now {
                    match tx.kind {
                        TransactionType::Payment => credited_since += tx.amount,
                        // failed payment no longer counts
                        TransactionType::Reversal => credited_since -= tx.amount,
                        _ => {}
                    }
                }
            }

            (owed_at_due - credited_since).max(Money::ZERO)
        }
    }
}
