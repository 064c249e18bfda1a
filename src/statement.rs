use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::interest::{AccrualEngine, InterestCalculator};
use crate::payments::{overdue_balance, DueDateResolver};
use crate::store::LedgerRepository;
use crate::transaction::{net_balance, Transaction};
use crate::types::{AccountId, ClientId, CreditType, EstablishmentId, TransactionType};

/// client-facing snapshot of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub balance: Money,
    pub credit_limit: Money,
    pub available_credit: Money,
    pub due_date: NaiveDate,
    /// interest each purchase would carry from its posting to the due date
    pub projected_interest_to_due_date: Money,
    pub overdue_balance: Money,
    /// entries posted on or before the due date
    pub transactions: Vec<Transaction>,
}

/// entries of a period with opening and closing balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatement {
    pub account_id: AccountId,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub starting_balance: Money,
    pub transactions: Vec<Transaction>,
    pub ending_balance: Money,
}

/// per-account line of an establishment's debt report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSummaryItem {
    pub account_id: AccountId,
    pub client_id: ClientId,
    pub credit_type: CreditType,
    pub annual_rate: Rate,
    /// installments scheduled on the account, zero for revolving credit
    pub number_of_dues: u32,
    pub balance: Money,
    pub due_date: NaiveDate,
}

/// read-only views over a repository
pub struct StatementBuilder<'a, R: LedgerRepository> {
    repo: &'a R,
    accrual: &'a AccrualEngine,
    resolver: DueDateResolver,
}

impl<'a, R: LedgerRepository> StatementBuilder<'a, R> {
    pub fn new(repo: &'a R, accrual: &'a AccrualEngine) -> Self {
        Self {
            repo,
            accrual,
            resolver: DueDateResolver::new(),
        }
    }

    pub fn summary(&self, account_id: AccountId, now: DateTime<Utc>) -> Result<AccountSummary> {
        let account = self.repo.account(account_id)?;
        let installments = self.repo.installments(account_id)?;
        let all = self.repo.transactions(account_id, None, None)?;
        let today = now.date_naive();

        let due_date = self.resolver.next_due_date(&account, &installments, today);
        let overdue = overdue_balance(&account, &all, &installments, now);

        let transactions: Vec<Transaction> = all
            .into_iter()
            .filter(|tx| tx.timestamp.date_naive() <= due_date)
            .collect();

        let mut projected = Money::ZERO;
        for purchase in transactions.iter().filter(|tx| tx.kind == TransactionType::Purchase) {
            let calc = self.accrual.interest_between(
                purchase.amount,
                account.annual_rate,
                account.interest_type,
                purchase.timestamp.date_naive(),
                due_date,
            )?;
            projected += calc.interest_amount;
        }

        Ok(AccountSummary {
            account_id,
            balance: account.balance,
            credit_limit: account.credit_limit,
            available_credit: account.available_credit(),
            due_date,
            projected_interest_to_due_date: projected.round_currency(),
            overdue_balance: overdue,
            transactions,
        })
    }

    pub fn statement(
        &self,
        account_id: AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<AccountStatement> {
        if let (Some(start), Some(end)) = (from, to) {
            if start > end {
                return Err(LedgerError::validation("statement range starts after it ends"));
            }
        }
        // surfaces AccountNotFound
        self.repo.account(account_id)?;

        let starting_balance = match from {
            Some(start) => {
                let before = self.repo.transactions(account_id, None, Some(start))?;
                net_balance(before.iter().filter(|tx| tx.timestamp < start))
            }
            None => Money::ZERO,
        };

        let transactions = self.repo.transactions(account_id, from, to)?;
        let ending_balance = starting_balance + net_balance(&transactions);

        Ok(AccountStatement {
            account_id,
            from,
            to,
            starting_balance,
            transactions,
            ending_balance,
        })
    }

    pub fn debt_summary(&self, establishment_id: EstablishmentId, now: DateTime<Utc>) -> Result<Vec<DebtSummaryItem>> {
        let today = now.date_naive();
        let mut items = Vec::new();

        for account in self
            .repo
            .accounts_for_establishment(establishment_id)?
            .into_iter()
            .filter(|a| a.is_active())
        {
            let installments = self.repo.installments(account.id)?;
            let number_of_dues = match account.credit_type {
                CreditType::ShortTerm => 0,
                CreditType::LongTerm => installments.len() as u32,
            };

            items.push(DebtSummaryItem {
                account_id: account.id,
                client_id: account.client_id,
                credit_type: account.credit_type,
                annual_rate: account.annual_rate,
                number_of_dues,
                balance: account.balance,
                due_date: self.resolver.next_due_date(&account, &installments, today),
            });
        }

        Ok(items)
    }
}
