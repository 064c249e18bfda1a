use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::account::CreditAccount;
use crate::codes::PaymentCodeGenerator;
use crate::config::{AccountTerms, LedgerConfig, TermsUpdate};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::installment::Installment;
use crate::interest::{AccrualEngine, LateFeeEngine, LateFeeRule};
use crate::payments::{
    overdue_balance, validate_amount, DueDateResolver, InstallmentAllocator, InstallmentPlan,
    InstallmentScheduler, PaymentRequest,
};
use crate::statement::{AccountStatement, AccountSummary, DebtSummaryItem, StatementBuilder};
use crate::store::{LedgerRepository, UnitOfWork};
use crate::transaction::Transaction;
use crate::types::{
    AccountId, AccountStatus, ClientId, CreditType, EstablishmentId, InstallmentId, InstallmentStatus,
    PaymentMethod, PaymentStatus, TransactionId, TransactionType,
};

/// purchase entry together with the installments it was split into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedPurchase {
    pub transaction: Transaction,
    /// empty for revolving accounts
    pub installments: Vec<Installment>,
}

enum Confirmation {
    Confirmed(Transaction),
    Failed,
}

/// credit ledger over a repository
pub struct Ledger<R: LedgerRepository> {
    repo: R,
    config: LedgerConfig,
    codes: Box<dyn PaymentCodeGenerator>,
    accrual: AccrualEngine,
    late_fees: LateFeeEngine,
    scheduler: InstallmentScheduler,
    due_dates: DueDateResolver,
    allocator: InstallmentAllocator,
}

impl<R: LedgerRepository> Ledger<R> {
    /// ledger with default configuration
    ///
    /// `codes` supplies payment confirmation codes, e.g. `SeededCodes::new(seed)`
    pub fn new(repo: R, codes: impl PaymentCodeGenerator + 'static) -> Self {
        Self::build(repo, LedgerConfig::default(), Box::new(codes))
    }

    pub fn with_config(repo: R, config: LedgerConfig, codes: impl PaymentCodeGenerator + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(repo, config, Box::new(codes)))
    }

    fn build(repo: R, config: LedgerConfig, codes: Box<dyn PaymentCodeGenerator>) -> Self {
        Self {
            accrual: AccrualEngine::from_config(&config),
            scheduler: InstallmentScheduler::from_config(&config),
            late_fees: LateFeeEngine::new(),
            due_dates: DueDateResolver::new(),
            allocator: InstallmentAllocator::new(),
            codes,
            repo,
            config,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &InstallmentScheduler {
        &self.scheduler
    }

    // account lifecycle

    #[instrument(skip(self, terms, time_provider), fields(client_id = %terms.client_id, establishment_id = %terms.establishment_id))]
    pub fn open_account(&self, terms: AccountTerms, time_provider: &SafeTimeProvider) -> Result<CreditAccount> {
        terms.validate()?;
        let now = time_provider.now();
        let account = CreditAccount::open(terms, now);

        let opened = Event::AccountOpened {
            account_id: account.id,
            client_id: account.client_id,
            establishment_id: account.establishment_id,
            credit_limit: account.credit_limit,
            timestamp: now,
        };
        self.repo.insert_account(account.clone(), vec![opened])?;

        info!(account_id = %account.id, credit_limit = %account.credit_limit, "credit account opened");
        Ok(account)
    }

    #[instrument(skip(self, update, time_provider), fields(account_id = %account_id))]
    pub fn update_terms(
        &self,
        account_id: AccountId,
        update: TermsUpdate,
        time_provider: &SafeTimeProvider,
    ) -> Result<CreditAccount> {
        update.validate()?;
        let now = time_provider.now();

        self.repo.atomically(account_id, |unit| {
            let account = unit.account();
            if !account.is_active() {
                return Err(LedgerError::AccountClosed { id: account_id });
            }
            if let Some(limit) = update.credit_limit {
                if limit < account.balance {
                    return Err(LedgerError::validation(format!(
                        "credit limit {} is below the current balance {}",
                        limit, account.balance
                    )));
                }
            }

            let old_limit = account.credit_limit;
            let was_blocked = account.blocked;
            if unit.account_mut().apply_terms(&update, now) {
                let account = unit.account().clone();
                unit.emit(Event::TermsUpdated {
                    account_id,
                    old_limit,
                    new_limit: account.credit_limit,
                    timestamp: now,
                });
                if was_blocked && !account.blocked {
                    unit.emit(Event::AccountUnblocked { account_id, timestamp: now });
                }
                info!("account terms updated");
            }
            Ok(unit.account().clone())
        })
    }

    /// soft close, only at zero balance
    #[instrument(skip(self, time_provider))]
    pub fn close_account(&self, account_id: AccountId, time_provider: &SafeTimeProvider) -> Result<CreditAccount> {
        let now = time_provider.now();

        self.repo.atomically(account_id, |unit| {
            let account = unit.account();
            if !account.is_active() {
                return Err(LedgerError::AccountClosed { id: account_id });
            }
            if !account.balance.is_zero() {
                return Err(LedgerError::NonZeroBalance { balance: account.balance });
            }

            let account = unit.account_mut();
            account.status = AccountStatus::Closed;
            account.updated_at = now;
            unit.emit(Event::AccountClosed { account_id, timestamp: now });

            info!("credit account closed");
            Ok(unit.account().clone())
        })
    }

    // postings

    #[instrument(skip(self, description, time_provider), fields(amount = %amount))]
    pub fn post_purchase(
        &self,
        account_id: AccountId,
        amount: Money,
        description: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<PostedPurchase> {
        validate_amount(amount)?;
        let now = time_provider.now();
        let today = now.date_naive();

        let result = self.repo.atomically(account_id, |unit| {
            mark_overdue_installments(unit, today);

            let account = unit.account();
            if account.blocked {
                return Err(LedgerError::AccountBlocked { id: account_id });
            }
            if !account.is_active() {
                return Err(LedgerError::AccountClosed { id: account_id });
            }
            if !account.can_draw(amount) {
                return Err(LedgerError::CreditLimitExceeded {
                    limit: account.credit_limit,
                    balance: account.balance,
                    requested: amount,
                });
            }

            let own_overdue = overdue_balance(account, unit.transactions(), unit.installments(), now);
            let overdue = own_overdue + self.other_accounts_overdue(account, now)?;
            if overdue.is_positive() {
                return Err(LedgerError::OverdueBalanceBlocksPurchase { overdue });
            }

            let credit_type = account.credit_type;
            let tx = Transaction::new(account_id, TransactionType::Purchase, amount, description, now);
            let transaction = unit.apply_ledger_delta(tx).clone();

            let installments = match credit_type {
                CreditType::ShortTerm => Vec::new(),
                CreditType::LongTerm => {
                    let plan = self.scheduler.schedule(unit.account(), amount, transaction.id, today)?;
                    record_plan(unit, &plan);
                    plan.installments
                }
            };

            let new_balance = unit.account().balance;
            let available_credit = unit.account().available_credit();
            unit.emit(Event::PurchasePosted {
                account_id,
                transaction_id: transaction.id,
                amount,
                new_balance,
                available_credit,
                timestamp: now,
            });

            Ok(PostedPurchase {
                transaction,
                installments,
            })
        });

        match &result {
            Ok(posted) => info!(
                transaction_id = %posted.transaction.id,
                installments = posted.installments.len(),
                "purchase posted"
            ),
            Err(e) => warn!(error = %e, "purchase rejected"),
        }
        result
    }

    #[instrument(skip(self, description, time_provider), fields(amount = %amount))]
    pub fn post_payment(
        &self,
        account_id: AccountId,
        amount: Money,
        description: &str,
        method: PaymentMethod,
        time_provider: &SafeTimeProvider,
    ) -> Result<Transaction> {
        let request = PaymentRequest::new(account_id, amount, description, method);
        request.validate()?;
        let now = time_provider.now();

        let result = self.repo.atomically(account_id, |unit| {
            let account = unit.account();
            if !account.is_active() {
                return Err(LedgerError::AccountClosed { id: account_id });
            }
            if request.amount > account.balance {
                return Err(LedgerError::PaymentExceedsBalance {
                    balance: account.balance,
                    requested: request.amount,
                });
            }

            let code = if request.method.requires_confirmation() {
                Some(self.codes.generate(self.config.payment_code_length))
            } else {
                None
            };
            let tx = Transaction::payment(
                account_id,
                request.amount,
                request.description.clone(),
                request.method,
                code,
                now,
            );
            let posted = unit.apply_ledger_delta(tx).clone();

            let account = unit.account();
            if account.blocked && !account.balance.is_positive() {
                unit.account_mut().blocked = false;
                unit.emit(Event::AccountUnblocked { account_id, timestamp: now });
                info!("account unblocked by payment");
            }

            if posted.payment_status == PaymentStatus::Success {
                self.allocate_to_installments(unit, posted.amount);
            }

            let new_balance = unit.account().balance;
            unit.emit(Event::PaymentPosted {
                account_id,
                transaction_id: posted.id,
                amount: posted.amount,
                method: request.method,
                new_balance,
                timestamp: now,
            });

            Ok(posted)
        });

        match &result {
            Ok(tx) => info!(transaction_id = %tx.id, status = ?tx.payment_status, "payment posted"),
            Err(e) => warn!(error = %e, "payment rejected"),
        }
        result
    }

    /// settle a pending non-cash payment
    ///
    /// a wrong code fails the payment and posts a reversal; that outcome is
    /// committed before `InvalidConfirmationCode` is returned
    #[instrument(skip(self, code, time_provider))]
    pub fn confirm_payment(
        &self,
        transaction_id: TransactionId,
        code: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Transaction> {
        let account_id = self.repo.transaction(transaction_id)?.account_id;
        let now = time_provider.now();

        let outcome = self.repo.atomically(account_id, |unit| {
            let mut payment = unit
                .find_transaction(transaction_id)
                .cloned()
                .ok_or(LedgerError::TransactionNotFound { id: transaction_id })?;
            if !payment.is_pending_payment() {
                return Err(LedgerError::PaymentNotConfirmable { id: transaction_id });
            }

            if payment.payment_code.as_deref() == Some(code) {
                payment.payment_status = PaymentStatus::Success;
                payment.confirmation_code = Some(code.to_string());
                unit.update_transaction(payment.clone());
                self.allocate_to_installments(unit, payment.amount);
                unit.emit(Event::PaymentConfirmed {
                    account_id,
                    transaction_id,
                    timestamp: now,
                });
                return Ok(Confirmation::Confirmed(payment));
            }

            payment.payment_status = PaymentStatus::Failed;
            unit.update_transaction(payment.clone());
            let reversal = unit.apply_ledger_delta(Transaction::reversal_of(&payment, now)).clone();
            unit.emit(Event::PaymentFailed {
                account_id,
                transaction_id,
                reversal_id: reversal.id,
                amount: reversal.amount,
                timestamp: now,
            });
            Ok(Confirmation::Failed)
        })?;

        match outcome {
            Confirmation::Confirmed(tx) => {
                info!("payment confirmed");
                Ok(tx)
            }
            Confirmation::Failed => {
                warn!("payment failed confirmation, reversal posted");
                Err(LedgerError::InvalidConfirmationCode { id: transaction_id })
            }
        }
    }

    /// post interest once a full accrual period has elapsed, returns the amount posted
    #[instrument(skip(self, time_provider))]
    pub fn accrue_interest(&self, account_id: AccountId, time_provider: &SafeTimeProvider) -> Result<Money> {
        let now = time_provider.now();

        self.repo.atomically(account_id, |unit| {
            let outcome = match self.accrual.compute(unit.account(), unit.installments(), now)? {
                Some(outcome) if outcome.amount.is_positive() => outcome,
                Some(_) => {
                    // the period is spent even when nothing is owed on it
                    unit.account_mut().last_interest_accrual = now;
                    debug!("accrual period elapsed but interest rounds to zero");
                    return Ok(Money::ZERO);
                }
                None => {
                    debug!("accrual period has not elapsed");
                    return Ok(Money::ZERO);
                }
            };

            let tx = Transaction::new(
                account_id,
                TransactionType::InterestAccrual,
                outcome.amount,
                format!("interest for {} days", outcome.days),
                now,
            );
            let posted = unit.apply_ledger_delta(tx).clone();
            unit.account_mut().last_interest_accrual = now;
            unit.emit(Event::InterestAccrued {
                account_id,
                transaction_id: posted.id,
                amount: posted.amount,
                days: outcome.days,
                timestamp: now,
            });

            info!(amount = %posted.amount, days = outcome.days, "interest accrued");
            Ok(posted.amount)
        })
    }

    /// charge the establishment's late fee tier, `None` when nothing is late
    #[instrument(skip(self, time_provider))]
    pub fn apply_late_fee(&self, account_id: AccountId, time_provider: &SafeTimeProvider) -> Result<Option<Money>> {
        let account = self.repo.account(account_id)?;
        let rules = self.repo.late_fee_rules(account.establishment_id)?;
        let now = time_provider.now();
        let today = now.date_naive();

        self.repo.atomically(account_id, |unit| {
            mark_overdue_installments(unit, today);

            let account = unit.account();
            let days_overdue = account.days_overdue(today);
            let overdue = overdue_balance(account, unit.transactions(), unit.installments(), now);

            let outcome = self.late_fees.calculate(
                account.establishment_id,
                &rules,
                account.late_fee_percentage,
                account.balance,
                overdue,
                days_overdue,
            )?;
            let outcome = match outcome {
                Some(outcome) if outcome.fee.is_positive() => outcome,
                _ => {
                    debug!(days_overdue, %overdue, "no late fee due");
                    return Ok(None);
                }
            };

            let tx = Transaction::new(
                account_id,
                TransactionType::LateFee,
                outcome.fee,
                format!("late fee, {} days overdue", outcome.days_overdue),
                now,
            );
            let posted = unit.apply_ledger_delta(tx).clone();
            unit.emit(Event::LateFeeApplied {
                account_id,
                transaction_id: posted.id,
                fee_amount: posted.amount,
                days_overdue: outcome.days_overdue,
                timestamp: now,
            });

            info!(fee = %posted.amount, days_overdue = outcome.days_overdue, "late fee applied");
            Ok(Some(posted.amount))
        })
    }

    /// mark past-due pending installments overdue, returns the changed rows
    #[instrument(skip(self, time_provider))]
    pub fn refresh_installments(
        &self,
        account_id: AccountId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<Installment>> {
        let today = time_provider.now().date_naive();
        self.repo
            .atomically(account_id, |unit| Ok(mark_overdue_installments(unit, today)))
    }

    /// register establishment late fee tiers, first match wins in insertion order
    pub fn add_late_fee_rules(&self, rules: Vec<LateFeeRule>) -> Result<()> {
        for rule in &rules {
            rule.validate()?;
        }
        self.repo.insert_late_fee_rules(rules)
    }

    // queries

    pub fn account(&self, account_id: AccountId) -> Result<CreditAccount> {
        self.repo.account(account_id)
    }

    pub fn installments(&self, account_id: AccountId) -> Result<Vec<Installment>> {
        self.repo.installments(account_id)
    }

    pub fn events(&self, account_id: AccountId) -> Result<Vec<Event>> {
        self.repo.events(account_id)
    }

    pub fn next_due_date(&self, account_id: AccountId, time_provider: &SafeTimeProvider) -> Result<NaiveDate> {
        let account = self.repo.account(account_id)?;
        let installments = self.repo.installments(account_id)?;
        Ok(self
            .due_dates
            .next_due_date(&account, &installments, time_provider.now().date_naive()))
    }

    /// installment plan a purchase of `amount` would get today, nothing is stored
    pub fn preview_installments(
        &self,
        account_id: AccountId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<InstallmentPlan> {
        let account = self.repo.account(account_id)?;
        self.scheduler
            .schedule(&account, amount, uuid::Uuid::nil(), time_provider.now().date_naive())
    }

    pub fn overdue_balance(&self, account_id: AccountId, time_provider: &SafeTimeProvider) -> Result<Money> {
        let account = self.repo.account(account_id)?;
        self.overdue_of(&account, time_provider.now())
    }

    /// overdue across all of a client's active accounts
    pub fn client_overdue_balance(&self, client_id: ClientId, time_provider: &SafeTimeProvider) -> Result<Money> {
        let now = time_provider.now();
        let mut total = Money::ZERO;
        for account in self.repo.accounts_for_client(client_id)?.iter().filter(|a| a.is_active()) {
            total += self.overdue_of(account, now)?;
        }
        Ok(total)
    }

    pub fn overdue_accounts(
        &self,
        establishment_id: EstablishmentId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<CreditAccount>> {
        let now = time_provider.now();
        let mut overdue = Vec::new();
        for account in self.repo.accounts_for_establishment(establishment_id)? {
            if account.is_active() && self.overdue_of(&account, now)?.is_positive() {
                overdue.push(account);
            }
        }
        Ok(overdue)
    }

    pub fn summary(&self, account_id: AccountId, time_provider: &SafeTimeProvider) -> Result<AccountSummary> {
        StatementBuilder::new(&self.repo, &self.accrual).summary(account_id, time_provider.now())
    }

    pub fn statement(
        &self,
        account_id: AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<AccountStatement> {
        StatementBuilder::new(&self.repo, &self.accrual).statement(account_id, from, to)
    }

    /// per-account debt report for an establishment
    pub fn debt_summary(
        &self,
        establishment_id: EstablishmentId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<DebtSummaryItem>> {
        StatementBuilder::new(&self.repo, &self.accrual).debt_summary(establishment_id, time_provider.now())
    }

    fn overdue_of(&self, account: &CreditAccount, now: DateTime<Utc>) -> Result<Money> {
        let transactions = self.repo.transactions(account.id, None, None)?;
        let installments = self.repo.installments(account.id)?;
        Ok(overdue_balance(account, &transactions, &installments, now))
    }

    fn other_accounts_overdue(&self, account: &CreditAccount, now: DateTime<Utc>) -> Result<Money> {
        let mut total = Money::ZERO;
        for other in self.repo.accounts_for_client(account.client_id)? {
            if other.id != account.id && other.is_active() {
                total += self.overdue_of(&other, now)?;
            }
        }
        Ok(total)
    }

    fn allocate_to_installments(&self, unit: &mut UnitOfWork, amount: Money) {
        if unit.account().credit_type != CreditType::LongTerm || unit.installments().is_empty() {
            return;
        }
        let account_id = unit.account().id;
        let cleared = !unit.account().balance.is_positive();
        let result = self.allocator.allocate(amount, unit.installments_mut());

        let mut settled: Vec<InstallmentId> = result
            .applications
            .iter()
            .filter(|a| a.settled)
            .map(|a| a.installment_id)
            .collect();
        if cleared {
            // nothing left on the balance, so nothing is left on the schedule
            for inst in unit.installments_mut() {
                if inst.settle() {
                    settled.push(inst.id);
                }
            }
        }

        let paid: Vec<Event> = unit
            .installments()
            .iter()
            .filter(|i| settled.contains(&i.id))
            .map(|i| Event::InstallmentPaid {
                account_id,
                purchase_id: i.purchase_id,
                sequence: i.sequence,
                due_date: i.due_date,
            })
            .collect();
        for event in paid {
            unit.emit(event);
        }
        debug!(
            allocated = %result.allocated(),
            unallocated = %result.unallocated,
            cleared,
            "payment allocated to installments"
        );
    }
}

fn record_plan(unit: &mut UnitOfWork, plan: &InstallmentPlan) {
    let account_id = unit.account().id;
    unit.add_installments(plan.installments.clone());
    if let Some(first_due_date) = plan.first_due_date() {
        unit.emit(Event::InstallmentsScheduled {
            account_id,
            purchase_id: plan.purchase_id,
            count: plan.count(),
            total: plan.total_payment,
            first_due_date,
        });
    }
}

fn mark_overdue_installments(unit: &mut UnitOfWork, today: NaiveDate) -> Vec<Installment> {
    let needs_refresh = unit
        .installments()
        .iter()
        .any(|i| i.status == InstallmentStatus::Pending && i.due_date < today);
    if !needs_refresh {
        return Vec::new();
    }

    let mut changed = Vec::new();
    for inst in unit.installments_mut() {
        if inst.mark_overdue(today) {
            changed.push(inst.clone());
        }
    }
    for inst in &changed {
        unit.emit(Event::InstallmentOverdue {
            account_id: inst.account_id,
            purchase_id: inst.purchase_id,
            sequence: inst.sequence,
            unpaid: inst.unpaid(),
            due_date: inst.due_date,
        });
    }
    changed
}
