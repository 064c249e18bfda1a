//! Persistence port for the ledger.
//!
//! `LedgerRepository` is what the ledger needs from its storage. Reads hand
//! back cloned plain data; every mutation goes through [`LedgerRepository::atomically`],
//! which serializes work per account and commits a [`UnitOfWork`] all or nothing.
//!
//! ```rust,ignore
//! let repo = InMemoryRepository::new();
//! let balance = repo.atomically(account_id, |unit| {
//!     let tx = Transaction::new(account_id, TransactionType::Purchase, amount, "tv", now);
//!     unit.apply_ledger_delta(tx);
//!     Ok(unit.account().balance)
//! })?;
//! ```

pub mod memory;

use chrono::{DateTime, Utc};

use crate::account::CreditAccount;
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::installment::Installment;
use crate::interest::LateFeeRule;
use crate::transaction::Transaction;
use crate::types::{AccountId, ClientId, EstablishmentId, TransactionId};

pub use memory::InMemoryRepository;

/// storage used by the ledger
pub trait LedgerRepository: Send + Sync {
    /// fails with `AccountNotFound` when absent
    fn account(&self, id: AccountId) -> Result<CreditAccount>;

    /// the active account of a client at an establishment
    fn account_for(&self, client_id: ClientId, establishment_id: EstablishmentId) -> Result<Option<CreditAccount>>;

    fn accounts_for_client(&self, client_id: ClientId) -> Result<Vec<CreditAccount>>;

    fn accounts_for_establishment(&self, establishment_id: EstablishmentId) -> Result<Vec<CreditAccount>>;

    /// fails with `DuplicateAccount` if the pair already has an active account
    fn insert_account(&self, account: CreditAccount, events: Vec<Event>) -> Result<()>;

    /// fails with `TransactionNotFound` when absent
    fn transaction(&self, id: TransactionId) -> Result<Transaction>;

    /// entries with `from <= timestamp <= to`, oldest first, either bound may be open
    fn transactions(
        &self,
        account_id: AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>>;

    /// installments ordered by due date then sequence
    fn installments(&self, account_id: AccountId) -> Result<Vec<Installment>>;

    fn late_fee_rules(&self, establishment_id: EstablishmentId) -> Result<Vec<LateFeeRule>>;

    /// appends to the establishment's rule list, order is preserved
    fn insert_late_fee_rules(&self, rules: Vec<LateFeeRule>) -> Result<()>;

    fn events(&self, account_id: AccountId) -> Result<Vec<Event>>;

    /// run `f` against fresh state of one account under its lock
    ///
    /// staged changes are committed only when `f` returns `Ok`
    fn atomically<T, F>(&self, account_id: AccountId, f: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork) -> Result<T>;
}

/// staged changes to one account, committed together
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    account: CreditAccount,
    history: Vec<Transaction>,
    installments: Vec<Installment>,
    installments_dirty: bool,
    staged: Vec<Transaction>,
    updated: Vec<Transaction>,
    events: EventStore,
}

/// what a committed unit writes back
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub account: CreditAccount,
    pub new_transactions: Vec<Transaction>,
    pub updated_transactions: Vec<Transaction>,
    /// replacement installment set when any changed
    pub installments: Option<Vec<Installment>>,
    pub events: Vec<Event>,
}

impl UnitOfWork {
    pub fn new(account: CreditAccount, history: Vec<Transaction>, installments: Vec<Installment>) -> Self {
        Self {
            account,
            history,
            installments,
            installments_dirty: false,
            staged: Vec::new(),
            updated: Vec::new(),
            events: EventStore::new(),
        }
    }

    pub fn account(&self) -> &CreditAccount {
        &self.account
    }

    pub fn account_mut(&mut self) -> &mut CreditAccount {
        &mut self.account
    }

    /// committed entries plus those staged in this unit, oldest first
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.history
            .iter()
            .map(|tx| self.updated.iter().find(|u| u.id == tx.id).unwrap_or(tx))
            .chain(self.staged.iter())
    }

    pub fn find_transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions().find(|tx| tx.id == id)
    }

    pub fn staged(&self) -> &[Transaction] {
        &self.staged
    }

    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    pub fn installments_mut(&mut self) -> &mut [Installment] {
        self.installments_dirty = true;
        &mut self.installments
    }

    pub fn add_installments(&mut self, installments: Vec<Installment>) {
        self.installments_dirty = true;
        self.installments.extend(installments);
        self.installments.sort_by_key(|i| (i.due_date, i.sequence));
    }

    /// the single balance-moving primitive: stage the entry and shift the
    /// balance by its signed amount
    pub fn apply_ledger_delta(&mut self, tx: Transaction) -> &Transaction {
        self.account.balance += tx.signed_amount();
        self.account.updated_at = tx.timestamp;
        self.staged.push(tx);
        // just pushed
        &self.staged[self.staged.len() - 1]
    }

    /// replace a committed entry, used for the payment status transition
    pub fn update_transaction(&mut self, tx: Transaction) {
        if let Some(staged) = self.staged.iter_mut().find(|s| s.id == tx.id) {
            *staged = tx;
            return;
        }
        self.updated.retain(|u| u.id != tx.id);
        self.updated.push(tx);
    }

    pub fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn into_changes(mut self) -> ChangeSet {
        ChangeSet {
            account: self.account,
            new_transactions: self.staged,
            updated_transactions: self.updated,
            installments: if self.installments_dirty {
                Some(self.installments)
            } else {
                None
            },
            events: self.events.take_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountTerms;
    use crate::decimal::{Money, Rate};
    use crate::types::{PaymentMethod, PaymentStatus, TransactionType};
    use uuid::Uuid;

    fn unit() -> UnitOfWork {
        let terms = AccountTerms::revolving(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(1_000),
            15,
            Rate::from_percentage(12),
        );
        UnitOfWork::new(CreditAccount::open(terms, Utc::now()), Vec::new(), Vec::new())
    }

    #[test]
    fn test_apply_ledger_delta_moves_balance_by_sign() {
        let mut unit = unit();
        let id = unit.account().id;
        let now = Utc::now();

        unit.apply_ledger_delta(Transaction::new(id, TransactionType::Purchase, Money::from_major(300), "", now));
        unit.apply_ledger_delta(Transaction::payment(id, Money::from_major(100), "", PaymentMethod::Cash, None, now));
        unit.apply_ledger_delta(Transaction::new(id, TransactionType::LateFee, Money::from_major(5), "", now));

        assert_eq!(unit.account().balance, Money::from_major(205));
        assert_eq!(unit.staged().len(), 3);
        assert_eq!(unit.transactions().count(), 3);
    }

    #[test]
    fn test_update_transaction_overlays_history() {
        let account = unit().account().clone();
        let payment = Transaction::payment(
            account.id,
            Money::from_major(10),
            "",
            PaymentMethod::Yape,
            Some("000111".to_string()),
            Utc::now(),
        );
        let mut unit = UnitOfWork::new(account, vec![payment.clone()], Vec::new());

        let mut confirmed = payment.clone();
        confirmed.payment_status = PaymentStatus::Success;
        unit.update_transaction(confirmed);

        assert_eq!(
            unit.find_transaction(payment.id).map(|tx| tx.payment_status),
            Some(PaymentStatus::Success)
        );

        let changes = unit.into_changes();
        assert!(changes.new_transactions.is_empty());
        assert_eq!(changes.updated_transactions.len(), 1);
        assert!(changes.installments.is_none());
    }
}
