use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::account::CreditAccount;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::installment::Installment;
use crate::interest::LateFeeRule;
use crate::store::{ChangeSet, LedgerRepository, UnitOfWork};
use crate::transaction::Transaction;
use crate::types::{AccountId, ClientId, EstablishmentId, TransactionId};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, CreditAccount>,
    transactions: HashMap<AccountId, Vec<Transaction>>,
    transaction_index: HashMap<TransactionId, AccountId>,
    installments: HashMap<AccountId, Vec<Installment>>,
    late_fee_rules: HashMap<EstablishmentId, Vec<LateFeeRule>>,
    events: Vec<Event>,
}

impl State {
    fn apply(&mut self, changes: ChangeSet) {
        let account_id = changes.account.id;

        let entries = self.transactions.entry(account_id).or_default();
        for updated in changes.updated_transactions {
            if let Some(existing) = entries.iter_mut().find(|tx| tx.id == updated.id) {
                *existing = updated;
            }
        }
        for tx in changes.new_transactions {
            self.transaction_index.insert(tx.id, account_id);
            entries.push(tx);
        }

        if let Some(installments) = changes.installments {
            self.installments.insert(account_id, installments);
        }

        self.events.extend(changes.events);
        self.accounts.insert(account_id, changes.account);
    }
}

/// in-memory adapter, one read/write lock over all state plus a mutex per account
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
    account_locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| LedgerError::storage("ledger state lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| LedgerError::storage("ledger state lock poisoned"))
    }

    fn account_lock(&self, account_id: AccountId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .account_locks
            .lock()
            .map_err(|_| LedgerError::storage("account lock table poisoned"))?;
        Ok(locks.entry(account_id).or_default().clone())
    }
}

impl LedgerRepository for InMemoryRepository {
    fn account(&self, id: AccountId) -> Result<CreditAccount> {
        self.read()?
            .accounts
            .get(&id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound { id })
    }

    fn account_for(&self, client_id: ClientId, establishment_id: EstablishmentId) -> Result<Option<CreditAccount>> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|a| a.client_id == client_id && a.establishment_id == establishment_id && a.is_active())
            .cloned())
    }

    fn accounts_for_client(&self, client_id: ClientId) -> Result<Vec<CreditAccount>> {
        let mut accounts: Vec<CreditAccount> = self
            .read()?
            .accounts
            .values()
            .filter(|a| a.client_id == client_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }

    fn accounts_for_establishment(&self, establishment_id: EstablishmentId) -> Result<Vec<CreditAccount>> {
        let mut accounts: Vec<CreditAccount> = self
            .read()?
            .accounts
            .values()
            .filter(|a| a.establishment_id == establishment_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }

    fn insert_account(&self, account: CreditAccount, events: Vec<Event>) -> Result<()> {
        let mut state = self.write()?;
        let duplicate = state.accounts.values().any(|a| {
            a.client_id == account.client_id && a.establishment_id == account.establishment_id && a.is_active()
        });
        if duplicate {
            return Err(LedgerError::DuplicateAccount {
                client_id: account.client_id,
                establishment_id: account.establishment_id,
            });
        }
        state.events.extend(events);
        state.accounts.insert(account.id, account);
        Ok(())
    }

    fn transaction(&self, id: TransactionId) -> Result<Transaction> {
        let state = self.read()?;
        state
            .transaction_index
            .get(&id)
            .and_then(|account_id| state.transactions.get(account_id))
            .and_then(|entries| entries.iter().find(|tx| tx.id == id))
            .cloned()
            .ok_or(LedgerError::TransactionNotFound { id })
    }

    fn transactions(
        &self,
        account_id: AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>> {
        let state = self.read()?;
        let mut entries: Vec<Transaction> = state
            .transactions
            .get(&account_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|tx| from.map_or(true, |f| tx.timestamp >= f))
                    .filter(|tx| to.map_or(true, |t| tx.timestamp <= t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // stable, so same-instant entries keep posting order
        entries.sort_by_key(|tx| tx.timestamp);
        Ok(entries)
    }

    fn installments(&self, account_id: AccountId) -> Result<Vec<Installment>> {
        let mut installments = self
            .read()?
            .installments
            .get(&account_id)
            .cloned()
            .unwrap_or_default();
        installments.sort_by_key(|i| (i.due_date, i.sequence));
        Ok(installments)
    }

    fn late_fee_rules(&self, establishment_id: EstablishmentId) -> Result<Vec<LateFeeRule>> {
        Ok(self
            .read()?
            .late_fee_rules
            .get(&establishment_id)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_late_fee_rules(&self, rules: Vec<LateFeeRule>) -> Result<()> {
        let mut state = self.write()?;
        for rule in rules {
            state
                .late_fee_rules
                .entry(rule.establishment_id)
                .or_default()
                .push(rule);
        }
        Ok(())
    }

    fn events(&self, account_id: AccountId) -> Result<Vec<Event>> {
        Ok(self
            .read()?
            .events
            .iter()
            .filter(|e| e.account_id() == account_id)
            .cloned()
            .collect())
    }

    fn atomically<T, F>(&self, account_id: AccountId, f: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork) -> Result<T>,
    {
        let lock = self.account_lock(account_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| LedgerError::storage("account lock poisoned"))?;

        let mut unit = {
            let state = self.read()?;
            let account = state
                .accounts
                .get(&account_id)
                .cloned()
                .ok_or(LedgerError::AccountNotFound { id: account_id })?;
            let history = state.transactions.get(&account_id).cloned().unwrap_or_default();
            let installments = state.installments.get(&account_id).cloned().unwrap_or_default();
            UnitOfWork::new(account, history, installments)
        };

        let value = f(&mut unit)?;

        let changes = unit.into_changes();
        debug!(
            %account_id,
            new_transactions = changes.new_transactions.len(),
            updated_transactions = changes.updated_transactions.len(),
            "committing unit of work"
        );
        self.write()?.apply(changes);
        Ok(value)
    }
}
