use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AccountId, ClientId, EstablishmentId, PaymentMethod, TransactionId};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    AccountOpened {
        account_id: AccountId,
        client_id: ClientId,
        establishment_id: EstablishmentId,
        credit_limit: Money,
        timestamp: DateTime<Utc>,
    },
    TermsUpdated {
        account_id: AccountId,
        old_limit: Money,
        new_limit: Money,
        timestamp: DateTime<Utc>,
    },
    AccountClosed {
        account_id: AccountId,
        timestamp: DateTime<Utc>,
    },
    AccountUnblocked {
        account_id: AccountId,
        timestamp: DateTime<Utc>,
    },

    // posting events
    PurchasePosted {
        account_id: AccountId,
        transaction_id: TransactionId,
        amount: Money,
        new_balance: Money,
        available_credit: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentPosted {
        account_id: AccountId,
        transaction_id: TransactionId,
        amount: Money,
        method: PaymentMethod,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentConfirmed {
        account_id: AccountId,
        transaction_id: TransactionId,
        timestamp: DateTime<Utc>,
    },
    PaymentFailed {
        account_id: AccountId,
        transaction_id: TransactionId,
        reversal_id: TransactionId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // interest and fee events
    InterestAccrued {
        account_id: AccountId,
        transaction_id: TransactionId,
        amount: Money,
        days: u32,
        timestamp: DateTime<Utc>,
    },
    LateFeeApplied {
        account_id: AccountId,
        transaction_id: TransactionId,
        fee_amount: Money,
        days_overdue: u32,
        timestamp: DateTime<Utc>,
    },

    // installment events
    InstallmentsScheduled {
        account_id: AccountId,
        purchase_id: TransactionId,
        count: u32,
        total: Money,
        first_due_date: NaiveDate,
    },
    InstallmentOverdue {
        account_id: AccountId,
        purchase_id: TransactionId,
        sequence: u32,
        unpaid: Money,
        due_date: NaiveDate,
    },
    InstallmentPaid {
        account_id: AccountId,
        purchase_id: TransactionId,
        sequence: u32,
        due_date: NaiveDate,
    },
}

impl Event {
    pub fn account_id(&self) -> AccountId {
        match self {
            Event::AccountOpened { account_id, .. }
            | Event::TermsUpdated { account_id, .. }
            | Event::AccountClosed { account_id, .. }
            | Event::AccountUnblocked { account_id, .. }
            | Event::PurchasePosted { account_id, .. }
            | Event::PaymentPosted { account_id, .. }
            | Event::PaymentConfirmed { account_id, .. }
            | Event::PaymentFailed { account_id, .. }
            | Event::InterestAccrued { account_id, .. }
            | Event::LateFeeApplied { account_id, .. }
            | Event::InstallmentsScheduled { account_id, .. }
            | Event::InstallmentOverdue { account_id, .. }
            | Event::InstallmentPaid { account_id, .. } => *account_id,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    /// events of a single account, in emission order
    pub fn for_account(&self, account_id: AccountId) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| e.account_id() == account_id)
            .cloned()
            .collect()
    }
}
