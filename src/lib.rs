pub mod account;
pub mod codes;
pub mod config;
pub mod dates;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod installment;
pub mod interest;
pub mod ledger;
pub mod payments;
pub mod statement;
pub mod store;
pub mod transaction;
pub mod types;

// re-export key types
pub use account::CreditAccount;
pub use codes::{FixedCode, PaymentCodeGenerator, SeededCodes};
pub use config::{AccountTerms, LedgerConfig, TermsUpdate};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use installment::Installment;
pub use interest::{
    AccrualEngine, FeeType, InterestCalculation, InterestCalculator, LateFeeEngine, LateFeeRule,
};
pub use ledger::{Ledger, PostedPurchase};
pub use payments::{
    DueDateResolver, InstallmentAllocator, InstallmentPlan, InstallmentScheduler, PaymentRequest,
    ScheduledPayment,
};
pub use statement::{AccountStatement, AccountSummary, DebtSummaryItem};
pub use store::{InMemoryRepository, LedgerRepository, UnitOfWork};
pub use transaction::Transaction;
pub use types::{
    AccountId, AccountStatus, ClientId, CreditType, EstablishmentId, InstallmentId, InstallmentStatus,
    InterestType, PaymentMethod, PaymentStatus, TransactionId, TransactionType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
