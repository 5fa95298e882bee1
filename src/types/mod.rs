//! Core data types for the chatbank ledger
//!
//! Re-exports the account document, transaction types, and the error enum
//! used throughout the crate.

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountId, PaymentMethod, PaymentMethodKind};
pub use error::LedgerError;
pub use transaction::{
    AuditRecord, CryptoCurrency, OperationKind, Quote, Receipt, TransactionSummary,
};
