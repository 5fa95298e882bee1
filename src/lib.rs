//! Chatbank Library
//! # Overview
//!
//! This library provides a conversational banking ledger: a transaction
//! engine with an append-only audit log, driven by a per-session
//! conversation state machine suitable for chat transports.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Receipt, LedgerError, etc.)
//! - [`cli`] - CLI argument parsing
//! - [`store`] - Store abstractions and the in-memory implementation:
//!   - [`store::traits`] - [`store::LedgerStore`] and [`store::AuditLog`] contracts
//!   - [`store::memory`] - Concurrent in-memory ledger and audit log
//! - [`core`] - Business logic:
//!   - [`core::engine`] - Deposit/withdrawal commit protocol and audit writing
//! - [`session`] - Conversation layer:
//!   - [`session::intent`] - Typed chat intents and events
//!   - [`session::controller`] - Per-session prompt/confirm state machine
//!
//! # Operations
//!
//! The engine supports these account operations:
//!
//! - **Deposit**: Credit funds to an account
//! - **Withdrawal**: Debit funds from an account (requires sufficient balance)
//! - **Crypto deposit**: Credit a BTC/ETH/USDT amount at face value
//! - **History**: Recent transactions from the audit log, newest first
//! - **Payment methods**: Register bank transfer, PayPal, or crypto labels
//!
//! # Commit Protocol
//!
//! Every balance change validates the amount, re-reads the balance, applies
//! the delta as one indivisible store update, and only then appends an
//! audit record. A failed audit append never rolls back the balance; the
//! gap is logged and the receipt stands.

// Module declarations
pub mod cli;
pub mod core;
pub mod session;
pub mod store;
pub mod types;

pub use core::{Engine, DEFAULT_HISTORY_LIMIT};
pub use session::{ChatEvent, Intent, Reply, SessionController};
pub use store::{AuditLog, LedgerStore, MemoryAudit, MemoryLedger};
pub use types::{
    Account, AccountId, AuditRecord, CryptoCurrency, LedgerError, OperationKind, PaymentMethod,
    PaymentMethodKind, Quote, Receipt, TransactionSummary,
};
