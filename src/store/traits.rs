//! Store traits consumed by the transaction engine
//!
//! This module defines the trait abstractions for the two persistent
//! collections: the per-account ledger and the append-only audit log.
//! Implementations may be in-process (DashMap) or a remote document store;
//! the engine only relies on the contracts below.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{Account, AccountId, AuditRecord, LedgerError, PaymentMethod, TransactionSummary};

/// Outcome of an atomic balance-delta application
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaOutcome {
    /// Whether the update took effect
    ///
    /// `false` means the account no longer existed when the delta was
    /// applied; the engine reports this as a failed commit.
    pub applied: bool,
    /// Balance immediately before the delta
    pub previous_balance: Decimal,
}

/// Per-account balance ledger
///
/// Contract required by the engine:
/// - `apply_delta` must be atomic at single-account granularity. The store
///   is the authority; the engine never serializes accounts with in-process
///   locks.
/// - Connectivity failures surface as [`LedgerError::StoreUnavailable`];
///   the engine never retries.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch an account, `None` if it does not exist
    async fn get(&self, account: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Get or create the account (idempotent, used on first contact)
    ///
    /// New accounts start with balance 0 and no last transaction.
    async fn create_if_absent(&self, account: AccountId) -> Result<Account, LedgerError>;

    /// Atomically apply a signed balance delta and set the last-transaction
    /// summary
    ///
    /// The read of the previous balance and the write of the new one must be
    /// one indivisible step, so concurrent deltas against the same account
    /// cannot lose updates. Returns `applied: false` (and no mutation) if
    /// the account no longer exists.
    async fn apply_delta(
        &self,
        account: AccountId,
        delta: Decimal,
        last_transaction: TransactionSummary,
    ) -> Result<DeltaOutcome, LedgerError>;

    /// Register a payment method on the account
    ///
    /// Set semantics: adding an identical (kind, label) pair twice is a
    /// no-op. Fails with `AccountNotFound` for unknown accounts.
    async fn add_payment_method(
        &self,
        account: AccountId,
        method: PaymentMethod,
    ) -> Result<(), LedgerError>;
}

/// Append-only audit log of committed transactions
///
/// No update or delete operation is exposed; records are immutable once
/// appended.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one record
    async fn append(&self, record: AuditRecord) -> Result<(), LedgerError>;

    /// The account's most recent records, newest first, truncated to `limit`
    ///
    /// An empty result is not an error.
    async fn query(&self, account: AccountId, limit: usize)
        -> Result<Vec<AuditRecord>, LedgerError>;
}
