//! In-memory store implementations backed by DashMap
//!
//! This module provides `MemoryLedger` and `MemoryAudit`, thread-safe
//! in-process implementations of the store traits. They serve as the
//! reference store for the console transport and for tests.
//!
//! # Thread Safety
//!
//! `DashMap` provides fine-grained locking through internal sharding.
//! `apply_delta` reads and writes the balance while holding the entry lock,
//! which is exactly the atomic-delta contract the engine depends on:
//! concurrent deltas against the same account serialize on the entry,
//! deltas against different accounts proceed in parallel.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::store::traits::{AuditLog, DeltaOutcome, LedgerStore};
use crate::types::{Account, AccountId, AuditRecord, LedgerError, PaymentMethod, TransactionSummary};

/// Thread-safe in-memory account ledger
#[derive(Debug, Default)]
pub struct MemoryLedger {
    /// Account documents keyed by account id
    accounts: DashMap<AccountId, Account>,
}

impl MemoryLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Number of accounts currently stored
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no accounts exist yet
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get(&self, account: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.accounts.get(&account).map(|entry| entry.clone()))
    }

    async fn create_if_absent(&self, account: AccountId) -> Result<Account, LedgerError> {
        Ok(self
            .accounts
            .entry(account)
            .or_insert_with(|| Account::new(account))
            .clone())
    }

    async fn apply_delta(
        &self,
        account: AccountId,
        delta: Decimal,
        last_transaction: TransactionSummary,
    ) -> Result<DeltaOutcome, LedgerError> {
        // get_mut, not entry: a vanished account must report applied=false
        // instead of being resurrected with a bogus balance.
        match self.accounts.get_mut(&account) {
            Some(mut entry) => {
                let previous_balance = entry.balance;
                // Checked arithmetic: an overflowing delta rejects the
                // update and leaves the account untouched.
                let new_balance = previous_balance.checked_add(delta).ok_or_else(|| {
                    LedgerError::arithmetic_overflow(last_transaction.kind.to_string(), account)
                })?;
                entry.balance = new_balance;
                entry.last_transaction = Some(last_transaction);
                Ok(DeltaOutcome {
                    applied: true,
                    previous_balance,
                })
            }
            None => Ok(DeltaOutcome {
                applied: false,
                previous_balance: Decimal::ZERO,
            }),
        }
    }

    async fn add_payment_method(
        &self,
        account: AccountId,
        method: PaymentMethod,
    ) -> Result<(), LedgerError> {
        let mut entry = self
            .accounts
            .get_mut(&account)
            .ok_or_else(|| LedgerError::account_not_found(account))?;

        // Set semantics: identical (kind, label) pairs are stored once.
        if !entry.payment_methods.contains(&method) {
            entry.payment_methods.push(method);
        }
        Ok(())
    }
}

/// Thread-safe in-memory audit log
///
/// Records are appended in commit order per account; queries walk the
/// per-account vector from the end, so results come back newest first.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    /// Per-account append-only record vectors
    records: DashMap<AccountId, Vec<AuditRecord>>,
}

impl MemoryAudit {
    /// Create a new empty audit log
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Total records appended for the account
    pub fn count(&self, account: AccountId) -> usize {
        self.records
            .get(&account)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl AuditLog for MemoryAudit {
    async fn append(&self, record: AuditRecord) -> Result<(), LedgerError> {
        self.records.entry(record.account).or_default().push(record);
        Ok(())
    }

    async fn query(
        &self,
        account: AccountId,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, LedgerError> {
        Ok(self
            .records
            .get(&account)
            .map(|entry| entry.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
