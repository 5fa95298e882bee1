//! Error types for the chatbank ledger core
//!
//! This module defines all error kinds that can occur while processing a
//! balance operation. The taxonomy is split along recovery lines:
//!
//! - **Validation errors** (`InvalidAmount`, `InsufficientFunds`): expected,
//!   user-correctable. The conversation layer re-prompts for input.
//! - **Operation failures** (`AccountNotFound`, `CommitFailed`,
//!   `ArithmeticOverflow`, `StoreUnavailable`): reported to the caller as a
//!   failed operation with no automatic retry.
//! - **`AuditWriteFailed`**: the balance mutation already applied but the
//!   audit append did not. Logged, never surfaced as a transaction failure.

use crate::types::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for ledger operations
///
/// Each variant carries the context needed to render a useful message to the
/// chat user or to the operator log.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Operation referenced an account that does not exist
    ///
    /// Surfaced to the caller as a failed operation; no retry.
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The account id that was not found
        account: AccountId,
    },

    /// Amount was zero, negative, or unparseable
    ///
    /// Recoverable: the conversation layer re-prompts for a new amount.
    /// Rejected before any store access.
    #[error("Invalid amount '{amount}': must be greater than zero")]
    InvalidAmount {
        /// The offending amount as entered
        amount: String,
    },

    /// Withdrawal exceeds the current balance
    ///
    /// Recoverable: the caller re-prompts, showing the current balance.
    #[error("Insufficient funds for account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Account id
        account: AccountId,
        /// Balance at the time of the check
        balance: Decimal,
        /// Requested withdrawal amount
        requested: Decimal,
    },

    /// The atomic balance update reported no effect
    ///
    /// The account vanished between the re-read and the delta application.
    /// No audit record is written. Surfaced as a retryable failure.
    #[error("Commit failed for account {account}: balance update had no effect")]
    CommitFailed {
        /// Account id
        account: AccountId,
    },

    /// Arithmetic overflow would occur
    ///
    /// The balance change is rejected to maintain account integrity; no
    /// mutation and no audit write happen.
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account id
        account: AccountId,
    },

    /// The underlying store is unreachable
    ///
    /// All engine operations fail fast with this kind; the caller shows a
    /// service-degraded message. The engine never retries.
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the connectivity failure
        message: String,
    },

    /// Audit append failed after the balance mutation applied
    ///
    /// The balance change is NOT rolled back. The engine logs this and still
    /// returns the receipt; audit implementations return it from `append`.
    #[error("Audit write failed for account {account}: {message}")]
    AuditWriteFailed {
        /// Account id
        account: AccountId,
        /// Description of the append failure
        message: String,
    },
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        LedgerError::AccountNotFound { account }
    }

    /// Create an InvalidAmount error from the raw user input
    pub fn invalid_amount(amount: impl Into<String>) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.into(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    /// Create a CommitFailed error
    pub fn commit_failed(account: AccountId) -> Self {
        LedgerError::CommitFailed { account }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: impl Into<String>, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.into(),
            account,
        }
    }

    /// Create a StoreUnavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        LedgerError::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create an AuditWriteFailed error
    pub fn audit_write_failed(account: AccountId, message: impl Into<String>) -> Self {
        LedgerError::AuditWriteFailed {
            account,
            message: message.into(),
        }
    }

    /// Whether the conversation layer should re-prompt for a new amount
    ///
    /// True only for the user-correctable validation errors.
    pub fn is_retryable_input(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAmount { .. } | LedgerError::InsufficientFunds { .. }
        )
    }
}
