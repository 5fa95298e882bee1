//! Transaction-related types for the chatbank ledger core
//!
//! This module defines the operation kinds, the audit-log record, and the
//! receipt returned to callers after a committed balance change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::account::PaymentMethod;
use crate::types::AccountId;

/// Cryptocurrencies accepted for crypto deposits
///
/// Amounts are credited 1:1 with the base currency; exchange rates are
/// out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CryptoCurrency {
    Btc,
    Eth,
    Usdt,
}

impl fmt::Display for CryptoCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoCurrency::Btc => write!(f, "BTC"),
            CryptoCurrency::Eth => write!(f, "ETH"),
            CryptoCurrency::Usdt => write!(f, "USDT"),
        }
    }
}

/// Balance-changing operations supported by the engine
///
/// Deposits and crypto deposits credit the balance; withdrawals debit it.
/// Crypto deposits keep their currency in the audit trail even though the
/// credited amount is 1:1 with the base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Credit funds to an account
    Deposit,

    /// Debit funds from an account
    ///
    /// Requires sufficient balance; the balance may reach exactly zero.
    Withdrawal,

    /// Credit funds from a cryptocurrency, valued 1:1 with the base currency
    CryptoDeposit(CryptoCurrency),
}

impl OperationKind {
    /// Signed balance delta for this operation
    ///
    /// +amount for deposits, -amount for withdrawals.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            OperationKind::Deposit | OperationKind::CryptoDeposit(_) => amount,
            OperationKind::Withdrawal => -amount,
        }
    }

    /// Whether this operation debits the balance
    pub fn is_debit(&self) -> bool {
        matches!(self, OperationKind::Withdrawal)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Deposit => write!(f, "deposit"),
            OperationKind::Withdrawal => write!(f, "withdrawal"),
            OperationKind::CryptoDeposit(currency) => write!(f, "{currency} deposit"),
        }
    }
}

/// Summary of the most recent committed transaction
///
/// Stored on the account record so balance checks can render the last
/// activity without querying the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// Operation kind
    pub kind: OperationKind,
    /// Committed amount (always positive)
    pub amount: Decimal,
    /// When the operation committed
    pub timestamp: DateTime<Utc>,
}

/// Immutable audit-log entry for one committed balance change
///
/// Written exactly once per commit, never updated or deleted. Invariant:
/// `current_balance == previous_balance + signed(amount)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Account the operation applied to
    pub account: AccountId,
    /// Operation kind
    pub kind: OperationKind,
    /// Committed amount (always positive)
    pub amount: Decimal,
    /// Balance before the commit
    pub previous_balance: Decimal,
    /// Balance after the commit
    pub current_balance: Decimal,
    /// When the operation committed
    pub timestamp: DateTime<Utc>,
    /// Payment method used, if one was selected
    pub method: Option<PaymentMethod>,
}

/// Result descriptor returned to the caller after a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Account the operation applied to
    pub account: AccountId,
    /// Operation kind
    pub kind: OperationKind,
    /// Committed amount (always positive)
    pub amount: Decimal,
    /// Balance before the commit
    pub previous_balance: Decimal,
    /// Balance after the commit
    pub current_balance: Decimal,
    /// When the operation committed
    pub timestamp: DateTime<Utc>,
}

impl From<AuditRecord> for Receipt {
    fn from(record: AuditRecord) -> Self {
        Receipt {
            account: record.account,
            kind: record.kind,
            amount: record.amount,
            previous_balance: record.previous_balance,
            current_balance: record.current_balance,
            timestamp: record.timestamp,
        }
    }
}

/// Pure read of an account's balance and last activity
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Current balance
    pub balance: Decimal,
    /// Most recent committed transaction, `None` before the first one
    pub last_transaction: Option<TransactionSummary>,
}
