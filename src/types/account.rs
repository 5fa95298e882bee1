//! Account-related types for the chatbank ledger core
//!
//! This module defines the Account document and the payment-method
//! descriptors a user can register.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::transaction::TransactionSummary;

/// Account identifier
///
/// Opaque, externally assigned, stable per chat session (matches chat ids).
pub type AccountId = i64;

/// Categories of registered payment methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    BankTransfer,
    Paypal,
    Crypto,
}

impl fmt::Display for PaymentMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethodKind::BankTransfer => write!(f, "bank transfer"),
            PaymentMethodKind::Paypal => write!(f, "PayPal"),
            PaymentMethodKind::Crypto => write!(f, "crypto"),
        }
    }
}

/// A registered payment method descriptor
///
/// The label is free-form: a bank name, a PayPal email, or a crypto ticker.
/// Payment methods are independent of balance invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Method category
    pub kind: PaymentMethodKind,
    /// Free-form label ("Itaú", "user@example.com", "BTC")
    pub label: String,
}

impl PaymentMethod {
    pub fn new(kind: PaymentMethodKind, label: impl Into<String>) -> Self {
        PaymentMethod {
            kind,
            label: label.into(),
        }
    }
}

/// A user's balance record plus registered payment methods
///
/// Created on first contact with balance 0 and no last transaction. Mutated
/// only through the engine's commit path; never deleted by this core.
/// Invariant: `balance >= 0` at every observable boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Stable, externally assigned identifier
    pub id: AccountId,

    /// Current balance in the base currency
    ///
    /// Decimal, never floating point, so repeated additions and
    /// subtractions cannot accumulate rounding drift.
    pub balance: Decimal,

    /// Summary of the most recent committed transaction
    ///
    /// `None` until the first commit.
    pub last_transaction: Option<TransactionSummary>,

    /// Registered payment method descriptors
    pub payment_methods: Vec<PaymentMethod>,
}

impl Account {
    /// Create a new account with zero balance and no history
    pub fn new(id: AccountId) -> Self {
        Account {
            id,
            balance: Decimal::ZERO,
            last_transaction: None,
            payment_methods: Vec::new(),
        }
    }
}
