//! Typed chat intents
//!
//! Intents are constructed exactly once at the transport boundary (button
//! callback, slash command) and carried as tagged variants from there on.
//! Neither the controller nor the engine ever parses encoded string tokens
//! to recover operation semantics.

use crate::types::{CryptoCurrency, PaymentMethodKind};

/// A fully-resolved user intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// First contact: bootstrap the account and show the menu
    Start,
    /// Show the current balance and last transaction
    CheckBalance,
    /// Begin the deposit flow (amount prompt follows)
    StartDeposit,
    /// Begin the withdrawal flow (amount prompt follows)
    StartWithdrawal,
    /// Begin a crypto deposit flow for the selected currency
    StartCryptoDeposit(CryptoCurrency),
    /// Begin payment-method registration (label prompt follows)
    AddPaymentMethod(PaymentMethodKind),
    /// Show recent transaction history
    History,
    /// Confirm the pending operation
    Confirm,
    /// Cancel the pending operation
    Cancel,
}

/// One inbound chat event for a session
///
/// Free-form text is only meaningful while the session awaits an amount or
/// a method label; otherwise it falls through to the unrecognized reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A resolved intent (button press, command)
    Intent(Intent),
    /// Free-form text input
    Text(String),
}
