//! Transaction engine enforcing the balance-mutation and audit-trail protocol
//!
//! This module provides the [`Engine`], the sole writer of account balances
//! and audit records. Given an account id, an operation kind, and a positive
//! amount, it validates, applies the balance change atomically through the
//! ledger store, appends the audit record, and returns a receipt the caller
//! can render.
//!
//! # Commit protocol
//!
//! 1. Amounts are validated (`> 0`) before any store access.
//! 2. The current balance is re-read immediately before mutating, never the
//!    value cached at prompt time. Withdrawals are checked against that
//!    re-read balance.
//! 3. The signed delta is applied through the store's atomic `apply_delta`,
//!    one indivisible read-and-apply step, so two confirmations racing on
//!    the same account cannot lose an update.
//! 4. The audit record is appended only after the balance mutation applied.
//!    If the append fails, the balance change is NOT rolled back; the
//!    failure is logged and the receipt is still returned. This can leave a
//!    balance change with no matching audit row.
//! 5. If `apply_delta` reports no effect (the account vanished between
//!    steps), the engine reports `CommitFailed` and writes no audit record.
//!
//! The engine holds no per-conversation state; multi-step prompting lives in
//! the session layer.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::store::{AuditLog, LedgerStore};
use crate::types::{
    Account, AccountId, AuditRecord, CryptoCurrency, LedgerError, OperationKind, PaymentMethod,
    Quote, Receipt, TransactionSummary,
};

/// Default number of records returned by [`Engine::history`]
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Transaction engine over a ledger store and an audit log
///
/// Cheap to clone; clones share the underlying stores and can be used from
/// concurrent tasks. Per-account serialization is the store's job (the
/// atomic-delta contract), not an in-process lock.
#[derive(Debug)]
pub struct Engine<L, A> {
    ledger: Arc<L>,
    audit: Arc<A>,
}

impl<L, A> Clone for Engine<L, A> {
    fn clone(&self) -> Self {
        Engine {
            ledger: Arc::clone(&self.ledger),
            audit: Arc::clone(&self.audit),
        }
    }
}

impl<L: LedgerStore, A: AuditLog> Engine<L, A> {
    /// Create an engine over the given stores
    pub fn new(ledger: Arc<L>, audit: Arc<A>) -> Self {
        Engine { ledger, audit }
    }

    /// Get or create the account (first-contact bootstrap)
    pub async fn register(&self, account: AccountId) -> Result<Account, LedgerError> {
        let created = self.ledger.create_if_absent(account).await?;
        if created.balance == Decimal::ZERO && created.last_transaction.is_none() {
            info!(account, "account ready");
        }
        Ok(created)
    }

    /// Current balance and last transaction (pure read, no side effects)
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the account does not exist.
    pub async fn quote(&self, account: AccountId) -> Result<Quote, LedgerError> {
        let stored = self
            .ledger
            .get(account)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(account))?;
        Ok(Quote {
            balance: stored.balance,
            last_transaction: stored.last_transaction,
        })
    }

    /// Credit `amount` to the account
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0` (checked before any store access)
    /// - `AccountNotFound` if the account does not exist
    /// - `ArithmeticOverflow` if the credit would overflow the balance
    /// - `CommitFailed` if the account vanished mid-commit
    /// - `StoreUnavailable` if the ledger is unreachable
    pub async fn deposit(
        &self,
        account: AccountId,
        amount: Decimal,
    ) -> Result<Receipt, LedgerError> {
        self.commit(account, OperationKind::Deposit, amount, None)
            .await
    }

    /// Credit a crypto deposit, valued 1:1 with the base currency
    ///
    /// The currency is preserved in the operation kind for the audit trail;
    /// no exchange-rate conversion is performed.
    pub async fn crypto_deposit(
        &self,
        account: AccountId,
        currency: CryptoCurrency,
        amount: Decimal,
    ) -> Result<Receipt, LedgerError> {
        self.commit(account, OperationKind::CryptoDeposit(currency), amount, None)
            .await
    }

    /// Debit `amount` from the account
    ///
    /// Withdrawing the exact balance is permitted; the balance may reach
    /// exactly zero.
    ///
    /// # Errors
    ///
    /// As [`Engine::deposit`], plus `InsufficientFunds` (reporting the
    /// current balance so the caller can re-prompt) when `amount` exceeds
    /// the balance.
    pub async fn withdraw(
        &self,
        account: AccountId,
        amount: Decimal,
    ) -> Result<Receipt, LedgerError> {
        self.commit(account, OperationKind::Withdrawal, amount, None)
            .await
    }

    /// The account's most recent committed transactions, newest first
    ///
    /// Truncated to `limit`; an account with no history yields an empty
    /// vector, not an error. Restart by calling again.
    pub async fn history(
        &self,
        account: AccountId,
        limit: usize,
    ) -> Result<Vec<Receipt>, LedgerError> {
        let records = self.audit.query(account, limit).await?;
        Ok(records.into_iter().map(Receipt::from).collect())
    }

    /// Register a payment method descriptor on the account
    ///
    /// Independent of balance invariants; set semantics per (kind, label).
    pub async fn add_payment_method(
        &self,
        account: AccountId,
        method: PaymentMethod,
    ) -> Result<(), LedgerError> {
        self.ledger.add_payment_method(account, method).await
    }

    /// Validate and atomically commit one balance change, then audit it
    async fn commit(
        &self,
        account: AccountId,
        kind: OperationKind,
        amount: Decimal,
        method: Option<PaymentMethod>,
    ) -> Result<Receipt, LedgerError> {
        // Zero and negative amounts are rejected before touching the store.
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount.to_string()));
        }

        // Re-read the balance now; the value shown at prompt time may be
        // stale by the time the user confirms.
        let current = self
            .ledger
            .get(account)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(account))?;

        if kind.is_debit() && amount > current.balance {
            warn!(account, %amount, balance = %current.balance, "withdrawal exceeds balance");
            return Err(LedgerError::insufficient_funds(
                account,
                current.balance,
                amount,
            ));
        }

        let timestamp = Utc::now();
        let delta = kind.signed(amount);
        let summary = TransactionSummary {
            kind,
            amount,
            timestamp,
        };

        let outcome = self.ledger.apply_delta(account, delta, summary).await?;
        if !outcome.applied {
            error!(account, kind = %kind, %amount, "balance update had no effect");
            return Err(LedgerError::commit_failed(account));
        }

        // Checked: the store already applied this sum, but a misbehaving
        // implementation must not turn into a panic here.
        let current_balance = outcome
            .previous_balance
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow(kind.to_string(), account))?;

        let receipt = Receipt {
            account,
            kind,
            amount,
            previous_balance: outcome.previous_balance,
            current_balance,
            timestamp,
        };
        info!(
            account,
            kind = %kind,
            %amount,
            previous = %receipt.previous_balance,
            current = %receipt.current_balance,
            "committed"
        );

        let record = AuditRecord {
            account,
            kind,
            amount,
            previous_balance: receipt.previous_balance,
            current_balance: receipt.current_balance,
            timestamp,
            method,
        };
        if let Err(err) = self.audit.append(record).await {
            // The balance already moved; the commit stands without its
            // audit row (see module docs).
            error!(account, %err, "audit append failed after balance commit");
        }

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryAudit, MemoryLedger};
    use rust_decimal_macros::dec;

    fn engine() -> (Engine<MemoryLedger, MemoryAudit>, Arc<MemoryLedger>, Arc<MemoryAudit>) {
        let ledger = Arc::new(MemoryLedger::new());
        let audit = Arc::new(MemoryAudit::new());
        let engine = Engine::new(Arc::clone(&ledger), Arc::clone(&audit));
        (engine, ledger, audit)
    }

    #[tokio::test]
    async fn test_register_creates_account_once() {
        let (engine, ledger, _) = engine();

        let account = engine.register(1).await.unwrap();
        assert_eq!(account.balance, Decimal::ZERO);
        assert!(account.last_transaction.is_none());

        engine.deposit(1, dec!(25)).await.unwrap();
        let again = engine.register(1).await.unwrap();
        assert_eq!(again.balance, dec!(25));
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_quote_unknown_account() {
        let (engine, _, _) = engine();
        assert_eq!(
            engine.quote(9).await.unwrap_err(),
            LedgerError::account_not_found(9)
        );
    }

    #[tokio::test]
    async fn test_deposit_updates_balance_and_audits() {
        let (engine, _, audit) = engine();
        engine.register(1).await.unwrap();

        let receipt = engine.deposit(1, dec!(100.00)).await.unwrap();
        assert_eq!(receipt.previous_balance, dec!(0));
        assert_eq!(receipt.current_balance, dec!(100.00));
        assert_eq!(receipt.kind, OperationKind::Deposit);

        let quote = engine.quote(1).await.unwrap();
        assert_eq!(quote.balance, dec!(100.00));
        let last = quote.last_transaction.unwrap();
        assert_eq!(last.kind, OperationKind::Deposit);
        assert_eq!(last.amount, dec!(100.00));

        assert_eq!(audit.count(1), 1);
    }

    #[tokio::test]
    async fn test_deposit_rejects_nonpositive_amounts() {
        let (engine, _, audit) = engine();
        engine.register(1).await.unwrap();

        for amount in [dec!(0), dec!(-5)] {
            let result = engine.deposit(1, amount).await;
            assert!(matches!(
                result.unwrap_err(),
                LedgerError::InvalidAmount { .. }
            ));
        }
        assert_eq!(audit.count(1), 0);
    }

    #[tokio::test]
    async fn test_withdraw_rejects_nonpositive_amounts() {
        let (engine, _, _) = engine();
        engine.register(1).await.unwrap();

        let result = engine.withdraw(1, dec!(-1)).await;
        assert!(matches!(
            result.unwrap_err(),
            LedgerError::InvalidAmount { .. }
        ));
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_funds_leaves_state_untouched() {
        let (engine, _, audit) = engine();
        engine.register(1).await.unwrap();
        engine.deposit(1, dec!(100.00)).await.unwrap();

        let result = engine.withdraw(1, dec!(150.00)).await;
        assert_eq!(
            result.unwrap_err(),
            LedgerError::insufficient_funds(1, dec!(100.00), dec!(150.00))
        );

        // No partial mutation: balance and audit log unchanged.
        assert_eq!(engine.quote(1).await.unwrap().balance, dec!(100.00));
        assert_eq!(audit.count(1), 1);
    }

    #[tokio::test]
    async fn test_deposit_overflow_errors_without_audit() {
        let (engine, _, audit) = engine();
        engine.register(1).await.unwrap();
        engine.deposit(1, Decimal::MAX).await.unwrap();

        let result = engine.deposit(1, Decimal::ONE).await;
        assert_eq!(
            result.unwrap_err(),
            LedgerError::arithmetic_overflow("deposit", 1)
        );

        // The rejected commit leaves no trace: balance and audit unchanged.
        assert_eq!(engine.quote(1).await.unwrap().balance, Decimal::MAX);
        assert_eq!(audit.count(1), 1);
    }

    #[tokio::test]
    async fn test_withdraw_exact_balance_reaches_zero() {
        let (engine, _, _) = engine();
        engine.register(1).await.unwrap();
        engine.deposit(1, dec!(42.50)).await.unwrap();

        let receipt = engine.withdraw(1, dec!(42.50)).await.unwrap();
        assert_eq!(receipt.current_balance, dec!(0));
        assert_eq!(engine.quote(1).await.unwrap().balance, dec!(0));
    }

    #[tokio::test]
    async fn test_deposit_then_withdraw_round_trip() {
        let (engine, _, _) = engine();
        engine.register(1).await.unwrap();
        engine.deposit(1, dec!(75.25)).await.unwrap();
        let original = engine.quote(1).await.unwrap().balance;

        engine.deposit(1, dec!(13.37)).await.unwrap();
        engine.withdraw(1, dec!(13.37)).await.unwrap();

        assert_eq!(engine.quote(1).await.unwrap().balance, original);
    }

    #[tokio::test]
    async fn test_crypto_deposit_credits_one_to_one() {
        let (engine, _, audit) = engine();
        engine.register(1).await.unwrap();

        let receipt = engine
            .crypto_deposit(1, CryptoCurrency::Btc, dec!(0.75))
            .await
            .unwrap();
        assert_eq!(
            receipt.kind,
            OperationKind::CryptoDeposit(CryptoCurrency::Btc)
        );
        assert_eq!(receipt.current_balance, dec!(0.75));

        let rows = audit.query(1, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].kind,
            OperationKind::CryptoDeposit(CryptoCurrency::Btc)
        );
    }

    #[tokio::test]
    async fn test_history_newest_first_and_capped() {
        let (engine, _, _) = engine();
        engine.register(1).await.unwrap();

        for i in 1..=12 {
            engine.deposit(1, Decimal::from(i)).await.unwrap();
        }

        let history = engine.history(1, DEFAULT_HISTORY_LIMIT).await.unwrap();
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history[0].amount, dec!(12));
        assert_eq!(history[9].amount, dec!(3));
    }

    #[tokio::test]
    async fn test_history_empty_is_not_an_error() {
        let (engine, _, _) = engine();
        engine.register(1).await.unwrap();
        assert!(engine.history(1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_payment_method_roundtrip() {
        use crate::types::PaymentMethodKind;

        let (engine, ledger, _) = engine();
        engine.register(1).await.unwrap();

        let method = PaymentMethod::new(PaymentMethodKind::BankTransfer, "Itaú");
        engine.add_payment_method(1, method.clone()).await.unwrap();
        engine.add_payment_method(1, method.clone()).await.unwrap();

        let account = ledger.get(1).await.unwrap().unwrap();
        assert_eq!(account.payment_methods, vec![method]);
    }

    #[tokio::test]
    async fn test_concurrent_deposits_same_account() {
        let (engine, _, audit) = engine();
        engine.register(1).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let engine = engine.clone();
            handles.push(tokio::spawn(
                async move { engine.deposit(1, dec!(2)).await },
            ));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(engine.quote(1).await.unwrap().balance, dec!(100));
        assert_eq!(audit.count(1), 50);
    }

    #[tokio::test]
    async fn test_concurrent_operations_different_accounts() {
        let (engine, _, _) = engine();
        for id in 0..10 {
            engine.register(id).await.unwrap();
        }

        let mut handles = Vec::new();
        for id in 0..10 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.deposit(id, Decimal::from(id + 1)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for id in 0..10 {
            assert_eq!(
                engine.quote(id).await.unwrap().balance,
                Decimal::from(id + 1)
            );
        }
    }
}
