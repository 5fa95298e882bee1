//! Per-session conversation state machine
//!
//! The controller drives the "enter amount → confirm → commit" flow for
//! each chat session. All multi-step state lives here; the engine is
//! stateless between calls and is only invoked with a fully-resolved
//! account id and a parsed amount.
//!
//! # State machine
//!
//! ```text
//! Idle ──start op──▶ AwaitingAmount ──valid amount──▶ AwaitingConfirmation
//!   ▲                     │  ▲                              │
//!   │                     └──┘ invalid / insufficient       │ confirm → commit
//!   └──────── cancel, timeout, commit, failure ◀────────────┘
//! ```
//!
//! Payment-method registration uses a parallel `AwaitingMethodLabel` step
//! for the free-form label (bank name, PayPal email).
//!
//! Pending state is bounded: any step older than the configured timeout is
//! dropped back to `Idle` before the next event is processed, so an
//! abandoned prompt cannot leak indefinitely.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use crate::core::{Engine, DEFAULT_HISTORY_LIMIT};
use crate::session::intent::{ChatEvent, Intent};
use crate::store::{AuditLog, LedgerStore};
use crate::types::{
    Account, AccountId, LedgerError, OperationKind, PaymentMethod, PaymentMethodKind, Quote,
    Receipt,
};

/// Default expiry for a pending conversation step
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);

/// Conversation state for one session
#[derive(Debug, Clone, PartialEq)]
enum SessionState {
    /// No operation pending
    Idle,
    /// An operation was selected; waiting for the amount
    AwaitingAmount { kind: OperationKind },
    /// Amount entered; waiting for confirm or cancel
    AwaitingConfirmation { kind: OperationKind, amount: Decimal },
    /// Waiting for the free-form payment-method label
    AwaitingMethodLabel { kind: PaymentMethodKind },
}

#[derive(Debug)]
struct SessionEntry {
    state: SessionState,
    touched: Instant,
}

/// What the transport should render next
///
/// The controller never formats messages; it hands the transport structured
/// replies and lets it own wording, markup, and buttons.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Account bootstrapped; show the menu
    Welcome(Account),
    /// Current balance and last transaction
    Balance(Quote),
    /// Ask for an amount; withdrawals include the balance for the prompt
    PromptAmount {
        kind: OperationKind,
        balance: Option<Decimal>,
    },
    /// Ask for the free-form method label
    PromptMethodLabel(PaymentMethodKind),
    /// Ask the user to confirm the pending operation
    ConfirmRequest {
        kind: OperationKind,
        amount: Decimal,
        balance: Decimal,
    },
    /// Operation committed
    Committed(Receipt),
    /// Recent transactions, newest first
    History(Vec<Receipt>),
    /// Payment method registered
    MethodAdded(PaymentMethod),
    /// Pending operation cancelled
    Cancelled,
    /// Amount was unparseable or not positive; re-prompt
    InvalidAmount,
    /// Withdrawal exceeds the balance; re-prompt showing it
    InsufficientFunds { balance: Decimal },
    /// Operation failed (not found / commit failed / store unavailable)
    Failed(LedgerError),
    /// Input made no sense in the current state
    Unrecognized,
}

/// Drives one conversation per account id against the engine
///
/// Safe for concurrent sessions: per-session state is keyed by account id
/// in a concurrent map, and the engine serializes balance changes per
/// account through the store contract.
pub struct SessionController<L, A> {
    engine: Engine<L, A>,
    sessions: DashMap<AccountId, SessionEntry>,
    timeout: Duration,
    history_limit: usize,
}

impl<L: LedgerStore, A: AuditLog> SessionController<L, A> {
    /// Create a controller with the default timeout and history limit
    pub fn new(engine: Engine<L, A>) -> Self {
        Self::with_config(engine, DEFAULT_SESSION_TIMEOUT, DEFAULT_HISTORY_LIMIT)
    }

    /// Create a controller with a custom pending-step timeout
    pub fn with_timeout(engine: Engine<L, A>, timeout: Duration) -> Self {
        Self::with_config(engine, timeout, DEFAULT_HISTORY_LIMIT)
    }

    /// Create a fully configured controller
    pub fn with_config(engine: Engine<L, A>, timeout: Duration, history_limit: usize) -> Self {
        SessionController {
            engine,
            sessions: DashMap::new(),
            timeout,
            history_limit,
        }
    }

    /// Handle one inbound event for the session and produce a reply
    pub async fn handle(&self, account: AccountId, event: ChatEvent) -> Reply {
        let state = self.take_state(account);

        let (next, reply) = match event {
            ChatEvent::Intent(intent) => self.on_intent(account, intent).await,
            ChatEvent::Text(text) => self.on_text(account, state, text).await,
        };

        self.put_state(account, next);
        reply
    }

    /// Current pending state, with lazy timeout expiry
    fn take_state(&self, account: AccountId) -> SessionState {
        match self.sessions.get(&account) {
            Some(entry) if entry.touched.elapsed() > self.timeout => {
                debug!(account, "pending conversation step expired");
                SessionState::Idle
            }
            Some(entry) => entry.state.clone(),
            None => SessionState::Idle,
        }
    }

    fn put_state(&self, account: AccountId, state: SessionState) {
        // Idle sessions hold no entry, so the map only grows with steps
        // actually in flight.
        if state == SessionState::Idle {
            self.sessions.remove(&account);
            return;
        }
        self.sessions.insert(
            account,
            SessionEntry {
                state,
                touched: Instant::now(),
            },
        );
    }

    /// Number of sessions with a pending conversation step
    pub fn pending_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Intents replace whatever step was pending
    ///
    /// Selecting a new operation (or checking the balance) while an amount
    /// prompt is outstanding abandons that prompt rather than stacking
    /// steps.
    async fn on_intent(&self, account: AccountId, intent: Intent) -> (SessionState, Reply) {
        match intent {
            Intent::Start => match self.engine.register(account).await {
                Ok(created) => (SessionState::Idle, Reply::Welcome(created)),
                Err(err) => (SessionState::Idle, Reply::Failed(err)),
            },
            Intent::CheckBalance => match self.engine.quote(account).await {
                Ok(quote) => (SessionState::Idle, Reply::Balance(quote)),
                Err(err) => (SessionState::Idle, Reply::Failed(err)),
            },
            Intent::StartDeposit => (
                SessionState::AwaitingAmount {
                    kind: OperationKind::Deposit,
                },
                Reply::PromptAmount {
                    kind: OperationKind::Deposit,
                    balance: None,
                },
            ),
            Intent::StartCryptoDeposit(currency) => {
                let kind = OperationKind::CryptoDeposit(currency);
                (
                    SessionState::AwaitingAmount { kind },
                    Reply::PromptAmount {
                        kind,
                        balance: None,
                    },
                )
            }
            Intent::StartWithdrawal => match self.engine.quote(account).await {
                // The withdrawal prompt shows the balance up front.
                Ok(quote) => (
                    SessionState::AwaitingAmount {
                        kind: OperationKind::Withdrawal,
                    },
                    Reply::PromptAmount {
                        kind: OperationKind::Withdrawal,
                        balance: Some(quote.balance),
                    },
                ),
                Err(err) => (SessionState::Idle, Reply::Failed(err)),
            },
            Intent::AddPaymentMethod(kind) => (
                SessionState::AwaitingMethodLabel { kind },
                Reply::PromptMethodLabel(kind),
            ),
            Intent::History => match self.engine.history(account, self.history_limit).await {
                Ok(receipts) => (SessionState::Idle, Reply::History(receipts)),
                Err(err) => (SessionState::Idle, Reply::Failed(err)),
            },
            Intent::Confirm => self.on_confirm(account).await,
            Intent::Cancel => (SessionState::Idle, Reply::Cancelled),
        }
    }

    /// Free-form text is only meaningful while awaiting an amount or label
    async fn on_text(
        &self,
        account: AccountId,
        state: SessionState,
        text: String,
    ) -> (SessionState, Reply) {
        match state {
            SessionState::AwaitingAmount { kind } => self.on_amount(account, kind, &text).await,
            SessionState::AwaitingMethodLabel { kind } => {
                let label = text.trim();
                if label.is_empty() {
                    return (
                        SessionState::AwaitingMethodLabel { kind },
                        Reply::PromptMethodLabel(kind),
                    );
                }
                let method = PaymentMethod::new(kind, label);
                match self.engine.add_payment_method(account, method.clone()).await {
                    Ok(()) => (SessionState::Idle, Reply::MethodAdded(method)),
                    Err(err) => (SessionState::Idle, Reply::Failed(err)),
                }
            }
            other => (other, Reply::Unrecognized),
        }
    }

    /// Parse and pre-validate an entered amount, then ask for confirmation
    ///
    /// Validation here only drives prompting; the engine re-validates
    /// against a re-read balance at commit time.
    async fn on_amount(
        &self,
        account: AccountId,
        kind: OperationKind,
        text: &str,
    ) -> (SessionState, Reply) {
        let stay = SessionState::AwaitingAmount { kind };

        let amount = match text.trim().parse::<Decimal>() {
            Ok(amount) if amount > Decimal::ZERO => amount,
            _ => return (stay, Reply::InvalidAmount),
        };

        let quote = match self.engine.quote(account).await {
            Ok(quote) => quote,
            Err(err) => return (SessionState::Idle, Reply::Failed(err)),
        };

        if kind.is_debit() && amount > quote.balance {
            return (
                stay,
                Reply::InsufficientFunds {
                    balance: quote.balance,
                },
            );
        }

        (
            SessionState::AwaitingConfirmation { kind, amount },
            Reply::ConfirmRequest {
                kind,
                amount,
                balance: quote.balance,
            },
        )
    }

    /// Commit the pending operation through the engine
    async fn on_confirm(&self, account: AccountId) -> (SessionState, Reply) {
        let (kind, amount) = match self.take_state(account) {
            SessionState::AwaitingConfirmation { kind, amount } => (kind, amount),
            other => return (other, Reply::Unrecognized),
        };

        let result = match kind {
            OperationKind::Deposit => self.engine.deposit(account, amount).await,
            OperationKind::Withdrawal => self.engine.withdraw(account, amount).await,
            OperationKind::CryptoDeposit(currency) => {
                self.engine.crypto_deposit(account, currency, amount).await
            }
        };

        match result {
            Ok(receipt) => (SessionState::Idle, Reply::Committed(receipt)),
            // The balance moved between the prompt and the confirm;
            // re-prompt for a new amount with the fresh balance.
            Err(LedgerError::InsufficientFunds { balance, .. }) => (
                SessionState::AwaitingAmount { kind },
                Reply::InsufficientFunds { balance },
            ),
            Err(err) => (SessionState::Idle, Reply::Failed(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryAudit, MemoryLedger};
    use crate::types::CryptoCurrency;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn controller() -> SessionController<MemoryLedger, MemoryAudit> {
        let engine = Engine::new(Arc::new(MemoryLedger::new()), Arc::new(MemoryAudit::new()));
        SessionController::new(engine)
    }

    fn intent(i: Intent) -> ChatEvent {
        ChatEvent::Intent(i)
    }

    fn text(s: &str) -> ChatEvent {
        ChatEvent::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_start_bootstraps_account() {
        let controller = controller();

        let reply = controller.handle(1, intent(Intent::Start)).await;
        match reply {
            Reply::Welcome(account) => {
                assert_eq!(account.id, 1);
                assert_eq!(account.balance, dec!(0));
            }
            other => panic!("expected Welcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_full_deposit_flow() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;

        let reply = controller.handle(1, intent(Intent::StartDeposit)).await;
        assert_eq!(
            reply,
            Reply::PromptAmount {
                kind: OperationKind::Deposit,
                balance: None
            }
        );

        let reply = controller.handle(1, text("100.00")).await;
        assert_eq!(
            reply,
            Reply::ConfirmRequest {
                kind: OperationKind::Deposit,
                amount: dec!(100.00),
                balance: dec!(0),
            }
        );

        let reply = controller.handle(1, intent(Intent::Confirm)).await;
        match reply {
            Reply::Committed(receipt) => {
                assert_eq!(receipt.current_balance, dec!(100.00));
            }
            other => panic!("expected Committed, got {other:?}"),
        }

        // Back to Idle: a second confirm has nothing to commit.
        let reply = controller.handle(1, intent(Intent::Confirm)).await;
        assert_eq!(reply, Reply::Unrecognized);
    }

    #[tokio::test]
    async fn test_invalid_amount_reprompts() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;
        controller.handle(1, intent(Intent::StartDeposit)).await;

        for entry in ["abc", "0", "-5", ""] {
            assert_eq!(controller.handle(1, text(entry)).await, Reply::InvalidAmount);
        }

        // Still awaiting the amount after bad input.
        let reply = controller.handle(1, text("10")).await;
        assert!(matches!(reply, Reply::ConfirmRequest { .. }));
    }

    #[tokio::test]
    async fn test_withdrawal_insufficient_funds_reprompts_with_balance() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;
        controller.handle(1, intent(Intent::StartDeposit)).await;
        controller.handle(1, text("100")).await;
        controller.handle(1, intent(Intent::Confirm)).await;

        let reply = controller.handle(1, intent(Intent::StartWithdrawal)).await;
        assert_eq!(
            reply,
            Reply::PromptAmount {
                kind: OperationKind::Withdrawal,
                balance: Some(dec!(100)),
            }
        );

        let reply = controller.handle(1, text("150")).await;
        assert_eq!(
            reply,
            Reply::InsufficientFunds {
                balance: dec!(100)
            }
        );

        // Retry with a valid amount completes the flow.
        controller.handle(1, text("40")).await;
        let reply = controller.handle(1, intent(Intent::Confirm)).await;
        match reply {
            Reply::Committed(receipt) => assert_eq!(receipt.current_balance, dec!(60)),
            other => panic!("expected Committed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_drops_pending_operation() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;
        controller.handle(1, intent(Intent::StartDeposit)).await;
        controller.handle(1, text("50")).await;

        assert_eq!(controller.handle(1, intent(Intent::Cancel)).await, Reply::Cancelled);
        assert_eq!(controller.handle(1, intent(Intent::Confirm)).await, Reply::Unrecognized);
    }

    #[tokio::test]
    async fn test_finished_sessions_hold_no_entries() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;
        assert_eq!(controller.pending_sessions(), 0);

        controller.handle(1, intent(Intent::StartDeposit)).await;
        assert_eq!(controller.pending_sessions(), 1);

        // Cancelling drops the entry instead of parking an Idle one.
        controller.handle(1, intent(Intent::Cancel)).await;
        assert_eq!(controller.pending_sessions(), 0);

        controller.handle(1, intent(Intent::StartDeposit)).await;
        controller.handle(1, text("25")).await;
        controller.handle(1, intent(Intent::Confirm)).await;
        assert_eq!(controller.pending_sessions(), 0);
    }

    #[tokio::test]
    async fn test_crypto_deposit_flow() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;

        let kind = OperationKind::CryptoDeposit(CryptoCurrency::Eth);
        controller
            .handle(1, intent(Intent::StartCryptoDeposit(CryptoCurrency::Eth)))
            .await;
        let reply = controller.handle(1, text("2.5")).await;
        assert_eq!(
            reply,
            Reply::ConfirmRequest {
                kind,
                amount: dec!(2.5),
                balance: dec!(0),
            }
        );

        let reply = controller.handle(1, intent(Intent::Confirm)).await;
        match reply {
            Reply::Committed(receipt) => {
                assert_eq!(receipt.kind, kind);
                assert_eq!(receipt.current_balance, dec!(2.5));
            }
            other => panic!("expected Committed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_payment_method_registration_flow() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;

        let reply = controller
            .handle(1, intent(Intent::AddPaymentMethod(PaymentMethodKind::Paypal)))
            .await;
        assert_eq!(reply, Reply::PromptMethodLabel(PaymentMethodKind::Paypal));

        let reply = controller.handle(1, text("user@example.com")).await;
        assert_eq!(
            reply,
            Reply::MethodAdded(PaymentMethod::new(
                PaymentMethodKind::Paypal,
                "user@example.com"
            ))
        );
    }

    #[tokio::test]
    async fn test_blank_method_label_reprompts() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;
        controller
            .handle(1, intent(Intent::AddPaymentMethod(PaymentMethodKind::BankTransfer)))
            .await;

        let reply = controller.handle(1, text("   ")).await;
        assert_eq!(reply, Reply::PromptMethodLabel(PaymentMethodKind::BankTransfer));
    }

    #[tokio::test]
    async fn test_stale_pending_step_expires() {
        let engine = Engine::new(Arc::new(MemoryLedger::new()), Arc::new(MemoryAudit::new()));
        let controller = SessionController::with_timeout(engine, Duration::ZERO);
        controller.handle(1, intent(Intent::Start)).await;

        controller.handle(1, intent(Intent::StartDeposit)).await;
        // The pending amount prompt is already stale; the text falls
        // through to Idle handling.
        let reply = controller.handle(1, text("100")).await;
        assert_eq!(reply, Reply::Unrecognized);
    }

    #[tokio::test]
    async fn test_new_intent_replaces_pending_step() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;
        controller.handle(1, intent(Intent::StartDeposit)).await;
        controller.handle(1, text("50")).await;

        // Checking the balance abandons the pending confirmation.
        let reply = controller.handle(1, intent(Intent::CheckBalance)).await;
        assert!(matches!(reply, Reply::Balance(_)));
        assert_eq!(controller.handle(1, intent(Intent::Confirm)).await, Reply::Unrecognized);
    }

    #[tokio::test]
    async fn test_balance_for_unknown_account_fails() {
        let controller = controller();

        let reply = controller.handle(9, intent(Intent::CheckBalance)).await;
        assert_eq!(reply, Reply::Failed(LedgerError::account_not_found(9)));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;
        controller.handle(2, intent(Intent::Start)).await;

        controller.handle(1, intent(Intent::StartDeposit)).await;
        // Session 2 has no pending amount prompt.
        assert_eq!(controller.handle(2, text("10")).await, Reply::Unrecognized);

        // Session 1 still does.
        assert!(matches!(
            controller.handle(1, text("10")).await,
            Reply::ConfirmRequest { .. }
        ));
    }

    #[tokio::test]
    async fn test_history_empty_for_new_account() {
        let controller = controller();
        controller.handle(1, intent(Intent::Start)).await;

        let reply = controller.handle(1, intent(Intent::History)).await;
        assert_eq!(reply, Reply::History(Vec::new()));
    }
}
