//! Chatbank console transport
//!
//! Interactive console session against the in-memory ledger. Each line of
//! input is mapped to a chat event at this boundary; the conversation layer
//! and the engine never see raw command strings.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --account 1
//! cargo run -- --history-limit 5 --session-timeout 60
//! ```
//!
//! # Commands
//!
//! - `start` - bootstrap the account and show the menu
//! - `balance` - show the balance and last transaction
//! - `deposit` / `withdraw` - begin a flow (amount prompt follows)
//! - `crypto btc|eth|usdt` - begin a crypto deposit flow
//! - `method bank|paypal|crypto` - register a payment method
//! - `history` - recent transactions, newest first
//! - `confirm` / `cancel` - resolve the pending operation
//! - `quit` - exit
//!
//! Anything else is treated as free-form text (an amount or a method
//! label, depending on the pending prompt).

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use chatbank::session::{ChatEvent, Intent, Reply, SessionController};
use chatbank::store::{MemoryAudit, MemoryLedger};
use chatbank::types::{CryptoCurrency, OperationKind, PaymentMethodKind};
use chatbank::{cli, Engine};

/// Map one console line to a chat event
///
/// Recognized commands become intents; everything else passes through as
/// free-form text for the pending prompt. Returns `None` on `quit`/`exit`.
fn parse_line(line: &str) -> Option<ChatEvent> {
    let trimmed = line.trim();
    let lowered = trimmed.to_ascii_lowercase();

    let intent = match lowered.as_str() {
        "quit" | "exit" => return None,
        "start" => Intent::Start,
        "balance" => Intent::CheckBalance,
        "deposit" => Intent::StartDeposit,
        "withdraw" => Intent::StartWithdrawal,
        "history" => Intent::History,
        "confirm" | "yes" => Intent::Confirm,
        "cancel" | "no" => Intent::Cancel,
        "crypto btc" => Intent::StartCryptoDeposit(CryptoCurrency::Btc),
        "crypto eth" => Intent::StartCryptoDeposit(CryptoCurrency::Eth),
        "crypto usdt" => Intent::StartCryptoDeposit(CryptoCurrency::Usdt),
        "method bank" => Intent::AddPaymentMethod(PaymentMethodKind::BankTransfer),
        "method paypal" => Intent::AddPaymentMethod(PaymentMethodKind::Paypal),
        "method crypto" => Intent::AddPaymentMethod(PaymentMethodKind::Crypto),
        _ => return Some(ChatEvent::Text(trimmed.to_string())),
    };
    Some(ChatEvent::Intent(intent))
}

/// Render a structured reply as console output
fn render(reply: &Reply) -> String {
    match reply {
        Reply::Welcome(account) => format!(
            "Welcome! Account {} is ready. Balance: ${}",
            account.id, account.balance
        ),
        Reply::Balance(quote) => match &quote.last_transaction {
            Some(last) => format!(
                "Balance: ${}. Last transaction: {} of ${} at {}",
                quote.balance, last.kind, last.amount, last.timestamp
            ),
            None => format!("Balance: ${}. No transactions yet.", quote.balance),
        },
        Reply::PromptAmount { kind, balance } => match balance {
            Some(balance) => format!(
                "Your balance is ${balance}. Enter the amount to {}:",
                verb(*kind)
            ),
            None => format!("Enter the amount to {}:", verb(*kind)),
        },
        Reply::PromptMethodLabel(kind) => match kind {
            PaymentMethodKind::BankTransfer => "Enter the bank name:".to_string(),
            PaymentMethodKind::Paypal => "Enter the PayPal email:".to_string(),
            PaymentMethodKind::Crypto => "Enter the wallet address:".to_string(),
        },
        Reply::ConfirmRequest { kind, amount, .. } => {
            format!("Confirm {} of ${amount}? (confirm/cancel)", kind)
        }
        Reply::Committed(receipt) => format!(
            "Done: {} of ${}. Balance: ${} -> ${}",
            receipt.kind, receipt.amount, receipt.previous_balance, receipt.current_balance
        ),
        Reply::History(receipts) if receipts.is_empty() => "No transactions yet.".to_string(),
        Reply::History(receipts) => {
            let mut out = String::from("Recent transactions (newest first):");
            for receipt in receipts {
                out.push_str(&format!(
                    "\n  {}  {}  ${}  (balance ${})",
                    receipt.timestamp, receipt.kind, receipt.amount, receipt.current_balance
                ));
            }
            out
        }
        Reply::MethodAdded(method) => {
            format!("Added {} payment method '{}'.", method.kind, method.label)
        }
        Reply::Cancelled => "Cancelled.".to_string(),
        Reply::InvalidAmount => {
            "That doesn't look like a valid amount. Enter a number greater than zero:".to_string()
        }
        Reply::InsufficientFunds { balance } => format!(
            "Insufficient funds: your balance is ${balance}. Enter a smaller amount:"
        ),
        Reply::Failed(err) => format!("Sorry, that didn't work: {err}"),
        Reply::Unrecognized => {
            "I didn't understand that. Try: start, balance, deposit, withdraw, history, \
             crypto btc|eth|usdt, method bank|paypal|crypto, confirm, cancel, quit."
                .to_string()
        }
    }
}

fn verb(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Deposit | OperationKind::CryptoDeposit(_) => "deposit",
        OperationKind::Withdrawal => "withdraw",
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = cli::parse_args();
    let engine = Engine::new(Arc::new(MemoryLedger::new()), Arc::new(MemoryAudit::new()));
    let controller = SessionController::with_config(
        engine,
        args.session_timeout(),
        args.history_limit,
    );

    tracing::info!(account = args.account, "console session starting");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Bootstrap the session before the first prompt.
    let reply = controller
        .handle(args.account, ChatEvent::Intent(Intent::Start))
        .await;
    stdout
        .write_all(format!("{}\n> ", render(&reply)).as_bytes())
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let Some(event) = parse_line(&line) else {
            break;
        };
        let reply = controller.handle(args.account, event).await;
        stdout
            .write_all(format!("{}\n> ", render(&reply)).as_bytes())
            .await?;
        stdout.flush().await?;
    }

    tracing::info!(account = args.account, "console session ended");
    Ok(())
}
