use clap::Parser;
use std::time::Duration;

use crate::session::DEFAULT_SESSION_TIMEOUT;
use crate::types::AccountId;

/// Conversational banking ledger over a console transport
#[derive(Parser, Debug)]
#[command(name = "chatbank")]
#[command(about = "Conversational banking ledger over a console transport", long_about = None)]
pub struct CliArgs {
    /// Account id to run the console session as
    #[arg(
        long = "account",
        value_name = "ID",
        default_value_t = 1,
        help = "Account id for this console session"
    )]
    pub account: AccountId,

    /// Maximum number of transactions shown by the history command
    #[arg(
        long = "history-limit",
        value_name = "COUNT",
        default_value_t = 10,
        help = "Maximum transactions shown by 'history' (newest first)"
    )]
    pub history_limit: usize,

    /// Seconds before an abandoned prompt expires back to idle
    #[arg(
        long = "session-timeout",
        value_name = "SECONDS",
        help = "Seconds before a pending prompt expires (default: 300)"
    )]
    pub session_timeout: Option<u64>,
}

impl CliArgs {
    /// Session timeout from CLI arguments, falling back to the default
    ///
    /// A zero value is treated as unset and falls back to the default,
    /// since a zero timeout would expire every prompt before the reply
    /// arrives.
    ///
    /// # Returns
    ///
    /// The pending-step timeout as a `Duration`.
    pub fn session_timeout(&self) -> Duration {
        match self.session_timeout {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_SESSION_TIMEOUT,
        }
    }
}
