//! Conversation layer: typed intents and the per-session state machine
//!
//! The session layer sits between a chat transport and the engine. It owns
//! the multi-step prompting flow (pick operation, enter amount, confirm)
//! and translates validation errors into re-prompts instead of terminal
//! failures.

pub mod controller;
pub mod intent;

pub use controller::{Reply, SessionController, DEFAULT_SESSION_TIMEOUT};
pub use intent::{ChatEvent, Intent};
