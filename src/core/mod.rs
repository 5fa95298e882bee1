//! Business logic: the transaction engine
//!
//! The engine owns all balance mutation and audit writing; everything above
//! it (conversation, transport) only reads state and renders results.

pub mod engine;

pub use engine::{Engine, DEFAULT_HISTORY_LIMIT};
