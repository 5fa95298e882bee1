//! Persistent store abstractions and the in-memory reference implementation
//!
//! The engine only depends on the [`LedgerStore`] and [`AuditLog`] traits;
//! `MemoryLedger` / `MemoryAudit` back the console transport and the test
//! suite.

pub mod memory;
pub mod traits;

pub use memory::{MemoryAudit, MemoryLedger};
pub use traits::{AuditLog, DeltaOutcome, LedgerStore};
