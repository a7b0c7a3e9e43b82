//! Account Ledger
//!
//! In-memory account ledger with per-account locking and an asynchronous,
//! batched transaction log.
//!
//! # Architecture
//!
//! - **Account Store**: concurrent map of account id → lock-guarded balance
//! - **Ledger Operations**: create/get/deposit/withdraw/transfer
//! - **Lock Ordering**: transfers lock the lower id first
//! - **Log Pipeline**: single consumer task, flushes on size or interval
//!
//! # Invariants
//!
//! - Balances never go negative
//! - Conservation: a transfer leaves `from + to` unchanged
//! - Account ids are never reused
//! - Append-only: log entries never modified or removed

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod sequence;
pub mod store;
pub mod txlog;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{Ledger, ScopedLedger};
pub use types::{AccountId, AccountSnapshot, TransactionLogEntry};
