//! Error types for the ledger

use crate::types::AccountId;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Account identifier was never created
    #[error("account not found")]
    NotFound(AccountId),

    /// Withdrawal or transfer would drive the balance negative
    #[error("insufficient funds")]
    InsufficientFunds {
        /// Account that would be overdrawn
        account: AccountId,
        /// Balance observed under the lock
        balance: i64,
        /// Amount requested
        requested: i64,
    },

    /// Transfer source equals destination
    #[error("cannot transfer to the same account")]
    SameAccount(AccountId),

    /// Negative amount
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Credit would overflow the balance cell
    #[error("balance overflow on account {0}")]
    BalanceOverflow(AccountId),

    /// Caller cancelled the request before it entered a critical section
    #[error("operation cancelled")]
    Cancelled,

    /// Concurrency error (pipeline mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short label used in metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::InsufficientFunds { .. } => "insufficient_funds",
            Error::SameAccount(_) => "same_account",
            Error::InvalidAmount(_) => "invalid_amount",
            Error::BalanceOverflow(_) => "balance_overflow",
            Error::Cancelled => "cancelled",
            Error::Concurrency(_) => "concurrency",
            Error::Config(_) => "config",
            Error::Metrics(_) => "metrics",
            Error::Io(_) => "io",
        }
    }

    /// True for errors caused by the request itself rather than the system
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::InsufficientFunds { .. }
                | Error::SameAccount(_)
                | Error::InvalidAmount(_)
                | Error::BalanceOverflow(_)
        )
    }
}
