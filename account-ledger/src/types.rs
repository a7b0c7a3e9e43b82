//! Core types for the ledger
//!
//! Everything handed out of the ledger is a copy. Callers never hold a live
//! reference into an account cell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier
///
/// Assigned from a monotonically increasing sequence and never reused. The
/// derived `Ord` is the total lock order used by transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u64);

impl AccountId {
    /// Create new account ID
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Mutable account state, only ever reachable through its lock
#[derive(Debug)]
pub(crate) struct Account {
    pub(crate) id: AccountId,
    pub(crate) balance: i64,
}

impl Account {
    pub(crate) fn open(id: AccountId) -> Self {
        Self { id, balance: 0 }
    }

    pub(crate) fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            balance: self.balance,
        }
    }
}

/// Point-in-time copy of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account ID
    #[serde(rename = "ID")]
    pub id: AccountId,

    /// Balance in integer units
    #[serde(rename = "Balance")]
    pub balance: i64,
}

/// Immutable record of one successful transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    /// Debited account
    #[serde(rename = "From")]
    pub from: AccountId,

    /// Credited account
    #[serde(rename = "To")]
    pub to: AccountId,

    /// Amount moved
    #[serde(rename = "Amount")]
    pub amount: i64,

    /// When the transfer committed
    #[serde(rename = "When")]
    pub when: DateTime<Utc>,
}

impl TransactionLogEntry {
    /// Stamp a new entry with the current time
    pub fn now(from: AccountId, to: AccountId, amount: i64) -> Self {
        Self {
            from,
            to,
            amount,
            when: Utc::now(),
        }
    }
}
