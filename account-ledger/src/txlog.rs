//! Append-only transaction log
//!
//! Written only by the pipeline consumer, read by anyone. Entries are never
//! mutated or removed once appended.

use crate::types::TransactionLogEntry;
use parking_lot::RwLock;

/// Ordered, growable log of transfer records
#[derive(Debug, Default)]
pub struct TransactionLog {
    entries: RwLock<Vec<TransactionLogEntry>>,
}

impl TransactionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch contiguously, preserving its order
    pub fn append_batch(&self, batch: &mut Vec<TransactionLogEntry>) {
        if batch.is_empty() {
            return;
        }
        self.entries.write().append(batch);
    }

    /// Copy of every flushed entry
    pub fn snapshot(&self) -> Vec<TransactionLogEntry> {
        self.entries.read().clone()
    }

    /// Number of flushed entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing was flushed yet
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountId;

    fn entry(amount: i64) -> TransactionLogEntry {
        TransactionLogEntry::now(AccountId::new(1), AccountId::new(2), amount)
    }

    #[test]
    fn test_append_keeps_batch_order() {
        let log = TransactionLog::new();
        let mut first = vec![entry(1), entry(2)];
        let mut second = vec![entry(3)];

        log.append_batch(&mut first);
        log.append_batch(&mut second);

        assert!(first.is_empty());
        let amounts: Vec<i64> = log.snapshot().iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let log = TransactionLog::new();
        log.append_batch(&mut Vec::new());
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
    }
}
