//! Account identifier sequence

use crate::types::AccountId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic identifier generator owned by the account store
#[derive(Debug)]
pub struct AccountSequence {
    next: AtomicU64,
}

impl AccountSequence {
    /// Sequence whose first identifier is `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Hand out the next identifier
    pub fn next(&self) -> AccountId {
        AccountId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Identifier the next call to [`next`](Self::next) would return
    pub fn peek(&self) -> AccountId {
        AccountId::new(self.next.load(Ordering::Relaxed))
    }
}

impl Default for AccountSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_default_starts_at_one() {
        let seq = AccountSequence::default();
        assert_eq!(seq.next(), AccountId::new(1));
        assert_eq!(seq.next(), AccountId::new(2));
        assert_eq!(seq.peek(), AccountId::new(3));
    }

    #[test]
    fn test_deterministic_start() {
        let seq = AccountSequence::starting_at(1000);
        assert_eq!(seq.next().get(), 1000);
    }

    #[test]
    fn test_unique_across_threads() {
        let seq = Arc::new(AccountSequence::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = seq.clone();
                std::thread::spawn(move || (0..1000).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 8000);
    }
}
