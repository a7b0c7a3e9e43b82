//! Account store
//!
//! Maps identifiers to independently lockable balance cells.
//!
//! Two levels of synchronization:
//!
//! - the `DashMap` guards only the identifier → cell association
//! - each cell carries its own `RwLock` guarding the balance
//!
//! Cells are cloned out of the map (`Arc`) before their lock is taken, so a
//! map shard guard is never held while waiting on an account lock.

use crate::{
    sequence::AccountSequence,
    types::{Account, AccountId, AccountSnapshot},
    Error, Result,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Lock-guarded account cell
pub(crate) type AccountCell = Arc<RwLock<Account>>;

/// Append-only (by key) store of accounts
#[derive(Debug)]
pub struct AccountStore {
    accounts: DashMap<AccountId, AccountCell>,
    sequence: AccountSequence,
}

impl AccountStore {
    /// Create an empty store with the default sequence
    pub fn new() -> Self {
        Self::with_sequence(AccountSequence::default())
    }

    /// Create an empty store drawing ids from `sequence`
    pub fn with_sequence(sequence: AccountSequence) -> Self {
        Self {
            accounts: DashMap::new(),
            sequence,
        }
    }

    /// Allocate the next identifier and insert a zero-balance account
    pub fn create(&self) -> AccountId {
        let id = self.sequence.next();
        self.accounts
            .insert(id, Arc::new(RwLock::new(Account::open(id))));
        id
    }

    /// Copy the balance under a shared lock
    pub fn get(&self, id: AccountId) -> Result<AccountSnapshot> {
        let cell = self.cell(id)?;
        let account = cell.read();
        Ok(account.snapshot())
    }

    /// Resolve the cell for `id` without locking it
    pub(crate) fn cell(&self, id: AccountId) -> Result<AccountCell> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::NotFound(id))
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True if no account was ever created
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Snapshots of every account, sorted by id
    ///
    /// Each account is read under its own lock; the result is not a single
    /// atomic cut across accounts.
    pub fn snapshot_all(&self) -> Vec<AccountSnapshot> {
        let cells: Vec<AccountCell> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut snapshots: Vec<AccountSnapshot> =
            cells.iter().map(|cell| cell.read().snapshot()).collect();
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }

    /// Sum of all balances
    ///
    /// Only meaningful at quiescent points.
    pub fn total_balance(&self) -> i128 {
        self.snapshot_all()
            .iter()
            .map(|s| i128::from(s.balance))
            .sum()
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let store = AccountStore::new();
        let id = store.create();
        assert_eq!(id, AccountId::new(1));

        let snapshot = store.get(id).unwrap();
        assert_eq!(snapshot.id, id);
        assert_eq!(snapshot.balance, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_unknown() {
        let store = AccountStore::new();
        assert!(store.is_empty());

        let result = store.get(AccountId::new(42));
        assert!(matches!(result, Err(Error::NotFound(id)) if id == AccountId::new(42)));
    }

    #[test]
    fn test_injected_sequence() {
        let store = AccountStore::with_sequence(AccountSequence::starting_at(500));
        assert_eq!(store.create(), AccountId::new(500));
        assert_eq!(store.create(), AccountId::new(501));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = AccountStore::new();
        let id = store.create();
        let before = store.get(id).unwrap();

        store.cell(id).unwrap().write().balance = 25;

        assert_eq!(before.balance, 0);
        assert_eq!(store.get(id).unwrap().balance, 25);
    }

    #[test]
    fn test_snapshot_all_sorted() {
        let store = AccountStore::new();
        for _ in 0..5 {
            store.create();
        }
        store.cell(AccountId::new(3)).unwrap().write().balance = 10;

        let all = store.snapshot_all();
        let ids: Vec<u64> = all.iter().map(|s| s.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(store.total_balance(), 10);
    }

    #[test]
    fn test_concurrent_create() {
        let store = Arc::new(AccountStore::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        store.create();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 1000);
        assert!(store.get(AccountId::new(1000)).is_ok());
    }
}
