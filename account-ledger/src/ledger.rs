//! Ledger operations
//!
//! Ties the account store and the transaction log pipeline together into
//! create/get/deposit/withdraw/transfer.
//!
//! # Locking
//!
//! - Single-account operations take that account's exclusive lock once and
//!   validate and commit under it.
//! - Transfers lock the lower account id first, then the higher one. All
//!   transfers share this order, so no two of them can wait on each other in
//!   a cycle.
//! - Log entries are enqueued after both locks are released.
//!
//! # Example
//!
//! ```no_run
//! use account_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> account_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!
//!     let alice = ledger.create_account();
//!     let bob = ledger.create_account();
//!     ledger.deposit(alice, 100)?;
//!     ledger.transfer(alice, bob, 40).await?;
//!
//!     ledger.shutdown().await?;
//!     Ok(())
//! }
//! ```

use crate::{
    metrics::Metrics,
    pipeline::{spawn_log_pipeline, PipelineHandle},
    store::{AccountCell, AccountStore},
    txlog::TransactionLog,
    types::{Account, AccountId, AccountSnapshot, TransactionLogEntry},
    Config, Error, Result,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Accounts and their balance cells
    store: AccountStore,

    /// Flushed transfer records
    log: Arc<TransactionLog>,

    /// Producer side of the log pipeline
    pipeline: PipelineHandle,

    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open an empty ledger
    ///
    /// Spawns the log pipeline, so it must be called from within a Tokio
    /// runtime.
    pub fn open(config: Config) -> Result<Self> {
        Self::with_store(config, AccountStore::new())
    }

    /// Open a ledger over a caller-supplied store
    pub fn with_store(config: Config, store: AccountStore) -> Result<Self> {
        config.validate()?;

        let metrics = Metrics::new()?;
        let log = Arc::new(TransactionLog::new());
        let pipeline = spawn_log_pipeline(log.clone(), &config.pipeline, metrics.clone());

        tracing::info!(
            batch_size = config.pipeline.max_batch_size,
            flush_interval_ms = config.pipeline.flush_interval_ms,
            queue_capacity = config.pipeline.queue_capacity,
            "Ledger opened"
        );

        Ok(Self {
            store,
            log,
            pipeline,
            metrics,
            config,
        })
    }

    /// View of this ledger whose operations honour `cancel`
    pub fn scoped<'a>(&'a self, cancel: &'a CancellationToken) -> ScopedLedger<'a> {
        ScopedLedger {
            ledger: self,
            cancel,
        }
    }

    /// Open a zero-balance account
    pub fn create_account(&self) -> AccountId {
        let id = self.store.create();
        self.metrics.record_account_created();
        id
    }

    /// Snapshot of one account
    pub fn get_account(&self, id: AccountId) -> Result<AccountSnapshot> {
        self.store.get(id)
    }

    /// Credit `amount` to `id`
    ///
    /// Negative amounts are rejected; zero is accepted and changes nothing.
    pub fn deposit(&self, id: AccountId, amount: i64) -> Result<()> {
        let result = self.deposit_inner(None, id, amount);
        self.observe("deposit", result)
    }

    /// Debit `amount` from `id` if the balance covers it
    pub fn withdraw(&self, id: AccountId, amount: i64) -> Result<()> {
        let result = self.withdraw_inner(None, id, amount);
        self.observe("withdraw", result)
    }

    /// Move `amount` from `from` to `to` and log the transfer
    ///
    /// Waits for mailbox capacity when the log pipeline is saturated. Losing
    /// the log entry never fails a committed transfer. Dropping this future
    /// while it waits keeps the balance change and counts the entry as
    /// dropped.
    pub async fn transfer(&self, from: AccountId, to: AccountId, amount: i64) -> Result<()> {
        let result = self.transfer_inner(None, from, to, amount).await;
        self.observe("transfer", result)
    }

    /// Copy of the flushed transaction log
    pub fn transactions(&self) -> Vec<TransactionLogEntry> {
        self.log.snapshot()
    }

    /// Flush pending log entries now
    pub async fn flush_log(&self) -> Result<()> {
        self.pipeline.flush().await
    }

    /// Flush pending log entries and stop the pipeline
    ///
    /// Balance operations keep working afterwards; transfers then drop their
    /// log entries.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down transaction log pipeline");
        self.pipeline.shutdown().await
    }

    /// True while the log pipeline accepts entries
    pub fn log_pipeline_running(&self) -> bool {
        !self.pipeline.is_closed()
    }

    /// Snapshots of every account, sorted by id
    pub fn accounts(&self) -> Vec<AccountSnapshot> {
        self.store.snapshot_all()
    }

    /// Sum of all balances (quiescent points only)
    pub fn total_balance(&self) -> i128 {
        self.store.total_balance()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn deposit_inner(
        &self,
        cancel: Option<&CancellationToken>,
        id: AccountId,
        amount: i64,
    ) -> Result<()> {
        ensure_non_negative(amount)?;
        let cell = self.store.cell(id)?;
        ensure_not_cancelled(cancel)?;

        let mut account = cell.write();
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow(id))?;
        Ok(())
    }

    fn withdraw_inner(
        &self,
        cancel: Option<&CancellationToken>,
        id: AccountId,
        amount: i64,
    ) -> Result<()> {
        ensure_non_negative(amount)?;
        let cell = self.store.cell(id)?;
        ensure_not_cancelled(cancel)?;

        let mut account = cell.write();
        if account.balance < amount {
            return Err(Error::InsufficientFunds {
                account: id,
                balance: account.balance,
                requested: amount,
            });
        }
        account.balance -= amount;
        Ok(())
    }

    async fn transfer_inner(
        &self,
        cancel: Option<&CancellationToken>,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<()> {
        if from == to {
            return Err(Error::SameAccount(from));
        }
        ensure_non_negative(amount)?;

        let from_cell = self.store.cell(from)?;
        let to_cell = self.store.cell(to)?;
        ensure_not_cancelled(cancel)?;

        apply_transfer((from, &from_cell), (to, &to_cell), amount)?;

        self.enqueue(TransactionLogEntry::now(from, to, amount)).await;
        Ok(())
    }

    async fn enqueue(&self, entry: TransactionLogEntry) {
        let (from, to, amount) = (entry.from, entry.to, entry.amount);
        let mut guard = EnqueueGuard {
            metrics: &self.metrics,
            from,
            to,
            amount,
            armed: true,
        };

        let result = self.pipeline.record(entry).await;
        guard.armed = false;

        match result {
            Ok(()) => self.metrics.record_log_enqueued(),
            Err(e) => {
                self.metrics.record_log_dropped();
                tracing::warn!(%from, %to, amount, error = %e, "Transfer log entry dropped");
            }
        }
    }

    fn observe<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.metrics.record_operation(operation, "ok"),
            Err(e) => self.metrics.record_operation(operation, e.kind()),
        }
        result
    }
}

/// Ledger operations bound to a cancellation token
///
/// A cancelled token aborts an operation before it takes any account lock.
/// An operation already inside its critical section completes.
#[derive(Debug, Clone, Copy)]
pub struct ScopedLedger<'a> {
    ledger: &'a Ledger,
    cancel: &'a CancellationToken,
}

impl ScopedLedger<'_> {
    /// See [`Ledger::create_account`]
    pub fn create_account(&self) -> Result<AccountId> {
        ensure_not_cancelled(Some(self.cancel))?;
        Ok(self.ledger.create_account())
    }

    /// See [`Ledger::get_account`]
    pub fn get_account(&self, id: AccountId) -> Result<AccountSnapshot> {
        ensure_not_cancelled(Some(self.cancel))?;
        self.ledger.get_account(id)
    }

    /// See [`Ledger::deposit`]
    pub fn deposit(&self, id: AccountId, amount: i64) -> Result<()> {
        let result = self.ledger.deposit_inner(Some(self.cancel), id, amount);
        self.ledger.observe("deposit", result)
    }

    /// See [`Ledger::withdraw`]
    pub fn withdraw(&self, id: AccountId, amount: i64) -> Result<()> {
        let result = self.ledger.withdraw_inner(Some(self.cancel), id, amount);
        self.ledger.observe("withdraw", result)
    }

    /// See [`Ledger::transfer`]
    pub async fn transfer(&self, from: AccountId, to: AccountId, amount: i64) -> Result<()> {
        let result = self
            .ledger
            .transfer_inner(Some(self.cancel), from, to, amount)
            .await;
        self.ledger.observe("transfer", result)
    }
}

/// Counts the pending log entry as dropped if the enqueue future is abandoned
///
/// A transfer future dropped while waiting for mailbox capacity has already
/// committed its balances; only the log entry is lost.
struct EnqueueGuard<'a> {
    metrics: &'a Metrics,
    from: AccountId,
    to: AccountId,
    amount: i64,
    armed: bool,
}

impl Drop for EnqueueGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.metrics.record_log_dropped();
            tracing::warn!(
                from = %self.from,
                to = %self.to,
                amount = self.amount,
                "Transfer abandoned before its log entry was enqueued"
            );
        }
    }
}

/// Lock both cells in id order, then validate and move the funds
fn apply_transfer(
    from: (AccountId, &AccountCell),
    to: (AccountId, &AccountCell),
    amount: i64,
) -> Result<()> {
    let from_is_lower = from.0 < to.0;
    let (low, high) = if from_is_lower {
        (from.1, to.1)
    } else {
        (to.1, from.1)
    };

    let mut low_guard = low.write();
    let mut high_guard = high.write();

    let (source, dest) = if from_is_lower {
        (&mut *low_guard, &mut *high_guard)
    } else {
        (&mut *high_guard, &mut *low_guard)
    };

    move_funds(source, dest, amount)
}

fn move_funds(source: &mut Account, dest: &mut Account, amount: i64) -> Result<()> {
    if source.balance < amount {
        return Err(Error::InsufficientFunds {
            account: source.id,
            balance: source.balance,
            requested: amount,
        });
    }

    let credited = dest
        .balance
        .checked_add(amount)
        .ok_or(Error::BalanceOverflow(dest.id))?;

    source.balance -= amount;
    dest.balance = credited;
    Ok(())
}

fn ensure_non_negative(amount: i64) -> Result<()> {
    if amount < 0 {
        return Err(Error::InvalidAmount(amount));
    }
    Ok(())
}

fn ensure_not_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(Error::Cancelled),
        _ => Ok(()),
    }
}
