//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_accounts_created_total` - Accounts opened
//! - `ledger_operations_total{operation, outcome}` - Ledger calls by result
//! - `ledger_log_entries_enqueued_total` - Transfer records handed to the pipeline
//! - `ledger_log_entries_dropped_total` - Transfer records lost (pipeline gone)
//! - `ledger_log_flushes_total{trigger}` - Non-empty flushes by trigger
//! - `ledger_log_batch_size` - Histogram of flushed batch sizes
//!
//! Each [`Metrics`] owns its registry so several ledgers can live in one
//! process.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Accounts opened
    pub accounts_created: IntCounter,

    /// Ledger operations by kind and outcome
    pub operations: IntCounterVec,

    /// Log entries handed to the pipeline
    pub log_entries_enqueued: IntCounter,

    /// Log entries that never reached the pipeline
    pub log_entries_dropped: IntCounter,

    /// Non-empty flushes by trigger
    pub log_flushes: IntCounterVec,

    /// Batch size histogram
    pub batch_size: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("accounts_created", &self.accounts_created.get())
            .field("log_entries_enqueued", &self.log_entries_enqueued.get())
            .field("log_entries_dropped", &self.log_entries_dropped.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let accounts_created = IntCounter::new(
            "ledger_accounts_created_total",
            "Total number of accounts created",
        )?;
        registry.register(Box::new(accounts_created.clone()))?;

        let operations = IntCounterVec::new(
            Opts::new("ledger_operations_total", "Ledger operations by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations.clone()))?;

        let log_entries_enqueued = IntCounter::new(
            "ledger_log_entries_enqueued_total",
            "Transfer records handed to the log pipeline",
        )?;
        registry.register(Box::new(log_entries_enqueued.clone()))?;

        let log_entries_dropped = IntCounter::new(
            "ledger_log_entries_dropped_total",
            "Transfer records lost before reaching the log pipeline",
        )?;
        registry.register(Box::new(log_entries_dropped.clone()))?;

        let log_flushes = IntCounterVec::new(
            Opts::new("ledger_log_flushes_total", "Non-empty log flushes by trigger"),
            &["trigger"],
        )?;
        registry.register(Box::new(log_flushes.clone()))?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("ledger_log_batch_size", "Histogram of flushed batch sizes")
                .buckets(vec![1.0, 10.0, 50.0, 100.0, 200.0, 300.0, 500.0]),
        )?;
        registry.register(Box::new(batch_size.clone()))?;

        Ok(Self {
            accounts_created,
            operations,
            log_entries_enqueued,
            log_entries_dropped,
            log_flushes,
            batch_size,
            registry,
        })
    }

    /// Record account creation
    pub fn record_account_created(&self) {
        self.accounts_created.inc();
    }

    /// Record the outcome of a ledger operation
    pub fn record_operation(&self, operation: &str, outcome: &str) {
        self.operations.with_label_values(&[operation, outcome]).inc();
    }

    /// Record a successful enqueue
    pub fn record_log_enqueued(&self) {
        self.log_entries_enqueued.inc();
    }

    /// Record a lost log entry
    pub fn record_log_dropped(&self) {
        self.log_entries_dropped.inc();
    }

    /// Record batch flush
    pub fn record_batch_flush(&self, trigger: &str, batch_size: usize) {
        self.log_flushes.with_label_values(&[trigger]).inc();
        self.batch_size.observe(batch_size as f64);
    }

    /// Number of non-empty flushes for `trigger`
    pub fn flushes(&self, trigger: &str) -> u64 {
        self.log_flushes.with_label_values(&[trigger]).get()
    }

    /// Export in Prometheus text format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
