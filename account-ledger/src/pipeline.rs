//! Asynchronous transaction log pipeline
//!
//! Transfers hand their log entries to a single consumer task that batches
//! them and appends whole batches to the [`TransactionLog`]:
//! - Bounded mailbox, producers wait for capacity (backpressure)
//! - Flush on batch size or on the flush interval, whichever comes first
//! - The interval is measured from the last flush of any kind
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │            Ledger::transfer (many tasks)              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ PipelineHandle::record
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │           mpsc::channel (bounded, 10 000)             │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LogPipeline (Single Task)                │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ Batch: Vec<TransactionLogEntry>                │  │
//! │  │ 300 entries or 5s since last flush → flush()   │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                       │                               │
//! │                       ▼                               │
//! │           TransactionLog::append_batch()              │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery is best effort: entries still in the mailbox or the pending batch
//! are lost if the process dies.

use crate::{
    config::PipelineConfig, metrics::Metrics, txlog::TransactionLog,
    types::TransactionLogEntry, Error, Result,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Duration, Instant};

/// What caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Batch reached the size threshold
    Size,
    /// Flush interval elapsed
    Timer,
    /// Caller asked for it
    Explicit,
    /// Pipeline stopping
    Shutdown,
}

impl FlushTrigger {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Timer => "timer",
            FlushTrigger::Explicit => "explicit",
            FlushTrigger::Shutdown => "shutdown",
        }
    }
}

/// Message sent to the pipeline
#[derive(Debug)]
pub enum LogMessage {
    /// Add an entry to the pending batch
    Record(TransactionLogEntry),

    /// Flush the pending batch now
    Flush {
        response: oneshot::Sender<()>,
    },

    /// Flush and stop
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

/// Consumer task state
#[derive(Debug)]
pub struct LogPipeline {
    /// Destination log
    log: Arc<TransactionLog>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LogMessage>,

    /// Pending entries, owned by this task alone
    batch: Vec<TransactionLogEntry>,

    /// Flush when the batch holds this many entries
    max_batch_size: usize,

    /// Flush when this long has passed since the last flush
    flush_interval: Duration,

    metrics: Metrics,
}

impl LogPipeline {
    /// Create new pipeline
    pub fn new(
        log: Arc<TransactionLog>,
        mailbox: mpsc::Receiver<LogMessage>,
        max_batch_size: usize,
        flush_interval: Duration,
        metrics: Metrics,
    ) -> Self {
        Self {
            log,
            mailbox,
            batch: Vec::with_capacity(max_batch_size),
            max_batch_size,
            flush_interval,
            metrics,
        }
    }

    /// Run the consumer loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        let mut deadline = Instant::now() + self.flush_interval;

        loop {
            tokio::select! {
                msg = self.mailbox.recv() => match msg {
                    Some(LogMessage::Record(entry)) => {
                        self.batch.push(entry);
                        if self.batch.len() >= self.max_batch_size {
                            self.flush(FlushTrigger::Size);
                            deadline = Instant::now() + self.flush_interval;
                        }
                    }
                    Some(LogMessage::Flush { response }) => {
                        self.flush(FlushTrigger::Explicit);
                        deadline = Instant::now() + self.flush_interval;
                        let _ = response.send(());
                    }
                    Some(LogMessage::Shutdown { response }) => {
                        self.drain().await;
                        let _ = response.send(());
                        break;
                    }
                    None => {
                        self.flush(FlushTrigger::Shutdown);
                        break;
                    }
                },

                _ = sleep_until(deadline) => {
                    self.flush(FlushTrigger::Timer);
                    deadline = Instant::now() + self.flush_interval;
                }
            }
        }

        tracing::info!(entries = self.log.len(), "Transaction log pipeline stopped");
    }

    /// Close the mailbox, take what is still buffered and flush it
    async fn drain(&mut self) {
        self.mailbox.close();
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LogMessage::Record(entry) => self.batch.push(entry),
                LogMessage::Flush { response } | LogMessage::Shutdown { response } => {
                    let _ = response.send(());
                }
            }
        }
        self.flush(FlushTrigger::Shutdown);
    }

    /// Move the pending batch into the log
    fn flush(&mut self, trigger: FlushTrigger) {
        if self.batch.is_empty() {
            return;
        }

        let size = self.batch.len();
        tracing::debug!(trigger = trigger.as_str(), size, "Flushing transaction log batch");

        self.log.append_batch(&mut self.batch);
        self.metrics.record_batch_flush(trigger.as_str(), size);
    }
}

/// Handle for sending messages to the pipeline
#[derive(Clone, Debug)]
pub struct PipelineHandle {
    sender: mpsc::Sender<LogMessage>,
}

impl PipelineHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LogMessage>) -> Self {
        Self { sender }
    }

    /// Enqueue an entry, waiting for mailbox capacity if it is full
    pub async fn record(&self, entry: TransactionLogEntry) -> Result<()> {
        self.sender
            .send(LogMessage::Record(entry))
            .await
            .map_err(|_| Error::Concurrency("Log pipeline mailbox closed".to_string()))
    }

    /// Flush the pending batch and wait until it is in the log
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LogMessage::Flush { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Log pipeline mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Flush everything and stop the pipeline
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LogMessage::Shutdown { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Log pipeline mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// True once the pipeline stopped accepting entries
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Spawn the pipeline consumer on the current runtime
pub fn spawn_log_pipeline(
    log: Arc<TransactionLog>,
    config: &PipelineConfig,
    metrics: Metrics,
) -> PipelineHandle {
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let pipeline = LogPipeline::new(
        log,
        rx,
        config.max_batch_size,
        config.flush_interval(),
        metrics,
    );

    tokio::spawn(async move {
        pipeline.run().await;
    });

    PipelineHandle::new(tx)
}
