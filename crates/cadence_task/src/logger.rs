//! Deferred logger.
//!
//! Workers [`record`](DeferredLogger::record) messages into a bounded queue
//! without blocking. The controlling thread [`flush`](DeferredLogger::flush)es
//! them once per cycle, in arrival order, to a [`LogSink`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A single deferred message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Message severity.
    pub severity: Severity,
    /// Message text.
    pub message: String,
    /// Name of the thread that recorded it, if it had one.
    pub origin: Option<String>,
}

/// Destination of flushed records.
pub trait LogSink: Send {
    /// Emit one record. Called on the controlling thread only.
    fn emit(&mut self, record: &LogRecord);
}

/// Forwards records to `tracing` at the matching level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&mut self, record: &LogRecord) {
        let origin = record.origin.as_deref().unwrap_or("unnamed");
        let message = record.message.as_str();
        match record.severity {
            Severity::Trace => trace!(target: "cadence::deferred", origin, "{message}"),
            Severity::Debug => debug!(target: "cadence::deferred", origin, "{message}"),
            Severity::Info => info!(target: "cadence::deferred", origin, "{message}"),
            Severity::Warn => warn!(target: "cadence::deferred", origin, "{message}"),
            Severity::Error => error!(target: "cadence::deferred", origin, "{message}"),
        }
    }
}

/// Collects records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything emitted so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the number of records emitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing was emitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl LogSink for MemorySink {
    fn emit(&mut self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Result of one [`DeferredLogger::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records written to the sink.
    pub emitted: usize,
    /// Records lost to overflow since the previous flush.
    pub dropped: u64,
}

/// Thread-safe, non-blocking log buffer drained once per cycle.
pub struct DeferredLogger {
    sender: Sender<LogRecord>,
    receiver: Receiver<LogRecord>,
    dropped: AtomicU64,
    sink: Mutex<Box<dyn LogSink>>,
}

impl std::fmt::Debug for DeferredLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredLogger")
            .field("pending", &self.receiver.len())
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl DeferredLogger {
    /// Create a logger that forwards to `tracing`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_sink(capacity, TracingSink)
    }

    /// Create a logger with a custom sink. Capacity is at least one record.
    #[must_use]
    pub fn with_sink(capacity: usize, sink: impl LogSink + 'static) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            dropped: AtomicU64::new(0),
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Append a record. Never blocks; drops the record if the buffer is full.
    pub fn record(&self, message: impl Into<String>, severity: Severity) {
        let record = LogRecord {
            severity,
            message: message.into(),
            origin: std::thread::current().name().map(str::to_owned),
        };
        match self.sender.try_send(record) {
            Ok(()) => {}
            // The logger owns its receiver, so the channel never disconnects.
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Shorthand for `record(message, Severity::Info)`.
    pub fn info(&self, message: impl Into<String>) {
        self.record(message, Severity::Info);
    }

    /// Shorthand for `record(message, Severity::Warn)`.
    pub fn warn(&self, message: impl Into<String>) {
        self.record(message, Severity::Warn);
    }

    /// Emit every record pending at call time, in arrival order.
    ///
    /// Records appended while the flush runs are left for the next one.
    pub fn flush(&self) -> FlushReport {
        let pending = self.receiver.len();
        let mut sink = self.sink.lock();
        let mut emitted = 0;
        for record in self.receiver.try_iter().take(pending) {
            sink.emit(&record);
            emitted += 1;
        }
        drop(sink);

        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!(dropped, "deferred logger overflowed; records were lost");
        }
        FlushReport { emitted, dropped }
    }

    /// Number of records waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Maximum number of buffered records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_preserves_arrival_order() {
        let sink = MemorySink::new();
        let logger = DeferredLogger::with_sink(16, sink.clone());
        logger.record("one", Severity::Info);
        logger.record("two", Severity::Warn);
        logger.record("three", Severity::Error);

        let report = logger.flush();
        assert_eq!(report, FlushReport { emitted: 3, dropped: 0 });
        let messages: Vec<_> = sink.records().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["one", "two", "three"]);
        assert_eq!(sink.records()[1].severity, Severity::Warn);
    }

    #[test]
    fn test_flush_clears_buffer() {
        let sink = MemorySink::new();
        let logger = DeferredLogger::with_sink(16, sink.clone());
        logger.info("once");
        logger.flush();
        assert_eq!(logger.pending(), 0);
        assert_eq!(logger.flush().emitted, 0);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_overflow_drops_and_counts() {
        let sink = MemorySink::new();
        let logger = DeferredLogger::with_sink(2, sink.clone());
        for i in 0..5 {
            logger.info(format!("message {i}"));
        }
        let report = logger.flush();
        assert_eq!(report.emitted, 2);
        assert_eq!(report.dropped, 3);
        assert_eq!(logger.flush().dropped, 0);
    }

    #[test]
    fn test_records_origin_thread_name() {
        let sink = MemorySink::new();
        let logger = Arc::new(DeferredLogger::with_sink(4, sink.clone()));
        let worker = Arc::clone(&logger);
        std::thread::Builder::new()
            .name("origin-test".into())
            .spawn(move || worker.warn("from worker"))
            .unwrap()
            .join()
            .unwrap();
        logger.flush();
        assert_eq!(sink.records()[0].origin.as_deref(), Some("origin-test"));
    }

    #[test]
    fn test_zero_capacity_still_buffers_one() {
        let logger = DeferredLogger::with_sink(0, MemorySink::new());
        assert_eq!(logger.capacity(), 1);
        logger.info("kept");
        assert_eq!(logger.pending(), 1);
    }
}
