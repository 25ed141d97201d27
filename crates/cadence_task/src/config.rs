//! Scheduler configuration.

use serde::Deserialize;

/// Settings for the executor pool and deferred logger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Worker thread count.
    pub workers: usize,
    /// Deferred logger capacity, in records per cycle.
    pub log_capacity: usize,
    /// Worker thread name prefix.
    pub thread_name: String,
    /// Panic on scheduler protocol misuse in debug builds.
    pub fatal_misuse: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, usize::from),
            log_capacity: 4096,
            thread_name: "cadence-worker".to_string(),
            fatal_misuse: false,
        }
    }
}

impl TaskConfig {
    /// Default settings with a fixed worker count.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }
}
