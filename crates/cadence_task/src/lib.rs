//! # cadence_task
//!
//! Per-frame parallel task scheduling over a [`cadence_ecs::World`].
//!
//! - [`FrameClock`]: the per-cycle elapsed time, readable from any worker.
//! - [`DeferredLogger`]: non-blocking log buffer drained once per cycle.
//! - [`ExecutorPool`]: fixed-size worker pool with `submit` / `wait_all`.
//! - [`System`]: a unit of per-cycle work with a declared access profile.
//! - [`PipelineGraph`]: conflict-forced ordering between systems, built once.
//! - [`Scheduler`]: the two-phase `dispatch` / `complete` protocol.

pub mod clock;
pub mod config;
pub mod error;
pub mod graph;
pub mod logger;
pub mod pool;
pub mod scheduler;
pub mod system;

pub use clock::FrameClock;
pub use config::TaskConfig;
pub use error::{Phase, Result, TaskError};
pub use graph::{PipelineGraph, Stage};
pub use logger::{DeferredLogger, FlushReport, LogRecord, LogSink, MemorySink, Severity, TracingSink};
pub use pool::{ExecutorPool, Job, Spawner};
pub use scheduler::{CycleState, Scheduler};
pub use system::{Batch, System, SystemContext, Workload};
