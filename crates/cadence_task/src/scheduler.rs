//! Two-phase task scheduler.
//!
//! Each cycle moves `Idle -> Dispatched -> Idle`:
//!
//! 1. [`Scheduler::dispatch`] releases every root system of the pipeline graph
//!    to the executor pool and returns immediately.
//! 2. When the last batch of a system finishes, each dependent's counter of
//!    unfinished dependencies is decremented. A dependent reaching zero is
//!    released from the worker that finished it, so conflicting systems never
//!    overlap while independent ones run side by side.
//! 3. [`Scheduler::complete`] blocks until the pool is idle, recycles
//!    despawned entity slots, and returns to `Idle`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tracing::{debug, error, trace};

use crate::config::TaskConfig;
use crate::error::{Result, TaskError};
use crate::graph::PipelineGraph;
use crate::logger::Severity;
use crate::pool::{ExecutorPool, Spawner};
use crate::system::{System, SystemContext};

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No work in flight; `dispatch` is allowed.
    Idle,
    /// A cycle was dispatched and not yet joined.
    Dispatched,
}

/// Per-cycle release bookkeeping, shared by every job of the cycle.
struct CycleRun {
    cycle: u64,
    graph: Arc<PipelineGraph>,
    context: SystemContext,
    spawner: Spawner,
    /// Unfinished dependencies per system.
    waiting: Vec<AtomicUsize>,
    /// Unfinished batches per released system.
    remaining: Vec<AtomicUsize>,
}

impl CycleRun {
    /// Submit the planning job of system `index`.
    fn release(run: &Arc<Self>, index: usize) -> Result<()> {
        let job_run = Arc::clone(run);
        run.spawner.submit(move || Self::plan(&job_run, index))
    }

    /// Evaluate the workload of system `index` and submit its batches.
    fn plan(run: &Arc<Self>, index: usize) {
        let system = run.graph.system(index);
        let workload =
            match panic::catch_unwind(AssertUnwindSafe(|| system.workload(&run.context))) {
                Ok(workload) => workload,
                Err(payload) => {
                    // Dependents still run; the pool counts the panic.
                    Self::finish(run, index);
                    panic::resume_unwind(payload);
                }
            };

        let count = workload.batch_count();
        trace!(cycle = run.cycle, system = system.name(), batches = count, "releasing system");
        if count == 0 {
            Self::finish(run, index);
            return;
        }

        run.remaining[index].store(count, Ordering::Release);
        for batch in workload.batches() {
            let guard = BatchGuard {
                run: Arc::clone(run),
                index,
            };
            let submitted = run.spawner.submit(move || {
                let guard = guard;
                guard.run.graph.system(index).run(&guard.run.context, &batch);
            });
            // A rejected job drops its guard, which still counts the batch.
            if let Err(err) = submitted {
                run.report(index, "failed to submit batch of", &err);
            }
        }
    }

    /// Record a worker-side failure in the deferred logger.
    fn report(&self, index: usize, what: &str, err: &TaskError) {
        self.context.logger().record(
            format!(
                "cycle {}: {what} system `{}`: {err}",
                self.cycle,
                self.graph.system(index).name()
            ),
            Severity::Error,
        );
    }

    /// Mark system `index` finished and release dependents that became ready.
    fn finish(run: &Arc<Self>, index: usize) {
        for &dependent in run.graph.dependents(index) {
            if run.waiting[dependent].fetch_sub(1, Ordering::AcqRel) == 1 {
                if let Err(err) = Self::release(run, dependent) {
                    run.report(dependent, "failed to release", &err);
                }
            }
        }
    }
}

/// Counts a batch as done when its job ends, whether it returned or panicked.
struct BatchGuard {
    run: Arc<CycleRun>,
    index: usize,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if self.run.remaining[self.index].fetch_sub(1, Ordering::AcqRel) == 1 {
            CycleRun::finish(&self.run, self.index);
        }
    }
}

/// Runs a fixed pipeline of systems once per cycle on an executor pool.
#[derive(Debug)]
pub struct Scheduler {
    pool: ExecutorPool,
    graph: Arc<PipelineGraph>,
    context: SystemContext,
    state: CycleState,
    cycle: u64,
    fatal_misuse: bool,
}

impl Scheduler {
    /// Build the pipeline graph and an executor pool from `config`.
    ///
    /// # Errors
    ///
    /// Returns any graph validation or pool construction error.
    pub fn new(
        systems: Vec<Arc<dyn System>>,
        context: SystemContext,
        config: &TaskConfig,
    ) -> Result<Self> {
        let graph = PipelineGraph::build(systems)?;
        let pool = ExecutorPool::with_thread_name(config.workers, &config.thread_name)?;
        Ok(Self::with_pool(graph, pool, context).with_fatal_misuse(config.fatal_misuse))
    }

    /// Assemble a scheduler from an already built graph and pool.
    #[must_use]
    pub fn with_pool(graph: PipelineGraph, pool: ExecutorPool, context: SystemContext) -> Self {
        Self {
            pool,
            graph: Arc::new(graph),
            context,
            state: CycleState::Idle,
            cycle: 0,
            fatal_misuse: false,
        }
    }

    /// Panic on protocol misuse in debug builds instead of only returning
    /// the error. Release builds always return the error.
    #[must_use]
    pub fn with_fatal_misuse(mut self, fatal: bool) -> Self {
        self.fatal_misuse = fatal;
        self
    }

    /// Submit the current cycle's systems and return without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::AlreadyDispatched`] if the previous cycle has not
    /// been joined. Nothing is submitted in that case.
    ///
    /// # Panics
    ///
    /// In debug builds, panics instead of returning `AlreadyDispatched` when
    /// fatal misuse is enabled (see [`TaskConfig::fatal_misuse`]).
    pub fn dispatch(&mut self) -> Result<()> {
        if self.state == CycleState::Dispatched {
            let err = TaskError::AlreadyDispatched { cycle: self.cycle };
            error!(%err, "scheduler protocol violated");
            debug_assert!(!self.fatal_misuse, "{err}");
            return Err(err);
        }
        let spawner = self.pool.spawner().ok_or(TaskError::PoolClosed)?;

        self.cycle += 1;
        self.state = CycleState::Dispatched;
        let run = Arc::new(CycleRun {
            cycle: self.cycle,
            graph: Arc::clone(&self.graph),
            context: self.context.clone(),
            spawner,
            waiting: (0..self.graph.len())
                .map(|i| AtomicUsize::new(self.graph.dependency_count(i)))
                .collect(),
            remaining: (0..self.graph.len()).map(|_| AtomicUsize::new(0)).collect(),
        });
        for &root in self.graph.roots() {
            CycleRun::release(&run, root)?;
        }
        debug!(
            cycle = self.cycle,
            roots = self.graph.roots().len(),
            "dispatched cycle"
        );
        Ok(())
    }

    /// Wait for the dispatched cycle to finish. A no-op when `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::SubtaskPanicked`] if any subtask of the cycle
    /// panicked. The scheduler is back in `Idle` either way.
    pub fn complete(&mut self) -> Result<()> {
        if self.state == CycleState::Idle {
            return Ok(());
        }
        let started = Instant::now();
        let panicked = self.pool.wait_all();
        self.state = CycleState::Idle;
        let recycled = self.context.world().recycle_despawned();
        debug!(
            cycle = self.cycle,
            wait_us = started.elapsed().as_micros() as u64,
            recycled,
            "completed cycle"
        );
        if panicked > 0 {
            let err = TaskError::SubtaskPanicked {
                cycle: self.cycle,
                count: panicked,
            };
            error!(%err, "cycle finished with panics");
            return Err(err);
        }
        Ok(())
    }

    /// Stop the executor pool.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::PoolMisuseOnShutdown`] if a cycle is still
    /// dispatched. Call [`Scheduler::complete`] first.
    pub fn shutdown(self) -> Result<()> {
        if self.state == CycleState::Dispatched {
            let err = TaskError::PoolMisuseOnShutdown {
                outstanding: self.pool.outstanding(),
            };
            error!(%err, cycle = self.cycle, "shutdown while a cycle is in flight");
            return Err(err);
        }
        self.pool.shutdown();
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Id of the most recently dispatched cycle (0 before the first).
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The pipeline graph.
    #[must_use]
    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// The context handed to systems.
    #[must_use]
    pub fn context(&self) -> &SystemContext {
        &self.context
    }

    /// The executor pool.
    #[must_use]
    pub fn pool(&self) -> &ExecutorPool {
        &self.pool
    }
}
