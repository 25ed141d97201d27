//! Scheduler error types.
//!
//! Every [`TaskError`] belongs to a [`Phase`] of the scheduler lifecycle, and
//! its message names that phase so a fatal diagnostic says which part of the
//! protocol was violated.

use std::fmt;

/// The lifecycle phase an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Building the pipeline graph or the executor pool.
    Build,
    /// Submitting a cycle's work.
    Dispatch,
    /// Waiting for a cycle to finish.
    Join,
    /// Tearing down the pool.
    Shutdown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Build => "build",
            Phase::Dispatch => "dispatch",
            Phase::Join => "join",
            Phase::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Errors raised by the scheduler and executor pool.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// `dispatch` was called while the previous cycle was still in flight.
    #[error("dispatch: cycle {cycle} is still in flight; call complete() first")]
    AlreadyDispatched {
        /// The cycle that has not been joined.
        cycle: u64,
    },

    /// The pool was shut down while subtasks were outstanding.
    #[error("shutdown: {outstanding} subtask(s) still outstanding")]
    PoolMisuseOnShutdown {
        /// Subtasks still queued or running.
        outstanding: usize,
    },

    /// Two conflicting systems are not ordered by the pipeline graph.
    #[error("build: systems `{first}` and `{second}` conflict but are not ordered")]
    SchedulingConflict {
        /// The earlier system.
        first: String,
        /// The later system.
        second: String,
    },

    /// Two systems share a name.
    #[error("build: system `{0}` registered twice")]
    DuplicateSystem(String),

    /// One or more subtasks panicked during a cycle.
    #[error("join: {count} subtask(s) panicked in cycle {cycle}")]
    SubtaskPanicked {
        /// The cycle that was joined.
        cycle: u64,
        /// Number of panicked subtasks.
        count: usize,
    },

    /// An executor pool was requested with zero workers.
    #[error("build: executor pool needs at least one worker")]
    EmptyPool,

    /// Work was submitted after the pool stopped accepting it.
    #[error("dispatch: executor pool is closed")]
    PoolClosed,

    /// A worker thread could not be started.
    #[error("build: failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl TaskError {
    /// Returns the lifecycle phase this error belongs to.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            TaskError::AlreadyDispatched { .. } | TaskError::PoolClosed => Phase::Dispatch,
            TaskError::PoolMisuseOnShutdown { .. } => Phase::Shutdown,
            TaskError::SchedulingConflict { .. }
            | TaskError::DuplicateSystem(_)
            | TaskError::EmptyPool
            | TaskError::Spawn(_) => Phase::Build,
            TaskError::SubtaskPanicked { .. } => Phase::Join,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_phase() {
        let errors = [
            TaskError::AlreadyDispatched { cycle: 3 },
            TaskError::PoolMisuseOnShutdown { outstanding: 2 },
            TaskError::DuplicateSystem("age".into()),
            TaskError::SubtaskPanicked { cycle: 1, count: 1 },
        ];
        for error in errors {
            let phase = error.phase().to_string();
            assert!(
                error.to_string().starts_with(&phase),
                "`{error}` should start with `{phase}`"
            );
        }
    }
}
