//! Fixed-size executor pool.
//!
//! N named worker threads pull boxed jobs from a shared unbounded channel.
//! A tracker counts outstanding jobs so the controlling thread can block in
//! [`ExecutorPool::wait_all`] until everything submitted so far has finished,
//! including follow-up jobs submitted from inside a job through a [`Spawner`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use crate::error::{Result, TaskError};

/// A unit of work accepted by the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Stop,
}

/// Outstanding-work bookkeeping shared by the pool, its workers and spawners.
#[derive(Debug, Default)]
struct Tracker {
    pending: Mutex<usize>,
    idle: Condvar,
    submitted: AtomicU64,
    panicked: AtomicUsize,
}

impl Tracker {
    fn begin(&self) {
        *self.pending.lock() += 1;
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        let mut pending = self.pending.lock();
        *pending -= 1;
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    fn outstanding(&self) -> usize {
        *self.pending.lock()
    }
}

/// Cloneable handle for submitting work to an [`ExecutorPool`].
///
/// Jobs may hold a spawner and submit follow-up work; [`ExecutorPool::wait_all`]
/// waits for that too.
#[derive(Clone)]
pub struct Spawner {
    sender: Sender<Message>,
    tracker: Arc<Tracker>,
}

impl Spawner {
    /// Enqueue a job. Returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::PoolClosed`] if every worker has exited.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        // Count before sending so a waiter can never observe zero while this
        // job is in the queue.
        self.tracker.begin();
        if self.sender.send(Message::Run(Box::new(job))).is_err() {
            self.tracker.submitted.fetch_sub(1, Ordering::Relaxed);
            self.tracker.finish();
            return Err(TaskError::PoolClosed);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Spawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spawner").finish_non_exhaustive()
    }
}

/// A fixed-size pool of worker threads.
#[derive(Debug)]
pub struct ExecutorPool {
    spawner: Option<Spawner>,
    workers: Vec<JoinHandle<()>>,
    tracker: Arc<Tracker>,
}

impl ExecutorPool {
    /// Start `workers` threads named `cadence-worker-<i>`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::EmptyPool`] for zero workers, or
    /// [`TaskError::Spawn`] if the OS refuses a thread.
    pub fn new(workers: usize) -> Result<Self> {
        Self::with_thread_name(workers, "cadence-worker")
    }

    /// Like [`ExecutorPool::new`] with a custom thread name prefix.
    ///
    /// # Errors
    ///
    /// See [`ExecutorPool::new`].
    pub fn with_thread_name(workers: usize, prefix: &str) -> Result<Self> {
        if workers == 0 {
            return Err(TaskError::EmptyPool);
        }

        let (sender, receiver) = crossbeam_channel::unbounded::<Message>();
        let tracker = Arc::new(Tracker::default());
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let receiver = receiver.clone();
            let tracker = Arc::clone(&tracker);
            let handle = std::thread::Builder::new()
                .name(format!("{prefix}-{index}"))
                .spawn(move || worker_loop(&receiver, &tracker))?;
            handles.push(handle);
        }
        debug!(workers, "executor pool started");

        Ok(Self {
            spawner: Some(Spawner {
                sender,
                tracker: Arc::clone(&tracker),
            }),
            workers: handles,
            tracker,
        })
    }

    /// Returns a submission handle, or `None` once the pool is closing.
    #[must_use]
    pub fn spawner(&self) -> Option<Spawner> {
        self.spawner.clone()
    }

    /// Enqueue a job. Returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::PoolClosed`] if the pool is shutting down.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawner.as_ref().ok_or(TaskError::PoolClosed)?.submit(job)
    }

    /// Block until every job submitted so far has finished.
    ///
    /// Returns how many of those jobs panicked since the previous call.
    pub fn wait_all(&self) -> usize {
        let mut pending = self.tracker.pending.lock();
        while *pending > 0 {
            self.tracker.idle.wait(&mut pending);
        }
        drop(pending);
        self.tracker.panicked.swap(0, Ordering::AcqRel)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Total jobs accepted since the pool started.
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.tracker.submitted.load(Ordering::Relaxed)
    }

    /// Jobs queued or running right now.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Stop the workers and join them.
    ///
    /// # Panics
    ///
    /// Panics with [`TaskError::PoolMisuseOnShutdown`] if work is still
    /// outstanding. Dropping queued work silently is never acceptable.
    pub fn shutdown(mut self) {
        let outstanding = self.outstanding();
        if outstanding > 0 {
            let misuse = TaskError::PoolMisuseOnShutdown { outstanding };
            error!(%misuse, "executor pool shut down with outstanding work");
            panic!("{misuse}");
        }
        self.close();
    }

    fn close(&mut self) {
        // Spawner clones may outlive the pool, so workers are told to stop
        // explicitly rather than waiting for the channel to disconnect.
        if let Some(spawner) = self.spawner.take() {
            for _ in 0..self.workers.len() {
                // A send error means the workers are already gone.
                let _ = spawner.sender.send(Message::Stop);
            }
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("executor worker exited abnormally");
            }
        }
        debug!("executor pool stopped");
    }
}

impl Drop for ExecutorPool {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        let outstanding = self.outstanding();
        if outstanding > 0 {
            error!(outstanding, "executor pool dropped with outstanding work; draining");
            self.wait_all();
        }
        self.close();
    }
}

fn worker_loop(receiver: &Receiver<Message>, tracker: &Tracker) {
    while let Ok(Message::Run(job)) = receiver.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracker.panicked.fetch_add(1, Ordering::AcqRel);
        }
        tracker.finish();
    }
}
