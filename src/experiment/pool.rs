//! Worker pool for asynchronous experiments
//!
//! A thin handle over a `rayon` thread pool. Each asynchronous run submits
//! up to three jobs: control, candidate, and the compare/publish
//! continuation. Jobs are isolated with `catch_unwind`, so a panicking
//! publisher cannot take a worker (or the process) down with it; the job's
//! result channel is simply dropped and the waiting side sees a lost worker.

use crate::error::{Error, Result};
use crate::observation::panic_message;
use once_cell::sync::OnceCell;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Worker count for pools the engine creates itself: one slot per leg.
pub const DEFAULT_POOL_SIZE: usize = 2;

static SHARED: OnceCell<WorkerPool> = OnceCell::new();

/// Shared, cloneable handle to a worker pool.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<ThreadPool>,
}

impl WorkerPool {
    /// Create a dedicated pool with `threads` workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for zero threads and
    /// [`Error::PoolBuild`] if the threads cannot be spawned.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::InvalidConfig(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("scientist-worker-{index}"))
            .build()?;

        tracing::debug!(threads, "worker pool started");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Reuse an existing rayon pool.
    ///
    /// Runs must not be started from inside this same pool: the caller
    /// blocks on the control job.
    #[must_use]
    pub const fn from_rayon(pool: Arc<ThreadPool>) -> Self {
        Self { pool }
    }

    /// Process-wide pool of [`DEFAULT_POOL_SIZE`] workers, created on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolBuild`] if the pool cannot be created.
    pub fn shared() -> Result<Self> {
        SHARED
            .get_or_try_init(|| Self::new(DEFAULT_POOL_SIZE))
            .cloned()
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Submit a job. Panics inside `job` are logged and contained.
    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                tracing::error!(
                    panic = %panic_message(payload.as_ref()),
                    "experiment worker job panicked"
                );
            }
        });
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}
