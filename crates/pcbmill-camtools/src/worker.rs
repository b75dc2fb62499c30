//! Bounded pool for background generation runs.

use pcbmill_core::{CancellationToken, FailKind, FailResult};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

/// Runs generation closures on a fixed number of blocking worker threads
pub struct WorkerPool {
    runtime: Runtime,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("pcbmill-worker")
            .enable_all()
            .build()?;
        debug!("Worker pool started with {} workers", workers);
        Ok(Self { runtime, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue `work`; it starts once a worker is free
    pub fn spawn<T, F>(
        &self,
        name: impl Into<String>,
        cancel: CancellationToken,
        work: F,
    ) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> FailResult<T> + Send + 'static,
    {
        JobHandle {
            name: name.into(),
            cancel,
            join: self.runtime.spawn_blocking(work),
            handle: self.runtime.handle().clone(),
        }
    }
}

/// Handle to a queued or running background run
pub struct JobHandle<T> {
    name: String,
    cancel: CancellationToken,
    join: JoinHandle<FailResult<T>>,
    handle: Handle,
}

impl<T> JobHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the run to stop at its next cancellation check
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the run ends.
    ///
    /// Must be called from synchronous code, not from inside a runtime.
    pub fn wait(self) -> FailResult<T> {
        match self.handle.block_on(self.join) {
            Ok(result) => result,
            Err(err) => Err(FailKind::internal(format!(
                "worker running '{}' failed: {}",
                self.name, err
            ))),
        }
    }
}
