use std::any::Any;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::CallError;
use crate::executor::Task;
use crate::{log_debug, log_error, Result};

/// Fixed size pool of named threads. Cache lookups of the async call paths
/// run here so they never block the caller.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(CallError::ConfigurationError(
                "Worker pool needs at least one thread".to_string(),
            )
            .into());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("cachecall-worker-{i}"))
            .panic_handler(log_panic)
            .build()?;
        log_debug!("Started worker pool with {} threads", size);
        Ok(WorkerPool { pool })
    }

    pub fn size(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queues a task. Tasks already queued still run after the pool is
    /// dropped.
    pub fn spawn(&self, task: Task) {
        self.pool.spawn(task);
    }
}

fn log_panic(payload: Box<dyn Any + Send>) {
    let msg = payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    log_error!(
        "Task panicked on thread {}: {}",
        std::thread::current().name().unwrap_or("<unnamed>"),
        msg
    );
}
