//! Dispatch executors decide where result callbacks run. Cache and network
//! work happens elsewhere; the executor only moves the final delivery onto
//! the context the caller wants to observe results on.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Sender};
use std::thread::{self, JoinHandle, ThreadId};

use crate::{log_error, Result};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Executor: Send + Sync {
    /// Fire and forget.
    fn execute(&self, task: Task);
}

/// Runs the task right away on the submitting thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct Inline;

impl Executor for Inline {
    fn execute(&self, task: Task) {
        task();
    }
}

/// Marshals every task onto one dedicated thread, in submission order.
pub struct Affinity {
    sender: Option<Sender<Task>>,
    handle: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl Affinity {
    pub fn new(name: &str) -> Result<Self> {
        let (sender, receiver) = channel::<Task>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for task in receiver {
                    run_task(task);
                }
            })?;
        let thread_id = handle.thread().id();
        Ok(Affinity {
            sender: Some(sender),
            handle: Some(handle),
            thread_id,
        })
    }

    /// Id of the thread every task runs on.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }
}

impl Executor for Affinity {
    fn execute(&self, task: Task) {
        let Some(sender) = self.sender.as_ref() else {
            log_error!("Affinity executor is shut down, dropping task");
            return;
        };
        if sender.send(task).is_err() {
            log_error!("Affinity executor thread is gone, dropping task");
        }
    }
}

impl Drop for Affinity {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain what is queued and exit.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if thread::current().id() != self.thread_id {
                let _ = handle.join();
            }
        }
    }
}

/// Runs a task, logging instead of unwinding through the calling thread.
pub(crate) fn run_task(task: Task) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        log_error!(
            "Task panicked on thread {}",
            thread::current().name().unwrap_or("<unnamed>")
        );
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_inline_runs_on_caller_thread() {
        let caller = thread::current().id();
        let (sender, receiver) = mpsc::channel();
        Inline.execute(Box::new(move || {
            sender.send(thread::current().id()).unwrap();
        }));
        assert_eq!(caller, receiver.try_recv().unwrap());
    }

    #[test]
    fn test_affinity_runs_on_its_own_thread() {
        let executor = Affinity::new("test-affinity").unwrap();
        let (sender, receiver) = mpsc::channel();
        for _ in 0..3 {
            let sender = sender.clone();
            executor.execute(Box::new(move || {
                sender.send(thread::current().id()).unwrap();
            }));
        }
        for _ in 0..3 {
            let id = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(executor.thread_id(), id);
            assert_ne!(thread::current().id(), id);
        }
    }

    #[test]
    fn test_affinity_keeps_submission_order() {
        let executor = Affinity::new("test-affinity-order").unwrap();
        let (sender, receiver) = mpsc::channel();
        for i in 0..50 {
            let sender = sender.clone();
            executor.execute(Box::new(move || sender.send(i).unwrap()));
        }
        let received: Vec<i32> = (0..50)
            .map(|_| receiver.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!((0..50).collect::<Vec<_>>(), received);
    }

    #[test]
    fn test_affinity_survives_panicking_task() {
        let executor = Affinity::new("test-affinity-panic").unwrap();
        executor.execute(Box::new(|| panic!("boom")));
        let (sender, receiver) = mpsc::channel();
        executor.execute(Box::new(move || sender.send(1).unwrap()));
        assert_eq!(1, receiver.recv_timeout(Duration::from_secs(5)).unwrap());
    }

    #[test]
    fn test_affinity_drains_queue_on_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let executor = Affinity::new("test-affinity-drop").unwrap();
            for _ in 0..10 {
                let counter = counter.clone();
                executor.execute(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }
        assert_eq!(10, counter.load(Ordering::SeqCst));
    }
}
