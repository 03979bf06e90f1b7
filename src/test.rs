#[cfg(test)]
pub mod utils {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc::{channel, Receiver};
    use std::sync::{Arc, Barrier, Condvar, Mutex};
    use std::thread;
    use std::time::Duration;

    use crate::cache::{CacheStore, InMemoryStore};
    use crate::call::{Callback, NetworkCall};
    use crate::error::CallError;
    use crate::executor::{Executor, Task};
    use crate::http::{Headers, Request, Response};
    use crate::Result;

    pub const TIMEOUT: Duration = Duration::from_secs(5);

    pub enum Scripted<T> {
        Ok(T),
        Status(u16, Vec<u8>),
        TransportError(String),
    }

    /// Scripted stand-in for a remote server. Answers are popped from the end
    /// of the script, one per network hit.
    pub struct MockNetwork<T> {
        script: Mutex<Vec<Scripted<T>>>,
        hits: AtomicUsize,
        deferred: AtomicBool,
        gate: Mutex<Gate>,
        signal: Condvar,
    }

    #[derive(Default)]
    struct Gate {
        pending: usize,
        released: bool,
    }

    impl<T> MockNetwork<T> {
        pub fn new(script: Vec<Scripted<T>>) -> Arc<Self> {
            Arc::new(MockNetwork {
                script: Mutex::new(script),
                hits: AtomicUsize::new(0),
                deferred: AtomicBool::new(false),
                gate: Mutex::new(Gate::default()),
                signal: Condvar::new(),
            })
        }

        pub fn ok<B: Into<T>>(body: B) -> Scripted<T> {
            Scripted::Ok(body.into())
        }

        pub fn status(status: u16, body: &str) -> Scripted<T> {
            Scripted::Status(status, body.as_bytes().to_vec())
        }

        pub fn transport_error(msg: &str) -> Scripted<T> {
            Scripted::TransportError(msg.to_string())
        }

        /// Calls hold their answer back until `release`.
        pub fn deferred(self: Arc<Self>) -> Arc<Self> {
            self.deferred.store(true, Ordering::SeqCst);
            self
        }

        pub fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }

        pub fn wait_for_pending(&self, timeout: Duration) {
            let gate = self.gate.lock().unwrap();
            let (gate, _) = self
                .signal
                .wait_timeout_while(gate, timeout, |gate| gate.pending == 0)
                .unwrap();
            assert!(gate.pending > 0, "no call reached the network");
        }

        pub fn release(&self) {
            self.gate.lock().unwrap().released = true;
            self.signal.notify_all();
        }

        fn hold(&self) {
            if !self.deferred.load(Ordering::SeqCst) {
                return;
            }
            let mut gate = self.gate.lock().unwrap();
            gate.pending += 1;
            self.signal.notify_all();
            let _ = self
                .signal
                .wait_timeout_while(gate, TIMEOUT, |gate| !gate.released)
                .unwrap();
        }

        fn answer(&self) -> Result<Response<T>> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop() {
                Some(Scripted::Ok(body)) => Ok(Response::success(body)),
                Some(Scripted::Status(status, data)) => Ok(Response {
                    status,
                    body: None,
                    headers: Headers::new(),
                    error_body: Some(data),
                }),
                Some(Scripted::TransportError(msg)) => {
                    Err(CallError::HttpTransportError(msg).into())
                }
                None => Err(CallError::HttpTransportError("script exhausted".to_string()).into()),
            }
        }
    }

    /// One-shot call against a [`MockNetwork`]. `enqueue` completes on a
    /// fresh thread.
    pub struct MockCall<T> {
        request: Request,
        network: Arc<MockNetwork<T>>,
        executed: AtomicBool,
        canceled: AtomicBool,
    }

    impl<T> MockCall<T> {
        pub fn new(request: Request, network: Arc<MockNetwork<T>>) -> Self {
            MockCall {
                request,
                network,
                executed: AtomicBool::new(false),
                canceled: AtomicBool::new(false),
            }
        }
    }

    impl<T: Send + 'static> NetworkCall<T> for MockCall<T> {
        fn request(&self) -> &Request {
            &self.request
        }

        fn execute(&self) -> Result<Response<T>> {
            if self.executed.swap(true, Ordering::SeqCst) {
                return Err(CallError::AlreadyExecuted.into());
            }
            if self.is_canceled() {
                return Err(CallError::Canceled.into());
            }
            self.network.hold();
            self.network.answer()
        }

        fn enqueue(&self, callback: Callback<T>) {
            if self.executed.swap(true, Ordering::SeqCst) {
                callback(Err(CallError::AlreadyExecuted.into()));
                return;
            }
            if self.is_canceled() {
                callback(Err(CallError::Canceled.into()));
                return;
            }
            let network = self.network.clone();
            thread::spawn(move || {
                network.hold();
                callback(network.answer());
            });
        }

        fn cancel(&self) {
            self.canceled.store(true, Ordering::SeqCst);
        }

        fn is_canceled(&self) -> bool {
            self.canceled.load(Ordering::SeqCst)
        }

        fn is_executed(&self) -> bool {
            self.executed.load(Ordering::SeqCst)
        }

        fn clone_call(&self) -> Box<dyn NetworkCall<T>> {
            Box::new(MockCall::new(self.request.clone(), self.network.clone()))
        }
    }

    /// Every operation fails.
    pub struct FailingStore;

    fn store_error() -> anyhow::Error {
        CallError::CacheStoreError("disk on fire".to_string()).into()
    }

    impl CacheStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(store_error())
        }

        fn put(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Err(store_error())
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(store_error())
        }

        fn size(&self) -> Result<usize> {
            Err(store_error())
        }

        fn clear(&self) -> Result<()> {
            Err(store_error())
        }
    }

    /// In memory store whose lookups block until the test meets them at the
    /// barrier.
    pub struct BlockingStore {
        store: InMemoryStore,
        barrier: Barrier,
    }

    impl BlockingStore {
        pub fn new() -> Arc<Self> {
            Arc::new(BlockingStore {
                store: InMemoryStore::new(),
                barrier: Barrier::new(2),
            })
        }

        pub fn release(&self) {
            self.barrier.wait();
        }
    }

    impl CacheStore for BlockingStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.barrier.wait();
            self.store.get(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> Result<()> {
            self.store.put(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.store.remove(key)
        }

        fn size(&self) -> Result<usize> {
            self.store.size()
        }

        fn clear(&self) -> Result<()> {
            self.store.clear()
        }
    }

    /// Runs tasks inline and counts them.
    #[derive(Default)]
    pub struct CountingExecutor {
        dispatched: AtomicUsize,
    }

    impl CountingExecutor {
        pub fn dispatched(&self) -> usize {
            self.dispatched.load(Ordering::SeqCst)
        }
    }

    impl Executor for CountingExecutor {
        fn execute(&self, task: Task) {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            task();
        }
    }

    /// A callback forwarding its result to the returned receiver.
    pub fn collect<T: Send + 'static>() -> (Callback<T>, Receiver<Result<Response<T>>>) {
        let (sender, receiver) = channel();
        let callback: Callback<T> = Box::new(move |result| {
            let _ = sender.send(result);
        });
        (callback, receiver)
    }
}
