//! The cache-aside call wrapper.
//!
//! A [`CachedCall`] decorates one [`NetworkCall`]. Cacheable calls look up
//! the store first and only reach the network on a miss, populating the
//! store with successful responses. `refresh` skips the lookup and, when the
//! policy asks for it, drops the entry if the server no longer answers
//! successfully.
//!
//! Lifecycle: `Idle -> Executing -> {Completed, Failed, Canceled}`. A call
//! runs at most once; use `clone` to get a fresh one.
//!
//! Concurrency: no lock is held across calls. Clones racing on the same key
//! see whatever the store's last write was. A `remove` racing an in-flight
//! population may or may not leave the entry behind.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::call::{BodyCallback, Callback, NetworkCall};
use crate::codec::Codec;
use crate::error::CallError;
use crate::factory::Context;
use crate::http::{Request, Response};
use crate::key::{derive_key, CacheKey};
use crate::policy;
use crate::{log_debug, log_error, log_info, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Executing,
    Completed,
    Failed,
    Canceled,
}

struct Flags {
    state: State,
    executed: bool,
    canceled: bool,
}

struct Lifecycle {
    flags: Mutex<Flags>,
}

impl Lifecycle {
    fn new() -> Self {
        Lifecycle {
            flags: Mutex::new(Flags {
                state: State::Idle,
                executed: false,
                canceled: false,
            }),
        }
    }

    fn flags(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks the call executed. Returns false if it was canceled before it
    /// got the chance to run.
    fn start(&self) -> Result<bool> {
        let mut flags = self.flags();
        if flags.executed {
            return Err(CallError::AlreadyExecuted.into());
        }
        flags.executed = true;
        if flags.canceled {
            return Ok(false);
        }
        flags.state = State::Executing;
        Ok(true)
    }

    fn finish(&self, succeeded: bool) {
        let mut flags = self.flags();
        if flags.state == State::Executing {
            flags.state = if succeeded {
                State::Completed
            } else {
                State::Failed
            };
        }
    }

    fn cancel(&self) {
        let mut flags = self.flags();
        flags.canceled = true;
        if matches!(flags.state, State::Idle | State::Executing) {
            flags.state = State::Canceled;
        }
    }

    fn is_canceled(&self) -> bool {
        self.flags().canceled
    }

    fn is_executed(&self) -> bool {
        self.flags().executed
    }

    fn state(&self) -> State {
        self.flags().state
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fetch {
    /// Cache miss on enqueue.
    Load,
    Refresh,
}

struct Inner<T> {
    call: Arc<dyn NetworkCall<T>>,
    codec: Arc<dyn Codec<T>>,
    context: Arc<Context>,
    caching: Option<bool>,
    cacheable: bool,
    key: CacheKey,
    lifecycle: Lifecycle,
}

pub struct CachedCall<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> CachedCall<T> {
    pub(crate) fn new(
        call: Box<dyn NetworkCall<T>>,
        codec: Arc<dyn Codec<T>>,
        context: Arc<Context>,
        caching: Option<bool>,
    ) -> Self {
        let request = call.request();
        let cacheable = policy::is_cacheable(request.method, caching);
        let key = derive_key(
            context.policy.key_scheme,
            request.method.as_str(),
            &request.url,
        );
        CachedCall {
            inner: Arc::new(Inner {
                call: Arc::from(call),
                codec,
                context,
                caching,
                cacheable,
                key,
                lifecycle: Lifecycle::new(),
            }),
        }
    }

    /// Runs the call on the current thread. Cacheable calls answer from the
    /// store when they can; the network is only reached on a miss.
    pub fn execute(&self) -> Result<Response<T>> {
        if !self.inner.start()? {
            return Err(CallError::Canceled.into());
        }
        let result = self.inner.execute_blocking();
        self.inner.lifecycle.finish(result.is_ok());
        result
    }

    /// Runs the call asynchronously. The callback fires exactly once, through
    /// the dispatch executor, whatever the outcome. Reuse errors are returned
    /// right away and the callback is dropped without being called.
    pub fn enqueue(&self, callback: Callback<T>) -> Result<()> {
        if !self.inner.start()? {
            self.inner.deliver(callback, Err(CallError::Canceled.into()));
            return Ok(());
        }
        if !self.inner.cacheable {
            self.inner.delegate(callback);
            return Ok(());
        }
        let inner = self.inner.clone();
        self.inner.context.pool.spawn(Box::new(move || {
            if inner.lifecycle.is_canceled() {
                inner.deliver(callback, Err(CallError::Canceled.into()));
                return;
            }
            match inner.load_from_cache() {
                Some(response) => inner.deliver(callback, Ok(response)),
                None => inner.fetch(callback, Fetch::Load),
            }
        }));
        Ok(())
    }

    /// Like `enqueue` but always goes to the network. A successful response
    /// overwrites the cached entry; a failed one removes it when the policy
    /// invalidates on refresh failures.
    pub fn refresh(&self, callback: Callback<T>) -> Result<()> {
        if !self.inner.start()? {
            self.inner.deliver(callback, Err(CallError::Canceled.into()));
            return Ok(());
        }
        if !self.inner.cacheable {
            self.inner.delegate(callback);
            return Ok(());
        }
        let inner = self.inner.clone();
        self.inner.context.pool.spawn(Box::new(move || {
            if inner.lifecycle.is_canceled() {
                inner.deliver(callback, Err(CallError::Canceled.into()));
                return;
            }
            inner.fetch(callback, Fetch::Refresh);
        }));
        Ok(())
    }

    /// `execute` yielding the body alone. A non-2xx status is an
    /// `UnsuccessfulResponse` error.
    pub fn execute_body(&self) -> Result<T> {
        self.execute()?.into_body()
    }

    pub fn enqueue_body(&self, callback: BodyCallback<T>) -> Result<()> {
        self.enqueue(Box::new(move |result: Result<Response<T>>| {
            callback(result.and_then(Response::into_body))
        }))
    }

    pub fn refresh_body(&self, callback: BodyCallback<T>) -> Result<()> {
        self.refresh(Box::new(move |result: Result<Response<T>>| {
            callback(result.and_then(Response::into_body))
        }))
    }

    /// Deletes this call's entry. Removing an absent entry is not an error.
    pub fn remove(&self) -> Result<()> {
        log_debug!("Removing cache entry {}", self.inner.key);
        self.inner.context.store.remove(self.inner.key.as_str())
    }

    pub fn cancel(&self) {
        self.inner.lifecycle.cancel();
        self.inner.call.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.lifecycle.is_canceled() || self.inner.call.is_canceled()
    }

    pub fn is_executed(&self) -> bool {
        self.inner.lifecycle.is_executed() || self.inner.call.is_executed()
    }

    pub fn state(&self) -> State {
        self.inner.lifecycle.state()
    }

    pub fn request(&self) -> &Request {
        self.inner.call.request()
    }

    pub fn key(&self) -> &CacheKey {
        &self.inner.key
    }

    pub fn is_cacheable(&self) -> bool {
        self.inner.cacheable
    }
}

/// Cloning yields a new, unexecuted call around a fresh clone of the network
/// call. Execution and cancellation state are not carried over.
impl<T: Send + 'static> Clone for CachedCall<T> {
    fn clone(&self) -> Self {
        CachedCall::new(
            self.inner.call.clone_call(),
            self.inner.codec.clone(),
            self.inner.context.clone(),
            self.inner.caching,
        )
    }
}

impl<T: Send + 'static> Inner<T> {
    fn start(&self) -> Result<bool> {
        if self.call.is_executed() {
            return Err(CallError::AlreadyExecuted.into());
        }
        self.lifecycle.start()
    }

    fn execute_blocking(&self) -> Result<Response<T>> {
        if !self.cacheable {
            return self.call.execute();
        }
        if let Some(response) = self.load_from_cache() {
            return Ok(response);
        }
        let response = self.call.execute()?;
        if self.lifecycle.is_canceled() {
            log_debug!("Call {} canceled during network phase", self.key);
            return Err(CallError::Canceled.into());
        }
        if response.is_successful() {
            self.save(&response);
        }
        Ok(response)
    }

    /// Looks the key up and decodes the entry. Store and codec failures are
    /// logged and reported as a miss.
    fn load_from_cache(&self) -> Option<Response<T>> {
        let data = match self.context.store.get(self.key.as_str()) {
            Ok(Some(data)) => data,
            Ok(None) => {
                log_debug!("Cache miss {} for {}", self.key, self.call.request().url);
                return None;
            }
            Err(err) => {
                log_error!("Cache lookup of {} failed: {}", self.key, err);
                return None;
            }
        };
        match self.codec.decode(&data) {
            Ok(body) => {
                log_info!("Cache hit {} for {}", self.key, self.call.request().url);
                Some(Response::success(body))
            }
            Err(err) => {
                log_error!("Discarding undecodable cache entry {}: {}", self.key, err);
                None
            }
        }
    }

    fn save(&self, response: &Response<T>) {
        let Some(body) = response.body.as_ref() else {
            return;
        };
        let data = match self.codec.encode(body) {
            Ok(data) => data,
            Err(err) => {
                log_error!("Cannot encode response for {}: {}", self.key, err);
                return;
            }
        };
        match self.context.store.put(self.key.as_str(), &data) {
            Ok(()) => log_debug!("Stored {} bytes under {}", data.len(), self.key),
            Err(err) => log_error!("Cannot store cache entry {}: {}", self.key, err),
        }
    }

    fn invalidate(&self) {
        match self.context.store.remove(self.key.as_str()) {
            Ok(()) => log_info!("Invalidated cache entry {}", self.key),
            Err(err) => log_error!("Cannot invalidate cache entry {}: {}", self.key, err),
        }
    }

    /// Goes to the network and updates the store from the completion path
    /// of the network call, never from the caller's thread.
    fn fetch(self: &Arc<Self>, callback: Callback<T>, mode: Fetch) {
        let inner = self.clone();
        self.call.enqueue(Box::new(move |result| {
            inner.update_cache(&result, mode);
            inner.deliver(callback, result);
        }));
    }

    fn update_cache(&self, result: &Result<Response<T>>, mode: Fetch) {
        if self.lifecycle.is_canceled() {
            log_debug!("Call {} canceled, leaving the cache untouched", self.key);
            return;
        }
        let succeeded = matches!(result, Ok(response) if response.is_successful());
        if succeeded {
            if let Ok(response) = result {
                self.save(response);
            }
        } else if mode == Fetch::Refresh && self.context.policy.invalidate_on_refresh_failure {
            self.invalidate();
        }
    }

    fn delegate(self: &Arc<Self>, callback: Callback<T>) {
        let inner = self.clone();
        self.call
            .enqueue(Box::new(move |result| inner.deliver(callback, result)));
    }

    fn deliver(&self, callback: Callback<T>, result: Result<Response<T>>) {
        self.lifecycle.finish(result.is_ok());
        self.context
            .executor
            .execute(Box::new(move || callback(result)));
    }
}
