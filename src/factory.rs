use std::sync::Arc;

use crate::cache::{CacheStore, FileStore, InMemoryStore};
use crate::call::NetworkCall;
use crate::cached::CachedCall;
use crate::codec::Codec;
use crate::config::ConfigProperties;
use crate::error::CallError;
use crate::exec::WorkerPool;
use crate::executor::{Executor, Inline};
use crate::policy::CachePolicy;
use crate::{defaults, log_debug, log_info, Result};

/// Collaborators shared by every call a factory produces.
pub(crate) struct Context {
    pub store: Arc<dyn CacheStore>,
    pub executor: Arc<dyn Executor>,
    pub pool: Arc<WorkerPool>,
    pub policy: CachePolicy,
}

/// Wraps network calls into [`CachedCall`]s that all share one store,
/// dispatch executor, worker pool and cache policy.
#[derive(Clone)]
pub struct CachedCallFactory {
    context: Arc<Context>,
}

impl CachedCallFactory {
    pub fn new(
        store: Arc<dyn CacheStore>,
        executor: Arc<dyn Executor>,
        pool: Arc<WorkerPool>,
        policy: CachePolicy,
    ) -> Self {
        CachedCallFactory {
            context: Arc::new(Context {
                store,
                executor,
                pool,
                policy,
            }),
        }
    }

    pub fn builder() -> CachedCallFactoryBuilder {
        CachedCallFactoryBuilder::default()
    }

    /// File backed store when a cache location is configured, in memory
    /// otherwise. Callbacks are dispatched inline on the thread that
    /// completed the call.
    pub fn from_config(config: &impl ConfigProperties) -> Result<Self> {
        let store: Arc<dyn CacheStore> = match config.cache_location() {
            Some(location) => {
                let store = FileStore::new(location);
                store.validate_cache_location()?;
                log_info!("Using file cache at {}", location);
                Arc::new(store)
            }
            None => {
                log_info!("No cache location configured, caching in memory");
                Arc::new(InMemoryStore::new())
            }
        };
        CachedCallFactory::builder()
            .store(store)
            .executor(Arc::new(Inline))
            .pool(Arc::new(WorkerPool::new(config.workers())?))
            .policy(config.policy())
            .build()
    }

    /// Wraps `call`. Whether it is cacheable follows from its method.
    pub fn adapt<T: Send + 'static>(
        &self,
        call: Box<dyn NetworkCall<T>>,
        codec: Arc<dyn Codec<T>>,
    ) -> CachedCall<T> {
        self.adapt_with(call, codec, None)
    }

    /// Wraps `call`, with `caching` overriding the method based decision
    /// when set.
    pub fn adapt_with<T: Send + 'static>(
        &self,
        call: Box<dyn NetworkCall<T>>,
        codec: Arc<dyn Codec<T>>,
        caching: Option<bool>,
    ) -> CachedCall<T> {
        let cached = CachedCall::new(call, codec, self.context.clone(), caching);
        log_debug!(
            "Adapted {} {} (cacheable: {})",
            cached.request().method,
            cached.request().url,
            cached.is_cacheable()
        );
        cached
    }

    pub fn store(&self) -> Arc<dyn CacheStore> {
        self.context.store.clone()
    }

    pub fn pool(&self) -> Arc<WorkerPool> {
        self.context.pool.clone()
    }

    pub fn policy(&self) -> CachePolicy {
        self.context.policy
    }
}

#[derive(Default)]
pub struct CachedCallFactoryBuilder {
    store: Option<Arc<dyn CacheStore>>,
    executor: Option<Arc<dyn Executor>>,
    pool: Option<Arc<WorkerPool>>,
    policy: CachePolicy,
}

impl CachedCallFactoryBuilder {
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// A store is mandatory. The executor defaults to [`Inline`] and the
    /// pool to [`defaults::DEFAULT_WORKERS`] threads.
    pub fn build(self) -> Result<CachedCallFactory> {
        let store = self.store.ok_or_else(|| {
            CallError::ConfigurationError("A cache store is required".to_string())
        })?;
        let executor = self.executor.unwrap_or_else(|| Arc::new(Inline));
        let pool = match self.pool {
            Some(pool) => pool,
            None => Arc::new(WorkerPool::new(defaults::DEFAULT_WORKERS)?),
        };
        Ok(CachedCallFactory::new(store, executor, pool, self.policy))
    }
}
