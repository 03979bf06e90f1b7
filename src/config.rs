//! Config file parsing and validation.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::defaults::{DEFAULT_TIMEOUT_SECONDS, DEFAULT_WORKERS};
use crate::error::{AddContext, CallError};
use crate::key::KeyScheme;
use crate::policy::CachePolicy;
use crate::Result;

pub trait ConfigProperties {
    /// Directory of the file cache. `None` means cache in memory.
    fn cache_location(&self) -> Option<&str> {
        None
    }
    fn workers(&self) -> usize {
        DEFAULT_WORKERS
    }
    fn timeout(&self) -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
    }
    fn key_scheme(&self) -> KeyScheme {
        KeyScheme::default()
    }
    fn invalidate_on_refresh_failure(&self) -> bool {
        true
    }
    fn policy(&self) -> CachePolicy {
        CachePolicy {
            key_scheme: self.key_scheme(),
            invalidate_on_refresh_failure: self.invalidate_on_refresh_failure(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    cache_location: Option<String>,
    workers: usize,
    timeout_seconds: u64,
    key_scheme: KeyScheme,
    invalidate_on_refresh_failure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_location: None,
            workers: DEFAULT_WORKERS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            key_scheme: KeyScheme::default(),
            invalidate_on_refresh_failure: true,
        }
    }
}

impl Config {
    pub fn new<T: Read>(mut reader: T) -> Result<Self> {
        let mut config_data = String::new();
        reader.read_to_string(&mut config_data)?;
        toml::from_str(&config_data)
            .map_err(|err| CallError::ConfigurationError(err.message().to_string()).into())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .err_context(format!("Cannot open config file {}", path.display()))?;
        Config::new(file)
    }

    /// Command line flags win over the file.
    pub fn with_cache_location(mut self, location: Option<String>) -> Self {
        if location.is_some() {
            self.cache_location = location;
        }
        self
    }
}

impl ConfigProperties for Config {
    fn cache_location(&self) -> Option<&str> {
        self.cache_location.as_deref()
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn key_scheme(&self) -> KeyScheme {
        self.key_scheme
    }

    fn invalidate_on_refresh_failure(&self) -> bool {
        self.invalidate_on_refresh_failure
    }
}

impl ConfigProperties for Arc<Config> {
    fn cache_location(&self) -> Option<&str> {
        self.as_ref().cache_location()
    }

    fn workers(&self) -> usize {
        self.as_ref().workers()
    }

    fn timeout(&self) -> Duration {
        self.as_ref().timeout()
    }

    fn key_scheme(&self) -> KeyScheme {
        self.as_ref().key_scheme()
    }

    fn invalidate_on_refresh_failure(&self) -> bool {
        self.as_ref().invalidate_on_refresh_failure()
    }
}
