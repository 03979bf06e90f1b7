use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::CacheStore;
use crate::Result;

#[derive(Default)]
pub struct InMemoryStore {
    cache: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking writer cannot leave a half written Vec behind, so a
    // poisoned map is still consistent.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn size(&self) -> Result<usize> {
        Ok(self.entries().len())
    }

    fn clear(&self) -> Result<()> {
        self.entries().clear();
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.entries().contains_key(key))
    }
}
