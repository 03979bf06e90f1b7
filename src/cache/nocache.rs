use crate::cache::CacheStore;

use crate::Result;

/// Store that never retains anything. Every lookup is a miss.
pub struct NoCache;

impl CacheStore for NoCache {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
    fn put(&self, _key: &str, _value: &[u8]) -> Result<()> {
        Ok(())
    }
    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }
    fn size(&self) -> Result<usize> {
        Ok(0)
    }
    fn clear(&self) -> Result<()> {
        Ok(())
    }
}
