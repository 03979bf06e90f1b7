pub mod filesystem;
pub mod inmemory;
pub mod nocache;

use crate::Result;
pub use filesystem::FileStore;
pub use inmemory::InMemoryStore;
pub use nocache::NoCache;

/// Byte oriented key/value store backing the cached calls. Implementors must
/// be safe for concurrent use from many calls at once; per key, the last
/// write wins. `get` returning `Ok(None)` means "not cached", which is not the
/// same as an empty entry.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn size(&self) -> Result<usize>;
    fn clear(&self) -> Result<()>;
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
