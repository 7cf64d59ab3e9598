use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::Update;
use crate::errors::FrontpageResult;

/// Namespaced key/value store with per-entry expiry.
#[cfg_attr(test, mockall::automock)]
pub trait CacheBackend: Send + Sync {
    /// Returns the stored updates, or `None` when absent or expired.
    fn get(&self, region: &str, key: &str) -> FrontpageResult<Option<Vec<Update>>>;
    fn put(&self, region: &str, key: &str, updates: &[Update], ttl: Duration)
        -> FrontpageResult<()>;
    fn invalidate(&self, region: &str, key: &str) -> FrontpageResult<()>;
    fn clear(&self) -> FrontpageResult<()>;
}

/// A named slice of a cache backend where everything shares one TTL.
pub struct CacheRegion<'a> {
    backend: &'a dyn CacheBackend,
    name: &'a str,
    ttl: Duration,
}

impl<'a> CacheRegion<'a> {
    pub fn new(backend: &'a dyn CacheBackend, name: &'a str, ttl: Duration) -> Self {
        Self { backend, name, ttl }
    }

    /// Return the cached value for `key`, or run `compute` and store what it returns.
    ///
    /// A `None` from `compute` means the fetch failed: nothing is stored, the key is
    /// invalidated, and an empty list comes back. Backend errors are logged and treated
    /// as a miss so callers always get an answer.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> Vec<Update>
    where
        F: FnOnce() -> Option<Vec<Update>>,
    {
        match self.backend.get(self.name, key) {
            Ok(Some(updates)) => {
                debug!(region = self.name, key, "cache hit");
                return updates;
            }
            Ok(None) => debug!(region = self.name, key, "cache miss"),
            Err(e) => warn!(region = self.name, key, error = %e, "cache lookup failed"),
        }

        match compute() {
            Some(updates) => {
                if let Err(e) = self.backend.put(self.name, key, &updates, self.ttl) {
                    warn!(region = self.name, key, error = %e, "cache store failed");
                }
                updates
            }
            None => {
                self.invalidate(key);
                Vec::new()
            }
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Err(e) = self.backend.invalidate(self.name, key) {
            warn!(region = self.name, key, error = %e, "cache invalidation failed");
        }
    }
}
