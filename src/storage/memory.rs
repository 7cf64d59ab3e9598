use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::domain::Update;
use crate::errors::{FrontpageError, FrontpageResult};
use crate::storage::traits::CacheBackend;

/// `None` expiry means the TTL ran past what `Instant` can represent.
type Entries = HashMap<(String, String), (Option<Instant>, Vec<Update>)>;

/// Process-local cache. Contents vanish on restart.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> FrontpageResult<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| FrontpageError::Cache("memory cache lock poisoned".to_string()))
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, region: &str, key: &str) -> FrontpageResult<Option<Vec<Update>>> {
        let mut entries = self.entries()?;
        let id = (region.to_string(), key.to_string());

        match entries.get(&id) {
            Some((expires_at, updates))
                if expires_at.map_or(true, |expires_at| Instant::now() < expires_at) =>
            {
                Ok(Some(updates.clone()))
            }
            Some(_) => {
                entries.remove(&id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(
        &self,
        region: &str,
        key: &str,
        updates: &[Update],
        ttl: Duration,
    ) -> FrontpageResult<()> {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries()?.insert(
            (region.to_string(), key.to_string()),
            (expires_at, updates.to_vec()),
        );
        Ok(())
    }

    fn invalidate(&self, region: &str, key: &str) -> FrontpageResult<()> {
        self.entries()?
            .remove(&(region.to_string(), key.to_string()));
        Ok(())
    }

    fn clear(&self) -> FrontpageResult<()> {
        self.entries()?.clear();
        Ok(())
    }
}
