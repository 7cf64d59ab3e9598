use std::time::Duration;

use chrono::Utc;
use rusqlite::OptionalExtension;

use crate::domain::Update;
use crate::errors::FrontpageResult;
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::CacheBackend;

/// Cache backend that survives restarts. Values are stored as JSON.
pub struct SqliteCache {
    storage: SqliteStorage,
}

impl SqliteCache {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }

    /// Drop every expired row. Returns how many were removed.
    pub fn purge_expired(&self) -> FrontpageResult<usize> {
        let conn = self.storage.connection()?;
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            [Utc::now().timestamp()],
        )?;
        Ok(removed)
    }
}

impl CacheBackend for SqliteCache {
    fn get(&self, region: &str, key: &str) -> FrontpageResult<Option<Vec<Update>>> {
        let conn = self.storage.connection()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE region = ?1 AND key = ?2 AND expires_at > ?3",
                (region, key, Utc::now().timestamp()),
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
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
        let value = serde_json::to_string(updates)?;
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl);

        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (region, key, value, expires_at) VALUES (?1, ?2, ?3, ?4)",
            (region, key, value, expires_at),
        )?;
        Ok(())
    }

    fn invalidate(&self, region: &str, key: &str) -> FrontpageResult<()> {
        let conn = self.storage.connection()?;
        conn.execute(
            "DELETE FROM cache_entries WHERE region = ?1 AND key = ?2",
            (region, key),
        )?;
        Ok(())
    }

    fn clear(&self) -> FrontpageResult<()> {
        let conn = self.storage.connection()?;
        conn.execute("DELETE FROM cache_entries", [])?;
        Ok(())
    }
}
