//! Expiring JSON records stored in the dashboard state directory.

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DashboardError, DashboardResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub payload: T,
    /// When the record was written
    pub timestamp: DateTime<Local>,
    pub expires_at: DateTime<Local>,
}

impl<T> CacheRecord<T> {
    pub fn is_fresh(&self, now: DateTime<Local>) -> bool {
        now < self.expires_at
    }
}

/// File-backed cache, one file per key.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Fresh record for `key`, if any.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CacheRecord<T>> {
        self.read_at(key, Local::now()).await
    }

    /// Like [`Cache::read`] with an explicit notion of "now".
    pub async fn read_at<T: DeserializeOwned>(
        &self,
        key: &str,
        now: DateTime<Local>,
    ) -> Option<CacheRecord<T>> {
        let path = self.path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read cache file {}: {}", path.display(), e);
                return None;
            }
        };

        let record: CacheRecord<T> = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache record {}: {}", key, e);
                return None;
            }
        };

        if !record.is_fresh(now) {
            tracing::debug!("Cache record {} expired at {}", key, record.expires_at.to_rfc3339());
            return None;
        }
        Some(record)
    }

    /// Store `payload` under `key`, valid for `ttl`.
    pub async fn write<T: Serialize>(&self, key: &str, payload: &T, ttl: Duration) -> DashboardResult<()> {
        self.write_at(key, payload, ttl, Local::now()).await
    }

    pub async fn write_at<T: Serialize>(
        &self,
        key: &str,
        payload: &T,
        ttl: Duration,
        now: DateTime<Local>,
    ) -> DashboardResult<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| DashboardError::Cache(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        let record = CacheRecord {
            payload,
            timestamp: now,
            expires_at: now + ttl,
        };
        let bytes = serde_json::to_vec_pretty(&record).map_err(io::Error::from)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path(key), bytes).await?;
        tracing::debug!("Cached {} until {}", key, record.expires_at.to_rfc3339());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

    fn temp_cache() -> Cache {
        let n = NEXT_DIR.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "household-dashboard-cache-{}-{}",
            std::process::id(),
            n
        ));
        let _ = std::fs::remove_dir_all(&dir);
        Cache::new(dir)
    }

    #[tokio::test]
    async fn test_fresh_record_is_returned() {
        let cache = temp_cache();
        let now = Local::now();
        cache
            .write_at("trains", &vec![1, 2, 3], Duration::from_secs(600), now)
            .await
            .unwrap();

        let record: CacheRecord<Vec<i32>> = cache
            .read_at("trains", now + chrono::Duration::minutes(9))
            .await
            .unwrap();
        assert_eq!(record.payload, vec![1, 2, 3]);
        assert_eq!(record.timestamp, now);
        assert_eq!(record.expires_at, now + chrono::Duration::minutes(10));
    }

    #[tokio::test]
    async fn test_expired_record_reads_as_absent() {
        let cache = temp_cache();
        let now = Local::now();
        cache
            .write_at("trains", &"payload", Duration::from_secs(600), now)
            .await
            .unwrap();

        let at_expiry = now + chrono::Duration::minutes(10);
        assert!(cache.read_at::<String>("trains", at_expiry).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_record_reads_as_absent() {
        let cache = temp_cache();
        assert!(cache.read::<String>("nothing").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_reads_as_absent() {
        let cache = temp_cache();
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.dir().join("trains.json"), b"{ not json").unwrap();
        assert!(cache.read::<String>("trains").await.is_none());
    }
}
