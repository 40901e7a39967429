//! Snapshot cache: provider-keyed persistence of the most recent
//! successful [`UsageSnapshot`].
//!
//! The cache has no iteration, no eviction policy and no TTL. The
//! pipeline enforces staleness (see [`crate::pipeline`]). It guarantees
//! only atomic per-key read/write, so two implementations can satisfy
//! the identical [`SnapshotCache`] trait: an in-memory map for tests
//! and a one-file-per-provider JSON store for production use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use exactobar_core::UsageSnapshot;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Error type for cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem I/O failure.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cached blob could not be parsed back into a snapshot.
    #[error("cache deserialize error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Provider-keyed persistence of the most recently saved snapshot.
///
/// `save` overwrites any prior value for `snapshot.provider`; `load`
/// returns the most recent value for a provider id, or `None` if there
/// is none. Implementations must be safe to call concurrently from
/// many tasks (the pipeline only ever touches its own provider's key,
/// but nothing here assumes that external callers will be so polite).
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Persists `snapshot`, keyed by `snapshot.provider`.
    async fn save(&self, snapshot: &UsageSnapshot) -> Result<(), CacheError>;

    /// Returns the most recently saved snapshot for `provider_id`, if
    /// any. A load failure (missing file, corrupt blob) is treated as
    /// "no cached value" rather than propagated as an error, since the
    /// pipeline has no fallback-from-fallback path.
    async fn load(&self, provider_id: &str) -> Option<UsageSnapshot>;
}

// ============================================================================
// In-memory cache
// ============================================================================

/// An in-memory [`SnapshotCache`], primarily the test double named in
/// the pipeline's own test suite but equally usable by a caller that
/// doesn't want snapshots to outlive the process.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, UsageSnapshot>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotCache for MemoryCache {
    async fn save(&self, snapshot: &UsageSnapshot) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .insert(snapshot.provider.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, provider_id: &str) -> Option<UsageSnapshot> {
        self.entries.read().await.get(provider_id).cloned()
    }
}

// ============================================================================
// File-backed cache
// ============================================================================

/// A [`SnapshotCache`] backed by one JSON file per provider id under a
/// directory (typically resolved via `dirs::cache_dir()` by the
/// caller). Field names are snake_case and timestamps are RFC3339, per
/// the recommended on-disk encoding.
pub struct FileCache {
    dir: PathBuf,
    /// Serializes writes to the same provider file; reads never race a
    /// write for a *different* key, only the same one, which this
    /// coarse-grained lock also protects (simpler than per-key locks
    /// for a cache with no hot path).
    lock: RwLock<()>,
}

impl FileCache {
    /// Creates a cache rooted at `dir`, creating the directory
    /// (and any missing parents) if it does not already exist.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            lock: RwLock::new(()),
        })
    }

    fn path_for(&self, provider_id: &str) -> PathBuf {
        self.dir.join(format!("{provider_id}.json"))
    }

    /// Returns the directory this cache is rooted at.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SnapshotCache for FileCache {
    async fn save(&self, snapshot: &UsageSnapshot) -> Result<(), CacheError> {
        let _guard = self.lock.write().await;
        let path = self.path_for(&snapshot.provider);
        let json = serde_json::to_vec_pretty(snapshot)?;
        // Write to a temp file first so a crash mid-write never leaves
        // a truncated blob behind for the next `load`.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        debug!(provider = %snapshot.provider, path = %path.display(), "saved snapshot to cache");
        Ok(())
    }

    async fn load(&self, provider_id: &str) -> Option<UsageSnapshot> {
        let _guard = self.lock.read().await;
        let path = self.path_for(provider_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(provider = %provider_id, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(provider = %provider_id, error = %e, "cache blob corrupt, treating as miss");
                None
            }
        }
    }
}

/// Convenience alias for an `Arc`-shared, dyn-dispatched cache (the
/// shape every pipeline and the routing service actually hold).
pub type SharedCache = Arc<dyn SnapshotCache>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use exactobar_core::{PeriodType, UsagePeriod};

    fn sample(provider: &str) -> UsageSnapshot {
        UsageSnapshot::new(provider, "mock")
            .with_period(UsagePeriod::new("weekly", 30, PeriodType::Weekly))
    }

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        assert!(cache.load("claude").await.is_none());

        cache.save(&sample("claude")).await.unwrap();
        let loaded = cache.load("claude").await.unwrap();
        assert_eq!(loaded.provider, "claude");
    }

    #[tokio::test]
    async fn test_memory_cache_overwrites_same_key() {
        let cache = MemoryCache::new();
        cache.save(&sample("claude")).await.unwrap();
        let mut second = sample("claude");
        second.source = "oauth".to_string();
        cache.save(&second).await.unwrap();

        let loaded = cache.load("claude").await.unwrap();
        assert_eq!(loaded.source, "oauth");
    }

    #[tokio::test]
    async fn test_memory_cache_disjoint_keys() {
        let cache = MemoryCache::new();
        cache.save(&sample("claude")).await.unwrap();
        cache.save(&sample("codex")).await.unwrap();

        assert_eq!(cache.load("claude").await.unwrap().provider, "claude");
        assert_eq!(cache.load("codex").await.unwrap().provider, "codex");
    }

    #[tokio::test]
    async fn test_file_cache_roundtrip() {
        let tmp = std::env::temp_dir().join(format!("exactobar-cache-test-{}", std::process::id()));
        let cache = FileCache::new(&tmp).await.unwrap();

        assert!(cache.load("claude").await.is_none());
        cache.save(&sample("claude")).await.unwrap();

        let loaded = cache.load("claude").await.unwrap();
        assert_eq!(loaded.provider, "claude");
        assert_eq!(loaded.periods[0].utilization(), 30);

        tokio::fs::remove_dir_all(&tmp).await.ok();
    }

    #[tokio::test]
    async fn test_file_cache_missing_key_is_none() {
        let tmp = std::env::temp_dir().join(format!("exactobar-cache-test-missing-{}", std::process::id()));
        let cache = FileCache::new(&tmp).await.unwrap();
        assert!(cache.load("nonexistent").await.is_none());
        tokio::fs::remove_dir_all(&tmp).await.ok();
    }
}
