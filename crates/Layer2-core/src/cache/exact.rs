//! Exact-match cache tier
//!
//! In-memory map of hashed query → entry with lazy TTL eviction.
//! Persisted to `cache/exact_cache.json` write-back style: every Nth `set`
//! flushes all non-expired entries, as do `clear` and `cleanup_expired`.

use super::{key::preview, CacheKey, CacheTier, TierStats, EXACT_PREVIEW_CHARS};
use brainlift_foundation::storage::{ProjectPaths, EXACT_CACHE_FILE};
use brainlift_foundation::{JsonStore, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Persisted exact-cache entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactCacheEntry {
    pub value: Value,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    pub query_preview: String,
}

impl ExactCacheEntry {
    pub fn new(query: &str, value: Value, ttl: Duration) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
            ttl,
            query_preview: preview(query, EXACT_PREVIEW_CHARS),
        }
    }

    /// `now - timestamp > ttl`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let age = now
            .signed_duration_since(self.timestamp)
            .to_std()
            .unwrap_or_default();
        age > self.ttl
    }
}

struct ExactState {
    entries: HashMap<CacheKey, ExactCacheEntry>,
    stats: TierStats,
}

/// Exact-match tier
pub struct ExactCache {
    project_id: String,
    store: JsonStore,
    flush_every: u64,
    state: Mutex<ExactState>,
    // 스냅샷 생성과 저장을 한 번에 하나씩
    flush_lock: Mutex<()>,
}

impl ExactCache {
    /// Open the tier, loading any persisted snapshot.
    ///
    /// An unreadable snapshot is logged and treated as empty.
    pub fn open(paths: &ProjectPaths, flush_every: u64) -> Self {
        let store = paths.cache_store();
        let loaded = match store.load_optional::<HashMap<CacheKey, ExactCacheEntry>>(EXACT_CACHE_FILE)
        {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                warn!("Exact cache snapshot unreadable, starting empty: {}", e);
                HashMap::new()
            }
        };

        let now = Utc::now();
        let total = loaded.len();
        let entries: HashMap<_, _> = loaded
            .into_iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .collect();
        info!(
            project = paths.project_id(),
            "Loaded {} exact cache entries ({} expired dropped)",
            entries.len(),
            total - entries.len()
        );

        Self {
            project_id: paths.project_id().to_string(),
            store,
            flush_every: flush_every.max(1),
            state: Mutex::new(ExactState {
                entries,
                stats: TierStats::default(),
            }),
            flush_lock: Mutex::new(()),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn key(&self, query: &str) -> CacheKey {
        CacheKey::derive(&self.project_id, query)
    }

    /// Look up a query. Expired entries are evicted and count as a miss.
    pub fn get(&self, query: &str) -> Option<Value> {
        let key = self.key(query);
        let mut state = self.state.lock();

        match state.entries.get(&key).map(|e| e.is_expired_at(Utc::now())) {
            None => {
                state.stats.misses += 1;
                debug!("exact miss: {}", key);
                return None;
            }
            Some(true) => {
                state.entries.remove(&key);
                state.stats.evictions += 1;
                state.stats.misses += 1;
                debug!("exact expired: {}", key);
                return None;
            }
            Some(false) => {}
        }

        state.stats.hits += 1;
        debug!("exact hit: {}", key);
        state.entries.get(&key).map(|entry| entry.value.clone())
    }

    /// Store a value, overwriting any existing entry for the query.
    pub fn set(&self, query: &str, value: Value, ttl: Duration) {
        if self.insert(query, value, ttl) {
            if let Err(e) = self.flush() {
                warn!("Exact cache flush failed: {}", e);
            }
        }
    }

    /// In-memory part of `set`. Returns true when this set is due a flush;
    /// the caller is then responsible for calling [`ExactCache::flush`].
    pub fn insert(&self, query: &str, value: Value, ttl: Duration) -> bool {
        let key = self.key(query);
        let mut state = self.state.lock();
        state
            .entries
            .insert(key, ExactCacheEntry::new(query, value, ttl));
        state.stats.sets += 1;
        state.stats.sets % self.flush_every == 0
    }

    /// Remove by derived key
    pub fn delete(&self, key: &str) -> bool {
        let key = CacheKey::from_raw(key);
        self.state.lock().entries.remove(&key).is_some()
    }

    /// Drop all entries and persist the empty snapshot
    pub fn clear(&self) -> Result<()> {
        let removed = {
            let mut state = self.state.lock();
            let n = state.entries.len();
            state.entries.clear();
            n
        };
        info!(project = %self.project_id, "Cleared {} exact cache entries", removed);
        self.flush()
    }

    /// Remove every expired entry; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let removed = {
            let mut state = self.state.lock();
            let before = state.entries.len();
            state.entries.retain(|_, entry| !entry.is_expired_at(now));
            let removed = before - state.entries.len();
            state.stats.evictions += removed as u64;
            removed
        };

        if removed > 0 {
            info!("Removed {} expired exact cache entries", removed);
            if let Err(e) = self.flush() {
                warn!("Exact cache flush failed: {}", e);
            }
        }
        removed
    }

    /// Write all non-expired entries to disk
    pub fn flush(&self) -> Result<()> {
        let _flushing = self.flush_lock.lock();
        let now = Utc::now();
        let snapshot: HashMap<CacheKey, ExactCacheEntry> = {
            let state = self.state.lock();
            state
                .entries
                .iter()
                .filter(|(_, entry)| !entry.is_expired_at(now))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        debug!("Flushing {} exact cache entries", snapshot.len());
        self.store.save(EXACT_CACHE_FILE, &snapshot)
    }

    pub fn stats(&self) -> TierStats {
        self.state.lock().stats
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheTier for ExactCache {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn get(&self, query: &str) -> Result<Option<Value>> {
        Ok(ExactCache::get(self, query))
    }

    fn set(&self, query: &str, value: Value, ttl: Duration) -> Result<()> {
        ExactCache::set(self, query, value, ttl);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(ExactCache::delete(self, key))
    }

    fn clear(&self) -> Result<()> {
        ExactCache::clear(self)
    }

    fn cleanup_expired(&self) -> Result<usize> {
        Ok(ExactCache::cleanup_expired(self))
    }

    fn stats(&self) -> TierStats {
        ExactCache::stats(self)
    }
}

/// Duration as fractional seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(ttl.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
