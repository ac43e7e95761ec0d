//! # Brainlift Result Cache
//!
//! Two-tier cache in front of expensive model generation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CacheCoordinator                          │
//! │                                                              │
//! │  query ──▶ 1. ExactCache    (sha256(project:query), TTL)     │
//! │              │ miss                                          │
//! │              ▼                                               │
//! │           2. embed(query) ──▶ SemanticCache (cosine ≥ θ)     │
//! │              │ miss                                          │
//! │              ▼                                               │
//! │           3. generator(query)                                │
//! │              │                                               │
//! │              └──▶ write-back (exact TTL, semantic TTL × 24)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both tiers are project scoped. Storage failures degrade to a miss;
//! only generation failures reach the caller.

mod coordinator;
mod exact;
mod key;
mod semantic;

pub use coordinator::{
    CacheCoordinator, CacheHit, CacheStatsReport, CachedResponse, CleanupReport, ClearScope,
    EmbeddingReport, ExactCacheReport, OverallStats, ResponseMetadata, SemanticCacheReport,
};
pub use exact::{ExactCache, ExactCacheEntry};
pub use key::CacheKey;
pub use semantic::{cosine_similarity, SemanticCache, SemanticSizeStats, SimilarityMatch};

use brainlift_foundation::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Exact-tier preview length
pub const EXACT_PREVIEW_CHARS: usize = 100;

/// Semantic-tier preview length
pub const SEMANTIC_PREVIEW_CHARS: usize = 200;

// ============================================================================
// TierStats
// ============================================================================

/// 계층별 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
}

impl TierStats {
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

// ============================================================================
// CacheTier
// ============================================================================

/// 공통 캐시 계층 인터페이스
///
/// The semantic tier only answers embedding queries; its single-key
/// `get`/`set` fail with `Error::Unsupported`.
pub trait CacheTier: Send + Sync {
    fn name(&self) -> &'static str;

    fn get(&self, query: &str) -> Result<Option<Value>>;

    fn set(&self, query: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Remove by derived key. Returns whether anything was removed.
    fn delete(&self, key: &str) -> Result<bool>;

    fn clear(&self) -> Result<()>;

    /// Remove expired entries, returning how many were removed
    fn cleanup_expired(&self) -> Result<usize>;

    fn stats(&self) -> TierStats;
}
