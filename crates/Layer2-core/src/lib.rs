//! brainlift-core: Result cache and budget tracking
//!
//! Layer2 - 생성 비용을 줄이는 캐시와 사용량 추적 레이어
//!
//! # 주요 모듈
//!
//! - `cache`: exact + semantic 2계층 캐시, `CacheCoordinator`
//! - `budget`: 토큰 추정, 단가 표, `BudgetTracker`
//!
//! # 사용 예시
//!
//! ```ignore
//! use brainlift_core::{BudgetTracker, CacheCoordinator};
//! use brainlift_foundation::{BrainliftConfig, ProjectPaths};
//!
//! let paths = ProjectPaths::platform_default("my-project")?;
//! let config = BrainliftConfig::load(&paths)?;
//!
//! let cache = CacheCoordinator::new(&paths, config.cache.clone(), Some(embedder))?;
//! let response = cache
//!     .get_or_generate(&diff, |q| async move { analyze(q).await }, config.cache.default_ttl())
//!     .await?;
//!
//! let budget = BudgetTracker::open(&paths, config.orchestrator.budget.clone());
//! budget.record_usage(1200, "gpt-4-turbo", Some("abc123"));
//! ```

pub mod budget;
pub mod cache;

// Re-exports: Cache
pub use cache::{
    cosine_similarity, CacheCoordinator, CacheHit, CacheKey, CacheStatsReport, CacheTier,
    CachedResponse, CleanupReport, ClearScope, ExactCache, ExactCacheEntry, ResponseMetadata,
    SemanticCache, SemanticSizeStats, SimilarityMatch, TierStats,
};

// Re-exports: Budget
pub use budget::{
    estimate_tokens, BudgetCheck, BudgetTracker, ResetPeriod, UsageBucket, UsageRecord,
    UsageSummary,
};
