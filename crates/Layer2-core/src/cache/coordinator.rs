//! Cache Coordinator - exact → semantic → generate
//!
//! 두 계층을 조합해 `get_or_generate` 정책을 구현하고 히트/미스/지연 메트릭을
//! 수집한다. 미스 시 생성 결과는 exact 메모리 맵에 즉시 들어가고, 디스크
//! flush와 semantic 저장, 통계 갱신은 별도의 제한된 write-back 작업이 맡는다.

use super::{ExactCache, SemanticCache, SemanticSizeStats, TierStats};
use crate::budget::pricing;
use brainlift_foundation::storage::{ProjectPaths, STATS_FILE};
use brainlift_foundation::{CacheConfig, Error, JsonStore, Result};
use brainlift_provider::EmbeddingProvider;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const TRUNCATION_MARKER: &str = "... [truncated]";

// ============================================================================
// Response types
// ============================================================================

/// 어느 계층에서 응답했는지
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheHit {
    Exact,
    Semantic,
    Miss,
}

impl CacheHit {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheHit::Exact => "exact",
            CacheHit::Semantic => "semantic",
            CacheHit::Miss => "miss",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub timestamp: DateTime<Utc>,
    pub project_id: String,
    pub cache_hit: CacheHit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_hours: Option<f64>,
    pub latency_ms: f64,
}

/// `get_or_generate` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub data: Value,
    pub metadata: ResponseMetadata,
}

impl CachedResponse {
    pub fn cache_hit(&self) -> CacheHit {
        self.metadata.cache_hit
    }

    pub fn is_hit(&self) -> bool {
        self.metadata.cache_hit != CacheHit::Miss
    }
}

/// 지울 계층
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearScope {
    #[default]
    All,
    Exact,
    Semantic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub exact: usize,
    pub semantic: usize,
}

// ============================================================================
// Stats report (cache/stats.json)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub hit_rate: f64,
    pub total_requests: u64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExactCacheReport {
    #[serde(flatten)]
    pub tier: TierStats,
    pub hit_rate: f64,
    pub hit_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticCacheReport {
    pub enabled: bool,
    #[serde(flatten)]
    pub tier: TierStats,
    pub hit_count: u64,
    pub size: Option<SemanticSizeStats>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingReport {
    pub generations: u64,
    pub estimated_cost: f64,
}

/// Aggregate statistics, rewritten to `cache/stats.json` on every recompute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub project_id: String,
    pub generated_at: DateTime<Utc>,
    pub overall: OverallStats,
    pub exact_cache: ExactCacheReport,
    pub semantic_cache: SemanticCacheReport,
    pub embeddings: EmbeddingReport,
}

impl CacheStatsReport {
    /// Read the last persisted report without a coordinator
    pub fn load(paths: &ProjectPaths) -> Result<Option<Self>> {
        paths.cache_store().load_optional(STATS_FILE)
    }
}

#[derive(Debug, Default)]
struct CoordinatorMetrics {
    exact_hits: u64,
    semantic_hits: u64,
    misses: u64,
    embedding_generations: u64,
    total_latency_ms: f64,
    request_count: u64,
}

// ============================================================================
// CacheCoordinator
// ============================================================================

struct Inner {
    project_id: String,
    config: CacheConfig,
    exact: ExactCache,
    semantic: Option<Arc<SemanticCache>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    stats_store: JsonStore,
    metrics: Mutex<CoordinatorMetrics>,
    // stats.json 계산과 저장을 직렬화
    stats_write: Mutex<()>,
    writeback: Arc<Semaphore>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

/// Two-tier cache front for one project
#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<Inner>,
}

impl CacheCoordinator {
    /// Open both tiers for a project.
    ///
    /// A semantic store that cannot be opened is logged and the coordinator
    /// runs exact-only. Without an embedder the semantic tier is never consulted.
    pub fn new(
        paths: &ProjectPaths,
        config: CacheConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self> {
        config.validate()?;

        let exact = ExactCache::open(paths, config.flush_every);
        let semantic = match SemanticCache::open(paths, config.similarity_threshold) {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                warn!("Semantic cache unavailable, continuing exact-only: {}", e);
                None
            }
        };

        info!(
            project = paths.project_id(),
            semantic = semantic.is_some(),
            embedder = embedder.is_some(),
            "Cache coordinator ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                project_id: paths.project_id().to_string(),
                writeback: Arc::new(Semaphore::new(config.writeback_workers)),
                config,
                exact,
                semantic,
                embedder,
                stats_store: paths.cache_store(),
                metrics: Mutex::new(CoordinatorMetrics::default()),
                stats_write: Mutex::new(()),
                pending: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn exact(&self) -> &ExactCache {
        &self.inner.exact
    }

    pub fn semantic(&self) -> Option<&SemanticCache> {
        self.inner.semantic.as_deref()
    }

    /// Resolve `query` from cache or run `generator`.
    ///
    /// Generation errors propagate; cache and embedding errors only log.
    pub async fn get_or_generate<F, Fut>(
        &self,
        query: &str,
        generator: F,
        ttl: Duration,
    ) -> Result<CachedResponse>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let started = Instant::now();

        if !self.inner.config.enabled {
            let data = self.generate(query, generator, started).await?;
            return Ok(self.respond(data, CacheHit::Miss, None, started));
        }

        // 1. exact
        if let Some(data) = self.inner.exact.get(query) {
            self.inner.metrics.lock().exact_hits += 1;
            return Ok(self.respond(data, CacheHit::Exact, None, started));
        }

        // 2. semantic
        let embedding = self.embed(query).await;
        if let Some(found) = self.lookup_semantic(embedding.as_deref()).await {
            self.inner.metrics.lock().semantic_hits += 1;
            let (data, similarity, age) = found;
            return Ok(self.respond(data, CacheHit::Semantic, Some((similarity, age)), started));
        }

        // 3. generate
        let data = self.generate(query, generator, started).await?;
        // 같은 쿼리의 다음 호출이 write-back 완료를 기다리지 않고 exact 히트하도록
        let flush_due = self.inner.exact.insert(query, data.clone(), ttl);
        self.schedule_population(query.to_string(), data.clone(), embedding, ttl, flush_due);
        Ok(self.respond(data, CacheHit::Miss, None, started))
    }

    async fn generate<F, Fut>(&self, query: &str, generator: F, started: Instant) -> Result<Value>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        self.inner.metrics.lock().misses += 1;
        debug!(project = %self.inner.project_id, "cache miss, generating");

        match generator(query.to_string()).await {
            Ok(data) => Ok(data),
            Err(e) => {
                self.record_latency(started);
                Err(match e {
                    Error::Generation(_) => e,
                    other => Error::Generation(other.to_string()),
                })
            }
        }
    }

    /// Embedding for the semantic tier; None on any failure
    async fn embed(&self, query: &str) -> Option<Vec<f32>> {
        self.inner.semantic.as_ref()?;
        let embedder = self.inner.embedder.as_ref()?;
        let text = truncate_for_embedding(query, self.inner.config.max_embedding_chars);

        match embedder.embed(&text).await {
            Ok(embedding) => {
                self.inner.metrics.lock().embedding_generations += 1;
                Some(embedding)
            }
            Err(e) => {
                let err: Error = Error::Embedding(e.to_string());
                warn!("{}; skipping semantic tier", err);
                None
            }
        }
    }

    async fn lookup_semantic(&self, embedding: Option<&[f32]>) -> Option<(Value, f32, Duration)> {
        let semantic = Arc::clone(self.inner.semantic.as_ref()?);
        let embedding = embedding?.to_vec();

        let result =
            tokio::task::spawn_blocking(move || semantic.find_similar(&embedding, None)).await;

        match result {
            Ok(Ok(found)) => found.map(|m| (m.payload, m.similarity, m.age)),
            Ok(Err(e)) => {
                warn!("Semantic lookup failed, treating as miss: {}", e);
                None
            }
            Err(e) => {
                warn!("Semantic lookup task failed: {}", e);
                None
            }
        }
    }

    fn respond(
        &self,
        data: Value,
        cache_hit: CacheHit,
        semantic: Option<(f32, Duration)>,
        started: Instant,
    ) -> CachedResponse {
        let latency_ms = self.record_latency(started);
        CachedResponse {
            data,
            metadata: ResponseMetadata {
                timestamp: Utc::now(),
                project_id: self.inner.project_id.clone(),
                cache_hit,
                similarity: semantic.map(|(s, _)| s),
                cache_age_hours: semantic.map(|(_, age)| age.as_secs_f64() / 3600.0),
                latency_ms,
            },
        }
    }

    fn record_latency(&self, started: Instant) -> f64 {
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut metrics = self.inner.metrics.lock();
        metrics.request_count += 1;
        metrics.total_latency_ms += latency_ms;
        latency_ms
    }

    fn schedule_population(
        &self,
        query: String,
        data: Value,
        embedding: Option<Vec<f32>>,
        ttl: Duration,
        flush_due: bool,
    ) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let _permit = match Arc::clone(&inner.writeback).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let result = tokio::task::spawn_blocking(move || {
                inner.populate(&query, &data, embedding, ttl, flush_due);
            })
            .await;
            if let Err(e) = result {
                warn!("Cache write-back task failed: {}", e);
            }
        });

        let mut pending = self.inner.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every scheduled write-back to finish
    pub async fn wait_for_writeback(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.inner.pending.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Cache write-back task failed: {}", e);
            }
        }
    }

    /// Clear one or both tiers; returns per-tier success.
    ///
    /// Blocking: rewrites the exact file and deletes semantic rows. From async
    /// code use [`CacheCoordinator::clear_cache_async`].
    pub fn clear_cache(&self, scope: ClearScope) -> BTreeMap<&'static str, bool> {
        let mut results = BTreeMap::new();

        if matches!(scope, ClearScope::All | ClearScope::Exact) {
            let ok = match self.inner.exact.clear() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to clear exact cache: {}", e);
                    false
                }
            };
            results.insert("exact", ok);
        }

        if matches!(scope, ClearScope::All | ClearScope::Semantic) {
            let ok = match self.inner.semantic.as_ref().map(|s| s.clear()) {
                Some(Ok(_)) => true,
                Some(Err(e)) => {
                    warn!("Failed to clear semantic cache: {}", e);
                    false
                }
                None => false,
            };
            results.insert("semantic", ok);
        }

        results
    }

    pub async fn clear_cache_async(&self, scope: ClearScope) -> BTreeMap<&'static str, bool> {
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.clear_cache(scope)).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Cache clear task failed: {}", e);
                BTreeMap::new()
            }
        }
    }

    /// Remove expired entries from both tiers.
    ///
    /// Blocking, like [`CacheCoordinator::stats`]; async callers go through
    /// `tokio::task::spawn_blocking` or [`CacheCoordinator::cleanup_expired_async`].
    pub fn cleanup_expired(&self) -> CleanupReport {
        let exact = self.inner.exact.cleanup_expired();
        let semantic = match self.inner.semantic.as_ref().map(|s| s.cleanup_expired()) {
            Some(Ok(n)) => n,
            Some(Err(e)) => {
                warn!("Semantic cleanup failed: {}", e);
                0
            }
            None => 0,
        };
        CleanupReport { exact, semantic }
    }

    pub async fn cleanup_expired_async(&self) -> CleanupReport {
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.cleanup_expired()).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Cache cleanup task failed: {}", e);
                CleanupReport::default()
            }
        }
    }

    /// Recompute aggregate statistics and persist them to `cache/stats.json`.
    ///
    /// Blocking: reads the semantic store and writes the stats file. Do not
    /// call it directly on a runtime worker; use [`CacheCoordinator::stats_async`].
    pub fn stats(&self) -> CacheStatsReport {
        self.inner.refresh_stats()
    }

    /// [`CacheCoordinator::stats`] on the blocking pool
    pub async fn stats_async(&self) -> Result<CacheStatsReport> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.refresh_stats())
            .await
            .map_err(|e| Error::Internal(format!("Stats task failed: {}", e)))
    }
}

impl Inner {
    /// Write-back half of a miss; the exact entry is already in memory
    fn populate(
        &self,
        query: &str,
        data: &Value,
        embedding: Option<Vec<f32>>,
        ttl: Duration,
        flush_due: bool,
    ) {
        if let (Some(semantic), Some(embedding)) = (self.semantic.as_ref(), embedding.as_ref()) {
            let semantic_ttl = self.config.semantic_ttl(ttl);
            if let Err(e) = semantic.add_embedding(embedding, data, query, semantic_ttl) {
                warn!("Semantic write-back failed: {}", e);
            }
        }
        if flush_due {
            if let Err(e) = self.exact.flush() {
                warn!("Exact cache flush failed: {}", e);
            }
        }
        self.refresh_stats();
    }

    fn refresh_stats(&self) -> CacheStatsReport {
        let _writing = self.stats_write.lock();
        let (exact_hits, semantic_hits, generations, total_latency_ms, request_count) = {
            let m = self.metrics.lock();
            (
                m.exact_hits,
                m.semantic_hits,
                m.embedding_generations,
                m.total_latency_ms,
                m.request_count,
            )
        };

        let exact_tier = self.exact.stats();
        let (semantic_tier, size) = match self.semantic.as_ref() {
            Some(semantic) => {
                let size = match semantic.size_stats() {
                    Ok(size) => Some(size),
                    Err(e) => {
                        warn!("Semantic size stats unavailable: {}", e);
                        None
                    }
                };
                (semantic.stats(), size)
            }
            None => (TierStats::default(), None),
        };

        let ratio = |n: f64| {
            if request_count == 0 {
                0.0
            } else {
                n / request_count as f64
            }
        };

        let report = CacheStatsReport {
            project_id: self.project_id.clone(),
            generated_at: Utc::now(),
            overall: OverallStats {
                hit_rate: ratio((exact_hits + semantic_hits) as f64),
                total_requests: request_count,
                avg_latency_ms: ratio(total_latency_ms),
            },
            exact_cache: ExactCacheReport {
                tier: exact_tier,
                hit_rate: exact_tier.hit_rate(),
                hit_count: exact_hits,
            },
            semantic_cache: SemanticCacheReport {
                enabled: self.semantic.is_some() && self.embedder.is_some(),
                tier: semantic_tier,
                hit_count: semantic_hits,
                size,
            },
            embeddings: EmbeddingReport {
                generations,
                estimated_cost: generations as f64
                    * pricing::rate_per_1k(&self.config.embedding_model),
            },
        };

        if let Err(e) = self.stats_store.save(STATS_FILE, &report) {
            warn!("Failed to persist cache stats: {}", e);
        }
        report
    }
}

/// Bound embedding input, marking the cut
fn truncate_for_embedding(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brainlift_provider::ProviderError;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// 고정된 텍스트 → 벡터 매핑
    struct TableEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                vectors: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        fn model(&self) -> &str {
            "text-embedding-ada-002"
        }

        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.vectors
                .get(text)
                .cloned()
                .ok_or_else(|| ProviderError::Network("unknown text".into()))
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model(&self) -> &str {
            "text-embedding-ada-002"
        }

        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
            Err(ProviderError::ServerError("down".into()))
        }
    }

    fn coordinator(dir: &TempDir, embedder: Option<Arc<dyn EmbeddingProvider>>) -> CacheCoordinator {
        let paths = ProjectPaths::new(dir.path(), "P").unwrap();
        CacheCoordinator::new(&paths, CacheConfig::default(), embedder).unwrap()
    }

    const TTL: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_second_call_is_exact_hit() {
        let dir = TempDir::new().unwrap();
        let cache = coordinator(&dir, None);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let first = cache
            .get_or_generate(
                "def f(): pass",
                move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"summary": "generated"}))
                },
                TTL,
            )
            .await
            .unwrap();
        assert_eq!(first.cache_hit(), CacheHit::Miss);
        cache.wait_for_writeback().await;

        let second = cache
            .get_or_generate(
                "def f(): pass",
                move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"summary": "regenerated"}))
                },
                TTL,
            )
            .await
            .unwrap();

        assert_eq!(second.cache_hit(), CacheHit::Exact);
        assert_eq!(second.data, json!({"summary": "generated"}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_back_to_back_calls_hit_exact_without_waiting() {
        let dir = TempDir::new().unwrap();
        let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
        let cache = coordinator(&dir, Some(embedder));
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let generate = move |_: String| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"n": calls.load(Ordering::SeqCst)}))
        };

        let first = cache.get_or_generate("q", generate, TTL).await.unwrap();
        let second = cache.get_or_generate("q", generate, TTL).await.unwrap();

        assert_eq!(first.cache_hit(), CacheHit::Miss);
        assert_eq!(second.cache_hit(), CacheHit::Exact);
        assert_eq!(second.data, json!({"n": 1}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_semantic_store_degrades_to_miss() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), "P").unwrap();
        let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
        let cache = CacheCoordinator::new(&paths, CacheConfig::default(), Some(embedder)).unwrap();
        assert!(cache.semantic().is_some());

        // 열린 뒤에 DB 파일이 망가진 경우
        let db = paths.semantic_db_file();
        for suffix in ["-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", db.display(), suffix));
        }
        std::fs::write(&db, "not a database ".repeat(512)).unwrap();

        let response = cache
            .get_or_generate("q", |_| async { Ok(json!("fresh")) }, TTL)
            .await
            .unwrap();
        assert_eq!(response.cache_hit(), CacheHit::Miss);
        assert_eq!(response.data, json!("fresh"));

        cache.wait_for_writeback().await;
        let report = cache.stats_async().await.unwrap();
        assert!(report.semantic_cache.size.is_none());
        assert_eq!(cache.exact().len(), 1);
    }

    #[tokio::test]
    async fn test_end_to_end_miss_exact_semantic() {
        let dir = TempDir::new().unwrap();
        // cos([1,0], [0.9, 0.43589]) ≈ 0.9
        let embedder = Arc::new(TableEmbedder::new(&[
            ("def f(): pass", vec![1.0, 0.0]),
            ("def f():  pass", vec![0.9, 0.435_889_9]),
        ]));
        let cache = coordinator(&dir, Some(embedder.clone()));

        let miss = cache
            .get_or_generate("def f(): pass", |_| async { Ok(json!("analysis")) }, TTL)
            .await
            .unwrap();
        assert_eq!(miss.cache_hit(), CacheHit::Miss);
        cache.wait_for_writeback().await;

        let exact = cache
            .get_or_generate("def f(): pass", |_| async { Ok(json!("other")) }, TTL)
            .await
            .unwrap();
        assert_eq!(exact.cache_hit(), CacheHit::Exact);

        let semantic = cache
            .get_or_generate("def f():  pass", |_| async { Ok(json!("other")) }, TTL)
            .await
            .unwrap();
        assert_eq!(semantic.cache_hit(), CacheHit::Semantic);
        assert_eq!(semantic.data, json!("analysis"));
        let similarity = semantic.metadata.similarity.unwrap();
        assert!((similarity - 0.9).abs() < 1e-3, "similarity {}", similarity);
        assert!(semantic.metadata.cache_age_hours.is_some());

        // exact 히트는 임베딩을 만들지 않음
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generation_error_propagates() {
        let dir = TempDir::new().unwrap();
        let cache = coordinator(&dir, None);

        let result = cache
            .get_or_generate(
                "q",
                |_| async {
                    Err(Error::Provider {
                        provider: "openai".into(),
                        message: "500".into(),
                    })
                },
                TTL,
            )
            .await;

        assert!(matches!(result, Err(Error::Generation(_))));
        cache.wait_for_writeback().await;
        assert!(cache.exact().is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_generation() {
        let dir = TempDir::new().unwrap();
        let cache = coordinator(&dir, Some(Arc::new(FailingEmbedder)));

        let response = cache
            .get_or_generate("q", |_| async { Ok(json!(1)) }, TTL)
            .await
            .unwrap();
        assert_eq!(response.cache_hit(), CacheHit::Miss);

        cache.wait_for_writeback().await;
        let stats = cache.stats();
        assert_eq!(stats.embeddings.generations, 0);
        assert_eq!(stats.semantic_cache.size.unwrap().entry_count, 0);
        assert_eq!(cache.exact().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_generates() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), "P").unwrap();
        let cache = CacheCoordinator::new(&paths, CacheConfig::disabled(), None).unwrap();

        for _ in 0..2 {
            let response = cache
                .get_or_generate("q", |_| async { Ok(json!(1)) }, TTL)
                .await
                .unwrap();
            assert_eq!(response.cache_hit(), CacheHit::Miss);
        }
        assert!(cache.exact().is_empty());
    }

    #[tokio::test]
    async fn test_stats_persisted() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), "P").unwrap();
        let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
        let cache = CacheCoordinator::new(&paths, CacheConfig::default(), Some(embedder)).unwrap();

        cache
            .get_or_generate("q", |_| async { Ok(json!(1)) }, TTL)
            .await
            .unwrap();
        cache.wait_for_writeback().await;
        cache
            .get_or_generate("q", |_| async { Ok(json!(1)) }, TTL)
            .await
            .unwrap();

        let report = cache.stats();
        assert_eq!(report.project_id, "P");
        assert_eq!(report.overall.total_requests, 2);
        assert_eq!(report.overall.hit_rate, 0.5);
        assert_eq!(report.exact_cache.hit_count, 1);
        assert_eq!(report.embeddings.generations, 1);
        assert!((report.embeddings.estimated_cost - 0.0001).abs() < 1e-12);
        assert_eq!(report.semantic_cache.size.unwrap().entry_count, 1);

        let persisted = CacheStatsReport::load(&paths).unwrap().unwrap();
        assert_eq!(persisted.project_id, "P");
        assert_eq!(persisted.overall.total_requests, 2);
        assert_eq!(persisted.exact_cache.hit_count, 1);
    }

    #[tokio::test]
    async fn test_clear_and_cleanup() {
        let dir = TempDir::new().unwrap();
        let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
        let cache = coordinator(&dir, Some(embedder));

        cache
            .get_or_generate("q", |_| async { Ok(json!(1)) }, TTL)
            .await
            .unwrap();
        cache.wait_for_writeback().await;

        let exact_only = cache.clear_cache(ClearScope::Exact);
        assert_eq!(exact_only.get("exact"), Some(&true));
        assert!(!exact_only.contains_key("semantic"));
        assert!(cache.exact().is_empty());

        let all = cache.clear_cache(ClearScope::All);
        assert_eq!(all.get("semantic"), Some(&true));
        assert_eq!(
            cache.semantic().unwrap().size_stats().unwrap().entry_count,
            0
        );

        assert_eq!(cache.cleanup_expired(), CleanupReport::default());
    }

    #[tokio::test]
    async fn test_async_maintenance_runs_off_runtime() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), "P").unwrap();
        let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
        let cache = CacheCoordinator::new(&paths, CacheConfig::default(), Some(embedder)).unwrap();

        cache
            .get_or_generate("q", |_| async { Ok(json!(1)) }, TTL)
            .await
            .unwrap();
        cache.wait_for_writeback().await;

        let report = cache.stats_async().await.unwrap();
        assert_eq!(report.overall.total_requests, 1);
        assert_eq!(report.semantic_cache.size.unwrap().entry_count, 1);
        assert!(CacheStatsReport::load(&paths).unwrap().is_some());

        assert_eq!(cache.cleanup_expired_async().await, CleanupReport::default());

        let cleared = cache.clear_cache_async(ClearScope::All).await;
        assert_eq!(cleared.get("exact"), Some(&true));
        assert_eq!(cleared.get("semantic"), Some(&true));
        assert!(cache.exact().is_empty());
    }

    #[test]
    fn test_truncate_for_embedding() {
        assert_eq!(truncate_for_embedding("short", 10), "short");
        assert_eq!(
            truncate_for_embedding("abcdefghij", 4),
            format!("abcd{}", TRUNCATION_MARKER)
        );
    }
}
