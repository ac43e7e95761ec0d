//! Semantic cache tier (SQLite)
//!
//! Stores embedding vectors with their payloads per project and answers
//! nearest-match queries by cosine similarity. Search is a linear scan over
//! the project's live rows; the `(project_id, timestamp)` index only prunes
//! by project.
//!
//! Each operation opens its own connection.

use super::{key::preview, CacheTier, TierStats, SEMANTIC_PREVIEW_CHARS};
use brainlift_foundation::storage::ProjectPaths;
use brainlift_foundation::{Error, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Nearest match above threshold
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    pub id: i64,
    pub payload: Value,
    pub similarity: f32,
    pub age: Duration,
}

/// Per-project storage footprint
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticSizeStats {
    pub entry_count: u64,
    pub total_bytes: u64,
    pub avg_entry_bytes: f64,
}

/// Embedding-similarity tier
pub struct SemanticCache {
    project_id: String,
    db_path: PathBuf,
    threshold: f32,
    stats: Mutex<TierStats>,
}

impl SemanticCache {
    /// Open (and create if needed) `cache/semantic_cache.db`
    pub fn open(paths: &ProjectPaths, threshold: f32) -> Result<Self> {
        Self::open_at(paths.semantic_db_file(), paths.project_id(), threshold)
    }

    pub fn open_at(
        db_path: impl Into<PathBuf>,
        project_id: impl Into<String>,
        threshold: f32,
    ) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let cache = Self {
            project_id: project_id.into(),
            db_path,
            threshold,
            stats: Mutex::new(TierStats::default()),
        };

        let conn = cache.connect()?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(storage_err)?;
        initialize_schema(&conn)?;
        info!(project = %cache.project_id, "Semantic cache ready at {}", cache.db_path.display());

        Ok(cache)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).map_err(|e| {
            Error::Storage(format!("Failed to open {}: {}", self.db_path.display(), e))
        })?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(storage_err)?;
        Ok(conn)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Store an embedding with its payload; returns the row id
    pub fn add_embedding(
        &self,
        embedding: &[f32],
        payload: &Value,
        query_preview: &str,
        ttl: Duration,
    ) -> Result<i64> {
        if embedding.is_empty() {
            return Err(Error::Validation("embedding must not be empty".into()));
        }

        let embedding_json = serde_json::to_string(embedding)?;
        let data_json = serde_json::to_string(payload)?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO embeddings (project_id, embedding_json, data_json, query_preview, timestamp, ttl)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.project_id,
                embedding_json,
                data_json,
                preview(query_preview, SEMANTIC_PREVIEW_CHARS),
                now_secs(),
                ttl.as_secs_f64(),
            ],
        )
        .map_err(storage_err)?;

        self.stats.lock().sets += 1;
        let id = conn.last_insert_rowid();
        debug!("semantic add: id={} dims={}", id, embedding.len());
        Ok(id)
    }

    /// Best live match with similarity ≥ threshold.
    ///
    /// Ties on the maximum similarity resolve to the lowest row id
    /// (the earliest inserted record).
    pub fn find_similar(
        &self,
        query: &[f32],
        threshold: Option<f32>,
    ) -> Result<Option<SimilarityMatch>> {
        let threshold = threshold.unwrap_or(self.threshold);
        let now = now_secs();
        let conn = self.connect()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, embedding_json, data_json, timestamp FROM embeddings
                 WHERE project_id = ?1 AND (timestamp + ttl) > ?2
                 ORDER BY id ASC",
            )
            .map_err(storage_err)?;

        let rows = stmt
            .query_map(params![self.project_id, now], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })
            .map_err(storage_err)?;

        let mut best: Option<(i64, f32, String, f64)> = None;
        for row in rows {
            let (id, embedding_json, data_json, timestamp) = row.map_err(storage_err)?;
            let stored: Vec<f32> = match serde_json::from_str(&embedding_json) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Skipping corrupt embedding row {}: {}", id, e);
                    continue;
                }
            };
            if stored.len() != query.len() {
                warn!(
                    "Skipping embedding row {} with dimension {} (query has {})",
                    id,
                    stored.len(),
                    query.len()
                );
                continue;
            }

            let similarity = cosine_similarity(query, &stored);
            let better = best.as_ref().map_or(true, |(_, s, _, _)| similarity > *s);
            if similarity >= threshold && better {
                best = Some((id, similarity, data_json, timestamp));
            }
        }

        let found = match best {
            Some((id, similarity, data_json, timestamp)) => Some(SimilarityMatch {
                id,
                payload: serde_json::from_str(&data_json)?,
                similarity,
                age: Duration::from_secs_f64((now - timestamp).max(0.0)),
            }),
            None => None,
        };

        let mut stats = self.stats.lock();
        match &found {
            Some(m) => {
                stats.hits += 1;
                debug!("semantic hit: id={} similarity={:.4}", m.id, m.similarity);
            }
            None => {
                stats.misses += 1;
                debug!("semantic miss (threshold {:.2})", threshold);
            }
        }

        Ok(found)
    }

    /// Delete every row for this project; returns rows removed
    pub fn clear(&self) -> Result<usize> {
        let conn = self.connect()?;
        let removed = conn
            .execute(
                "DELETE FROM embeddings WHERE project_id = ?1",
                params![self.project_id],
            )
            .map_err(storage_err)?;
        info!(project = %self.project_id, "Cleared {} semantic cache entries", removed);
        Ok(removed)
    }

    /// Delete expired rows for this project; returns rows removed
    pub fn cleanup_expired(&self) -> Result<usize> {
        let conn = self.connect()?;
        let removed = conn
            .execute(
                "DELETE FROM embeddings WHERE project_id = ?1 AND (timestamp + ttl) <= ?2",
                params![self.project_id, now_secs()],
            )
            .map_err(storage_err)?;

        if removed > 0 {
            self.stats.lock().evictions += removed as u64;
            info!("Removed {} expired semantic cache entries", removed);
        }
        Ok(removed)
    }

    pub fn size_stats(&self) -> Result<SemanticSizeStats> {
        let conn = self.connect()?;
        let (entry_count, total_bytes): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(LENGTH(embedding_json) + LENGTH(data_json)), 0)
                 FROM embeddings WHERE project_id = ?1",
                params![self.project_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(storage_err)?;

        let entry_count = entry_count.max(0) as u64;
        let total_bytes = total_bytes.max(0) as u64;
        Ok(SemanticSizeStats {
            entry_count,
            total_bytes,
            avg_entry_bytes: if entry_count == 0 {
                0.0
            } else {
                total_bytes as f64 / entry_count as f64
            },
        })
    }

    pub fn stats(&self) -> TierStats {
        *self.stats.lock()
    }
}

impl CacheTier for SemanticCache {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn get(&self, _query: &str) -> Result<Option<Value>> {
        Err(Error::Unsupported(
            "semantic cache is queried by embedding; use find_similar".into(),
        ))
    }

    fn set(&self, _query: &str, _value: Value, _ttl: Duration) -> Result<()> {
        Err(Error::Unsupported(
            "semantic cache is populated by embedding; use add_embedding".into(),
        ))
    }

    fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    fn clear(&self) -> Result<()> {
        SemanticCache::clear(self).map(|_| ())
    }

    fn cleanup_expired(&self) -> Result<usize> {
        SemanticCache::cleanup_expired(self)
    }

    fn stats(&self) -> TierStats {
        SemanticCache::stats(self)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS embeddings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL,
            embedding_json TEXT NOT NULL,
            data_json TEXT NOT NULL,
            query_preview TEXT,
            timestamp REAL NOT NULL,
            ttl REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_project_timestamp
            ON embeddings(project_id, timestamp);
        "#,
    )
    .map_err(storage_err)
}

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(format!("Semantic cache: {}", e))
}

fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// `dot(a, b) / (‖a‖·‖b‖)`, 0 when either norm is 0 or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> SemanticCache {
        let paths = ProjectPaths::new(dir.path(), "proj").unwrap();
        SemanticCache::open(&paths, 0.85).unwrap()
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_identical_vector_matches() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);

        cache
            .add_embedding(&[0.3, 0.4, 0.5], &json!({"summary": "cached"}), "q", HOUR)
            .unwrap();
        let found = cache.find_similar(&[0.3, 0.4, 0.5], None).unwrap().unwrap();

        assert!((found.similarity - 1.0).abs() < 1e-6);
        assert_eq!(found.payload, json!({"summary": "cached"}));
        assert!(found.age < Duration::from_secs(5));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_orthogonal_vector_misses() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);

        cache
            .add_embedding(&[1.0, 0.0], &json!("x"), "q", HOUR)
            .unwrap();
        assert!(cache.find_similar(&[0.0, 1.0], None).unwrap().is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_best_match_and_tie_break() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);

        let first = cache
            .add_embedding(&[1.0, 0.0], &json!("first"), "a", HOUR)
            .unwrap();
        cache
            .add_embedding(&[1.0, 0.0], &json!("second"), "b", HOUR)
            .unwrap();
        cache
            .add_embedding(&[0.9, 0.1], &json!("near"), "c", HOUR)
            .unwrap();

        let found = cache.find_similar(&[1.0, 0.0], None).unwrap().unwrap();
        assert_eq!(found.id, first);
        assert_eq!(found.payload, json!("first"));
    }

    #[test]
    fn test_threshold_override() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);

        // cos = 0.8
        cache
            .add_embedding(&[0.8, 0.6], &json!("v"), "q", HOUR)
            .unwrap();
        assert!(cache.find_similar(&[1.0, 0.0], None).unwrap().is_none());
        assert!(cache.find_similar(&[1.0, 0.0], Some(0.75)).unwrap().is_some());
    }

    #[test]
    fn test_expired_rows_are_ignored_and_cleaned() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);

        cache
            .add_embedding(&[1.0, 0.0], &json!("old"), "q", Duration::from_millis(10))
            .unwrap();
        cache
            .add_embedding(&[0.0, 1.0], &json!("live"), "q", HOUR)
            .unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(cache.find_similar(&[1.0, 0.0], None).unwrap().is_none());
        assert_eq!(cache.cleanup_expired().unwrap(), 1);
        assert_eq!(cache.size_stats().unwrap().entry_count, 1);
    }

    #[test]
    fn test_projects_are_isolated() {
        let dir = TempDir::new().unwrap();
        let a = SemanticCache::open(&ProjectPaths::new(dir.path(), "a").unwrap(), 0.85).unwrap();
        let db = a.db_path().to_path_buf();
        // 같은 DB 파일을 다른 프로젝트로 공유
        let b = SemanticCache::open_at(&db, "b", 0.85).unwrap();

        a.add_embedding(&[1.0, 0.0], &json!("a"), "q", HOUR).unwrap();
        assert!(b.find_similar(&[1.0, 0.0], None).unwrap().is_none());

        b.add_embedding(&[1.0, 0.0], &json!("b"), "q", HOUR).unwrap();
        assert_eq!(a.clear().unwrap(), 1);
        assert_eq!(b.size_stats().unwrap().entry_count, 1);
    }

    #[test]
    fn test_size_stats() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        assert_eq!(cache.size_stats().unwrap(), SemanticSizeStats::default());

        cache
            .add_embedding(&[1.0, 0.0], &json!({"k": "v"}), "q", HOUR)
            .unwrap();
        let size = cache.size_stats().unwrap();
        assert_eq!(size.entry_count, 1);
        assert!(size.total_bytes > 0);
        assert_eq!(size.avg_entry_bytes, size.total_bytes as f64);
    }

    #[test]
    fn test_single_key_operations_unsupported() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let tier: &dyn CacheTier = &cache;

        assert!(matches!(tier.get("q"), Err(Error::Unsupported(_))));
        assert!(matches!(
            tier.set("q", json!(1), HOUR),
            Err(Error::Unsupported(_))
        ));
        assert!(!tier.delete("anything").unwrap());
    }
}
