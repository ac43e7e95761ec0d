//! Cache Configuration - 2단계 캐시 설정

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 기본 임베딩 모델
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// 캐시 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// 캐시 사용 여부 (false면 항상 생성)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 의미 캐시 유사도 임계값
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// exact 캐시 기본 TTL (초)
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// 의미 캐시 TTL 배수 (exact TTL 대비)
    #[serde(default = "default_semantic_ttl_multiplier")]
    pub semantic_ttl_multiplier: u32,

    /// N번째 set 마다 디스크로 flush
    #[serde(default = "default_flush_every")]
    pub flush_every: u64,

    /// 임베딩 입력 최대 길이 (문자)
    #[serde(default = "default_max_embedding_chars")]
    pub max_embedding_chars: usize,

    /// 비동기 write-back 동시 실행 수
    #[serde(default = "default_writeback_workers")]
    pub writeback_workers: usize,

    /// 임베딩 모델
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_true() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_semantic_ttl_multiplier() -> u32 {
    24
}

fn default_flush_every() -> u64 {
    10
}

fn default_max_embedding_chars() -> usize {
    8000
}

fn default_writeback_workers() -> usize {
    2
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: default_similarity_threshold(),
            default_ttl_secs: default_ttl_secs(),
            semantic_ttl_multiplier: default_semantic_ttl_multiplier(),
            flush_every: default_flush_every(),
            max_embedding_chars: default_max_embedding_chars(),
            writeback_workers: default_writeback_workers(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl CacheConfig {
    /// 캐시 비활성화
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// exact TTL 에 대응하는 의미 캐시 TTL
    pub fn semantic_ttl(&self, exact_ttl: Duration) -> Duration {
        exact_ttl.saturating_mul(self.semantic_ttl_multiplier)
    }

    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Validation(format!(
                "similarityThreshold must be within [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.flush_every == 0 {
            return Err(Error::Validation("flushEvery must be at least 1".into()));
        }
        if self.writeback_workers == 0 {
            return Err(Error::Validation(
                "writebackWorkers must be at least 1".into(),
            ));
        }
        if self.max_embedding_chars == 0 {
            return Err(Error::Validation(
                "maxEmbeddingChars must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.similarity_threshold, 0.85);
        assert_eq!(config.flush_every, 10);
        assert_eq!(
            config.semantic_ttl(Duration::from_secs(3600)),
            Duration::from_secs(3600 * 24)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"similarityThreshold": 0.9}"#).unwrap();
        assert_eq!(config.similarity_threshold, 0.9);
        assert_eq!(config.max_embedding_chars, 8000);
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = CacheConfig {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CacheConfig {
            flush_every: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
