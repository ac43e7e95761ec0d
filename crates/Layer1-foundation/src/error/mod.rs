//! Error types for Brainlift
//!
//! 모든 에러를 중앙에서 관리. 캐시/임베딩 계층의 에러는 경계에서 흡수되고,
//! 생성(generation) 실패만 호출자에게 전파된다.

use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Brainlift 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 저장소 / 캐시 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    // ========================================================================
    // 원격 호출 관련
    // ========================================================================
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // ========================================================================
    // Budget 관련
    // ========================================================================
    #[error("Budget exceeded: {0}")]
    Budget(String),

    // ========================================================================
    // Agent 관련
    // ========================================================================
    #[error("Agent {agent} timed out after {timeout:?}")]
    AgentTimeout { agent: String, timeout: Duration },

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::AgentTimeout { .. } | Error::RateLimited(_) | Error::Provider { .. }
        )
    }

    /// 캐시 미스로 강등 가능한 에러인지 확인
    ///
    /// Storage/embedding failures never reach the caller of the cache
    /// coordinator; they turn into a miss on that tier.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Error::Storage(_)
                | Error::Embedding(_)
                | Error::Io(_)
                | Error::Json(_)
                | Error::Sqlite(_)
        )
    }

    /// Provider 에러 생성 헬퍼
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Agent timeout 에러 생성 헬퍼
    pub fn agent_timeout(agent: impl Into<String>, timeout: Duration) -> Self {
        Error::AgentTimeout {
            agent: agent.into(),
            timeout,
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
