//! Provider traits and common types
//!
//! 코어가 의존하는 원격 호출 능력 두 가지:
//! - `EmbeddingProvider`: 텍스트 → 임베딩 벡터 (의미 캐시용)
//! - `CompletionClient`: 프롬프트 → 모델 응답 (에이전트용)

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Token usage reported by the remote model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Single-turn completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            max_tokens: 2048,
            temperature: 0.0,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Completion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    /// None when the backend does not report usage
    pub usage: Option<TokenUsage>,
}

/// 임베딩 생성
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embedding model identifier (used for cost accounting)
    fn model(&self) -> &str;

    /// Embed one text. Vectors from one provider always share a dimension.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// 모델 호출
///
/// Implementations must stop work and return `ProviderError::Cancelled`
/// once `cancel` fires; the orchestrator cancels the token when an agent
/// exceeds its timeout.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Completion, ProviderError>;
}
