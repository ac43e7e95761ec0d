//! OpenAI-compatible client (chat completions + embeddings)

use crate::{
    error::ProviderError,
    retry::{with_retry, RetryConfig},
    r#trait::{Completion, CompletionClient, CompletionRequest, EmbeddingProvider, TokenUsage},
};
use async_trait::async_trait;
use brainlift_foundation::config::DEFAULT_EMBEDDING_MODEL;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// OpenAI client used for both agent completions and cache embeddings
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            retry: RetryConfig::default(),
        })
    }

    /// Create from `OPENAI_API_KEY`
    pub fn from_env() -> Result<Self, ProviderError> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| ProviderError::NotConfigured(format!("{} is not set", API_KEY_ENV)))?;
        Self::new(key)
    }

    /// Create with custom base URL (Azure, LocalAI, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set custom request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status.as_u16(), &body));
        }

        Ok(response.json::<R>().await?)
    }
}

fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn build_chat_request(request: &CompletionRequest) -> ChatRequest<'_> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system.as_deref() {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.prompt,
    });

    ChatRequest {
        model: &request.model,
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

fn into_completion(response: ChatResponse) -> Result<Completion, ProviderError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::InvalidResponse("response has no choices".into()))?;

    Ok(Completion {
        text,
        usage: response.usage,
    })
}

fn into_embedding(response: EmbeddingResponse) -> Result<Vec<f32>, ProviderError> {
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| ProviderError::InvalidResponse("response has no embedding".into()))?;

    if embedding.is_empty() {
        return Err(ProviderError::InvalidResponse("empty embedding".into()));
    }
    Ok(embedding)
}

// ============================================================================
// Trait impls
// ============================================================================

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Completion, ProviderError> {
        let body = build_chat_request(&request);
        debug!(model = %request.model, prompt_chars = request.prompt.len(), "chat completion");

        let (this, body) = (self, &body);
        let response: ChatResponse = with_retry(&self.retry, "chat completion", cancel, move || {
            this.post_json("chat/completions", body)
        })
        .await?;

        into_completion(response)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    fn model(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        // 임베딩 호출은 코디네이터 내부에서만 쓰이므로 자체 토큰 사용
        let cancel = CancellationToken::new();

        let (this, body) = (self, &body);
        let response: EmbeddingResponse = with_retry(&self.retry, "embedding", &cancel, move || {
            this.post_json("embeddings", body)
        })
        .await?;

        into_embedding(response)
    }
}
