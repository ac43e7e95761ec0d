//! # brainlift-provider
//!
//! Remote model capabilities used by the Brainlift core.
//!
//! ## Features
//! - `EmbeddingProvider` for the semantic cache tier
//! - `CompletionClient` for agents, cancellable through a `CancellationToken`
//! - Automatic retry with exponential backoff
//! - OpenAI-compatible HTTP implementation

pub mod error;
pub mod providers;
pub mod retry;
pub mod r#trait;

// Core traits and types
pub use r#trait::{Completion, CompletionClient, CompletionRequest, EmbeddingProvider, TokenUsage};

// Error and retry
pub use error::ProviderError;
pub use retry::RetryConfig;

// Provider implementations
pub use providers::openai::OpenAiClient;

// Re-export for implementors
pub use tokio_util::sync::CancellationToken;
