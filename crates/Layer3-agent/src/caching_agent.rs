//! Caching Agent - 캐시를 거치는 LLM 분석 에이전트
//!
//! 프롬프트 → `CacheCoordinator::get_or_generate` → `CompletionClient`.
//! 캐시 미스로 실제 생성한 경우에만 사용량을 `BudgetTracker` 에 기록한다.

use crate::agent::{Agent, AgentOutput, AnalysisContext};
use crate::response::{parse_analysis, ResponseDefaults};
use crate::state::OrchestrationState;
use async_trait::async_trait;
use brainlift_core::budget::pricing;
use brainlift_core::{BudgetTracker, CacheCoordinator, CacheHit};
use brainlift_foundation::{AgentKind, Error, Result};
use brainlift_provider::{CompletionClient, CompletionRequest};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Change text longer than this is cut before prompting
pub const MAX_CHANGE_CHARS: usize = 3000;

/// Builds the prompt from the run state and the (truncated) change text
pub type PromptBuilder = Arc<dyn Fn(&OrchestrationState, &str) -> String + Send + Sync>;

pub struct CachingAgent<C: CompletionClient> {
    kind: AgentKind,
    client: Arc<C>,
    prompt: PromptBuilder,
    cache: CacheCoordinator,
    budget: Option<Arc<BudgetTracker>>,
    ttl: Duration,
    defaults: ResponseDefaults,
}

impl<C: CompletionClient + 'static> CachingAgent<C> {
    pub fn new(
        kind: AgentKind,
        client: Arc<C>,
        prompt: PromptBuilder,
        cache: CacheCoordinator,
    ) -> Self {
        let ttl = cache.config().default_ttl();
        Self {
            kind,
            client,
            prompt,
            cache,
            budget: None,
            ttl,
            defaults: ResponseDefaults::for_kind(kind),
        }
    }

    pub fn with_budget(mut self, budget: Arc<BudgetTracker>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn record_usage(&self, tokens: u64, model: &str, task_id: &str) -> f64 {
        let task_id = (!task_id.is_empty()).then_some(task_id);
        match &self.budget {
            Some(budget) => budget.record_usage(tokens, model, task_id),
            None => pricing::calculate_cost(tokens, model),
        }
    }
}

#[async_trait]
impl<C: CompletionClient + 'static> Agent for CachingAgent<C> {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn analyze(&self, ctx: AnalysisContext) -> Result<AgentOutput> {
        let change = truncate_chars(ctx.change_text(), MAX_CHANGE_CHARS);
        let prompt = (self.prompt)(&ctx.state, change);

        let client = Arc::clone(&self.client);
        let defaults = self.defaults.clone();
        let model = ctx.model.clone();
        let cancel = ctx.cancel.clone();

        let response = self
            .cache
            .get_or_generate(
                &prompt,
                move |prompt| async move {
                    let request = CompletionRequest::new(model, prompt.clone());
                    let completion = client
                        .complete(request, &cancel)
                        .await
                        .map_err(Error::from)?;

                    let tokens = match completion.usage {
                        Some(usage) => usage.total(),
                        None => (prompt.chars().count() / 4 + completion.text.chars().count() / 4)
                            as u64,
                    };
                    Ok::<Value, Error>(json!({
                        "analysis": parse_analysis(&completion.text, &defaults),
                        "tokens_used": tokens,
                    }))
                },
                self.ttl,
            )
            .await?;

        let analysis = response.data.get("analysis").cloned().unwrap_or(Value::Null);
        if response.cache_hit() != CacheHit::Miss {
            debug!("{} agent served from {} cache", self.kind, response.cache_hit().as_str());
            return Ok(AgentOutput::new(analysis));
        }

        let tokens = response
            .data
            .get("tokens_used")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let cost = self.record_usage(tokens, &ctx.model, &ctx.task_info().id);
        Ok(AgentOutput::new(analysis).with_usage(tokens, cost))
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskInfo;
    use brainlift_foundation::{BudgetConfig, CacheConfig, ProjectPaths};
    use brainlift_provider::{Completion, ProviderError, TokenUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    struct ScriptedClient {
        reply: String,
        usage: Option<TokenUsage>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(reply: &str, usage: Option<TokenUsage>) -> Self {
            Self {
                reply: reply.to_string(),
                usage,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            _request: CompletionRequest,
            cancel: &CancellationToken,
        ) -> std::result::Result<Completion, ProviderError> {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Completion {
                text: self.reply.clone(),
                usage: self.usage,
            })
        }
    }

    fn prompt_builder() -> PromptBuilder {
        Arc::new(|state: &OrchestrationState, change: &str| {
            format!("Review commit {}:\n{}", state.task_info.id, change)
        })
    }

    fn context(change: &str, task_id: &str) -> AnalysisContext {
        let state = OrchestrationState::new("P", change, TaskInfo::new(task_id, "msg"));
        AnalysisContext::new(Arc::new(state), "gpt-4-turbo")
    }

    struct Fixture {
        _dir: TempDir,
        cache: CacheCoordinator,
        budget: Arc<BudgetTracker>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), "P").unwrap();
        let cache = CacheCoordinator::new(&paths, CacheConfig::default(), None).unwrap();
        let budget = Arc::new(BudgetTracker::open(&paths, BudgetConfig::default()));
        Fixture {
            _dir: dir,
            cache,
            budget,
        }
    }

    #[tokio::test]
    async fn test_miss_records_usage_then_hit_is_free() {
        let fx = fixture();
        let client = Arc::new(ScriptedClient::new(
            "```json\n{\"quality_score\": 88}\n```",
            Some(TokenUsage {
                prompt_tokens: 900,
                completion_tokens: 100,
            }),
        ));
        let agent = CachingAgent::new(
            AgentKind::Quality,
            Arc::clone(&client),
            prompt_builder(),
            fx.cache.clone(),
        )
        .with_budget(Arc::clone(&fx.budget));

        let first = agent.analyze(context("+let x = 1;", "abc")).await.unwrap();
        assert_eq!(first.analysis["quality_score"], 88);
        assert_eq!(first.analysis["issues"], json!([]));
        assert_eq!(first.tokens_used, 1000);
        assert!((first.cost - 0.01).abs() < 1e-12);

        let usage = fx.budget.usage();
        assert_eq!(usage.total_tokens, 1000);
        assert_eq!(usage.tasks["abc"].tokens, 1000);

        fx.cache.wait_for_writeback().await;
        let second = agent.analyze(context("+let x = 1;", "abc")).await.unwrap();
        assert_eq!(second.analysis, first.analysis);
        assert_eq!(second.tokens_used, 0);
        assert_eq!(second.cost, 0.0);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.budget.usage().total_tokens, 1000);
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back() {
        let fx = fixture();
        let client = Arc::new(ScriptedClient::new("I could not analyze this.", None));
        let agent = CachingAgent::new(AgentKind::Security, client, prompt_builder(), fx.cache);

        let output = agent.analyze(context("+eval(x)", "")).await.unwrap();

        assert_eq!(output.analysis["severity"], "unknown");
        assert!(output.analysis.get("parsing_error").is_some());
        // usage 없으면 문자 수 추정
        assert!(output.tokens_used > 0);
    }

    #[tokio::test]
    async fn test_cancelled_call_is_an_error() {
        let fx = fixture();
        let client = Arc::new(ScriptedClient::new("{}", None));
        let agent = CachingAgent::new(AgentKind::Quality, client, prompt_builder(), fx.cache);

        let ctx = context("+x", "t");
        ctx.cancel.cancel();
        assert!(agent.analyze(ctx).await.is_err());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", MAX_CHANGE_CHARS), "short");
    }
}
