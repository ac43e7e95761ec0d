//! Agent Orchestrator
//!
//! 활성화된 에이전트들을 설정된 전략으로 실행하고 결과를 하나의 보고서로 모은다.
//!
//! ## 실행 모드
//!
//! ```text
//! ┌────────────┬──────────────────────────────┬──────────────────────────┐
//! │ mode       │ 실행 방식                     │ 상태 전달                 │
//! ├────────────┼──────────────────────────────┼──────────────────────────┤
//! │ parallel   │ Semaphore(max_workers) 병렬  │ 모두 같은 초기 스냅샷      │
//! │ sequential │ 등록 순서대로 하나씩           │ 이전 결과 포함 스냅샷      │
//! │ priority   │ 우선순위 순서, 조기 중단 검사  │ 이전 결과 포함 스냅샷      │
//! └────────────┴──────────────────────────────┴──────────────────────────┘
//! ```
//!
//! 에이전트 하나의 실패(에러, 패닉, 타임아웃)는 그 에이전트의 결과 슬롯에만
//! 기록되고 나머지 실행을 막지 않는다.

use crate::agent::{Agent, AnalysisContext};
use crate::registry::{AgentRegistry, RegisteredAgent};
use crate::report::{self, AnalysisReport, RunMetrics};
use crate::state::{AgentResult, OrchestrationState, TaskInfo};
use brainlift_core::budget::pricing;
use brainlift_core::BudgetTracker;
use brainlift_foundation::config::DEFAULT_AGENT_MODEL;
use brainlift_foundation::{
    AgentKind, AgentSettings, Error, ExecutionMode, OrchestratorConfig, Result,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Skip reason when there is nothing to analyze
pub const NO_INPUT_REASON: &str = "No input";

/// Per-agent status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub enabled: bool,
    pub model: String,
    pub priority: u32,
    pub cost_per_1k: f64,
}

/// Partial settings change; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub model: Option<String>,
}

pub struct Orchestrator {
    project_id: String,
    config: OrchestratorConfig,
    registry: AgentRegistry,
    budget: Option<Arc<BudgetTracker>>,
}

impl Orchestrator {
    pub fn new(
        project_id: impl Into<String>,
        config: OrchestratorConfig,
        agents: Vec<Arc<dyn Agent>>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = AgentRegistry::from_config(agents, &config);
        Ok(Self {
            project_id: project_id.into(),
            config,
            registry,
            budget: None,
        })
    }

    /// Attach a tracker for the pre-flight budget check
    pub fn with_budget(mut self, tracker: Arc<BudgetTracker>) -> Self {
        self.budget = Some(tracker);
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Run every enabled agent over `change_text`.
    ///
    /// Never fails: agent errors, panics and timeouts end up in the
    /// per-agent result map.
    pub async fn analyze_commit(&self, change_text: &str, task_info: TaskInfo) -> AnalysisReport {
        let started = Instant::now();
        let mode = self.config.execution_mode;
        let mut state = OrchestrationState::new(&self.project_id, change_text, task_info);
        let mut metrics = RunMetrics::default();
        let enabled = self.registry.enabled();

        info!(
            project = %self.project_id,
            mode = mode.as_str(),
            agents = enabled.len(),
            "Starting analysis"
        );

        if enabled.is_empty() {
            warn!("No agents enabled");
        } else if change_text.trim().is_empty() {
            skip_all(&mut state, &enabled, NO_INPUT_REASON);
        } else if let Some(reason) = self.preflight(change_text, &enabled) {
            skip_all(&mut state, &enabled, &reason);
        } else {
            match mode {
                ExecutionMode::Parallel => {
                    self.run_parallel(&mut state, &mut metrics, &enabled).await
                }
                ExecutionMode::Sequential => {
                    self.run_sequential(&mut state, &mut metrics, enabled).await
                }
                ExecutionMode::Priority => {
                    self.run_priority(&mut state, &mut metrics, enabled).await
                }
            }
        }

        metrics.execution_time = started.elapsed().as_secs_f64();
        info!(
            agents_run = metrics.agents_run,
            total_tokens = metrics.total_tokens,
            "Analysis complete in {:.2}s",
            metrics.execution_time
        );

        report::aggregate(state, metrics, mode)
    }

    /// Budget pre-check over the whole change; Some(reason) means skip
    fn preflight(&self, change_text: &str, enabled: &[RegisteredAgent]) -> Option<String> {
        let tracker = self.budget.as_ref()?;
        let model = enabled
            .first()
            .map_or(DEFAULT_AGENT_MODEL, |r| r.settings.model.as_str());
        let estimated = tracker.estimate_tokens(change_text);

        match tracker.guard(estimated, model) {
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping analysis: {}", e);
                Some(e.to_string())
            }
        }
    }

    async fn run_parallel(
        &self,
        state: &mut OrchestrationState,
        metrics: &mut RunMetrics,
        agents: &[RegisteredAgent],
    ) {
        // 세마포어로 동시 실행 수 제한
        let semaphore = Semaphore::new(self.config.max_workers);
        let snapshot = Arc::new(state.clone());

        let futures = agents.iter().map(|registered| {
            let semaphore = &semaphore;
            let snapshot = Arc::clone(&snapshot);
            async move {
                // 타임아웃은 permit 획득 후부터
                let _permit = semaphore.acquire().await.ok();
                (registered.kind(), self.invoke(registered, snapshot).await)
            }
        });

        for (kind, result) in join_all(futures).await {
            metrics.record(&result);
            state.record(kind, result);
        }
    }

    async fn run_sequential(
        &self,
        state: &mut OrchestrationState,
        metrics: &mut RunMetrics,
        agents: Vec<RegisteredAgent>,
    ) {
        for registered in agents {
            let result = self.invoke(&registered, Arc::new(state.clone())).await;
            metrics.record(&result);
            state.record(registered.kind(), result);
        }
    }

    async fn run_priority(
        &self,
        state: &mut OrchestrationState,
        metrics: &mut RunMetrics,
        mut agents: Vec<RegisteredAgent>,
    ) {
        // stable sort: 동률은 등록 순서
        agents.sort_by_key(|r| self.config.priority_of(r.kind()));

        let mut remaining = agents.into_iter();
        while let Some(registered) = remaining.next() {
            if let Some(reason) = self.stop_reason(state, metrics) {
                warn!("Stopping priority run: {}", reason);
                state.record(registered.kind(), AgentResult::skipped(reason.clone()));
                for rest in remaining.by_ref() {
                    state.record(rest.kind(), AgentResult::skipped(reason.clone()));
                }
                break;
            }

            let result = self.invoke(&registered, Arc::new(state.clone())).await;
            metrics.record(&result);
            state.record(registered.kind(), result);
        }
    }

    /// Continuation predicate for priority mode
    fn stop_reason(&self, state: &OrchestrationState, metrics: &RunMetrics) -> Option<String> {
        let budget = &self.config.budget;
        if budget.budget_enabled && metrics.total_tokens >= budget.commit_token_limit {
            return Some(format!(
                "Token budget exceeded: {} >= {}",
                metrics.total_tokens, budget.commit_token_limit
            ));
        }

        if report::reported_severity(&state.results) == Some("high") {
            if self.config.stop_on_high_severity {
                return Some("High severity security issue found".to_string());
            }
            debug!("High severity security issue found, continuing");
        }

        None
    }

    /// One agent call in its own task, bounded by the agent timeout
    async fn invoke(
        &self,
        registered: &RegisteredAgent,
        state: Arc<OrchestrationState>,
    ) -> AgentResult {
        let kind = registered.kind();
        let timeout = self.config.agent_timeout();
        let ctx = AnalysisContext::new(state, registered.settings.model.clone());
        let cancel = ctx.cancel.clone();
        let agent = Arc::clone(&registered.agent);

        debug!("Running {} agent", kind);
        let mut handle = tokio::spawn(async move { agent.analyze(ctx).await });

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(Ok(output))) => {
                AgentResult::success(output.analysis, output.tokens_used, output.cost)
            }
            Ok(Ok(Err(e))) => {
                warn!("Error running {} agent: {}", kind, e);
                AgentResult::failure(e.to_string())
            }
            Ok(Err(join_error)) => {
                let err = Error::Agent(format!("{} agent failed: {}", kind, join_error));
                warn!("{}", err);
                AgentResult::failure(err.to_string())
            }
            Err(_) => {
                cancel.cancel();
                handle.abort();
                let err = Error::AgentTimeout {
                    agent: kind.to_string(),
                    timeout,
                };
                warn!("{}", err);
                AgentResult::failure(err.to_string())
            }
        }
    }

    /// Status of every registered agent
    pub fn agent_status(&self) -> BTreeMap<AgentKind, AgentStatus> {
        self.registry
            .iter()
            .map(|r| {
                let kind = r.kind();
                (
                    kind,
                    AgentStatus {
                        enabled: r.settings.enabled,
                        model: r.settings.model.clone(),
                        priority: self.config.priority_of(kind),
                        cost_per_1k: pricing::rate_per_1k(&r.settings.model),
                    },
                )
            })
            .collect()
    }

    /// Change `enabled`/`model` of a registered agent
    pub fn update_agent_settings(
        &mut self,
        kind: AgentKind,
        update: SettingsUpdate,
    ) -> Result<AgentSettings> {
        let mut settings = self
            .registry
            .settings(kind)
            .cloned()
            .ok_or_else(|| Error::Config(format!("Agent {} not found", kind)))?;

        if let Some(enabled) = update.enabled {
            settings.enabled = enabled;
        }
        if let Some(model) = update.model {
            if model.trim().is_empty() {
                return Err(Error::Validation(format!("Agent {} has no model", kind)));
            }
            settings.model = model;
        }

        self.registry.update_settings(kind, settings.clone())?;
        self.config.agents.insert(kind, settings.clone());
        info!("Updated settings for {} agent", kind);
        Ok(settings)
    }
}

fn skip_all(state: &mut OrchestrationState, agents: &[RegisteredAgent], reason: &str) {
    for registered in agents {
        state.record(registered.kind(), AgentResult::skipped(reason));
    }
}
