//! Agent contract
//!
//! 오케스트레이터가 의존하는 최소 인터페이스. 에이전트는 상태 스냅샷을 읽고
//! 결과(`AgentOutput`)만 반환한다. 결과를 자기 슬롯에 기록하는 것은
//! 오케스트레이터의 몫이다.

use crate::state::{OrchestrationState, TaskInfo};
use async_trait::async_trait;
use brainlift_foundation::{AgentKind, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Input handed to one agent invocation
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Read-only snapshot; under sequential/priority modes it includes the
    /// results of agents that ran earlier.
    pub state: Arc<OrchestrationState>,
    /// Model configured for this agent
    pub model: String,
    /// Cancelled when the invocation times out
    pub cancel: CancellationToken,
}

impl AnalysisContext {
    pub fn new(state: Arc<OrchestrationState>, model: impl Into<String>) -> Self {
        Self {
            state,
            model: model.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn change_text(&self) -> &str {
        &self.state.change_text
    }

    pub fn task_info(&self) -> &TaskInfo {
        &self.state.task_info
    }
}

/// What an agent produces on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub analysis: Value,
    pub tokens_used: u64,
    pub cost: f64,
}

impl AgentOutput {
    pub fn new(analysis: Value) -> Self {
        Self {
            analysis,
            tokens_used: 0,
            cost: 0.0,
        }
    }

    pub fn with_usage(mut self, tokens_used: u64, cost: f64) -> Self {
        self.tokens_used = tokens_used;
        self.cost = cost;
        self
    }
}

/// An analysis unit driven by the orchestrator.
///
/// `analyze` may run concurrently with other agents and must not assume
/// ordering in parallel mode. When an invocation times out, `ctx.cancel` is
/// cancelled and the task is aborted at its next await point. Blocking work
/// done outside the async runtime (e.g. a synchronous HTTP call) is not
/// interrupted and runs to completion on its thread.
#[async_trait]
pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;

    async fn analyze(&self, ctx: AnalysisContext) -> Result<AgentOutput>;
}
