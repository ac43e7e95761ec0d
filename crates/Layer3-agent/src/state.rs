//! Orchestration State - 한 번의 분석 실행 동안 전달되는 상태
//!
//! 에이전트 결과는 `AgentKind` 별 슬롯에만 기록된다. 슬롯 기록은
//! 오케스트레이터만 수행하며, 에이전트는 읽기 전용 스냅샷을 받는다.

use brainlift_foundation::AgentKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 분석 대상 작업(커밋) 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskInfo {
    pub id: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

impl TaskInfo {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }
}

/// 에이전트 하나의 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AgentResult {
    Success {
        analysis: Value,
        tokens_used: u64,
        cost: f64,
        timestamp: DateTime<Utc>,
    },
    Failure {
        error: String,
        timestamp: DateTime<Utc>,
    },
    Skipped {
        reason: String,
    },
}

impl AgentResult {
    pub fn success(analysis: Value, tokens_used: u64, cost: f64) -> Self {
        AgentResult::Success {
            analysis,
            tokens_used,
            cost,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        AgentResult::Failure {
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        AgentResult::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AgentResult::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, AgentResult::Skipped { .. })
    }

    pub fn analysis(&self) -> Option<&Value> {
        match self {
            AgentResult::Success { analysis, .. } => Some(analysis),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AgentResult::Failure { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn tokens_used(&self) -> u64 {
        match self {
            AgentResult::Success { tokens_used, .. } => *tokens_used,
            _ => 0,
        }
    }

    pub fn cost(&self) -> f64 {
        match self {
            AgentResult::Success { cost, .. } => *cost,
            _ => 0.0,
        }
    }
}

/// Typed carrier for one `analyze_commit` run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationState {
    pub project_id: String,
    pub change_text: String,
    pub task_info: TaskInfo,
    pub timestamp: DateTime<Utc>,
    pub results: BTreeMap<AgentKind, AgentResult>,
}

impl OrchestrationState {
    pub fn new(
        project_id: impl Into<String>,
        change_text: impl Into<String>,
        task_info: TaskInfo,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            change_text: change_text.into(),
            task_info,
            timestamp: Utc::now(),
            results: BTreeMap::new(),
        }
    }

    pub fn result(&self, kind: AgentKind) -> Option<&AgentResult> {
        self.results.get(&kind)
    }

    /// Analysis payload of a successful agent
    pub fn analysis(&self, kind: AgentKind) -> Option<&Value> {
        self.result(kind).and_then(AgentResult::analysis)
    }

    pub(crate) fn record(&mut self, kind: AgentKind, result: AgentResult) {
        self.results.insert(kind, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_is_tagged() {
        let ok = serde_json::to_value(AgentResult::success(json!({"a": 1}), 10, 0.1)).unwrap();
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["tokens_used"], 10);
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(AgentResult::failure("boom")).unwrap();
        assert_eq!(err["status"], "failure");
        assert_eq!(err["error"], "boom");
        assert!(err.get("analysis").is_none());
    }

    #[test]
    fn test_accessors() {
        let ok = AgentResult::success(json!({"x": true}), 7, 0.5);
        assert!(ok.is_success());
        assert_eq!(ok.tokens_used(), 7);
        assert_eq!(ok.error(), None);

        let skipped = AgentResult::skipped("budget");
        assert!(skipped.is_skipped());
        assert_eq!(skipped.cost(), 0.0);
        assert_eq!(skipped.analysis(), None);
    }

    #[test]
    fn test_state_slots() {
        let mut state = OrchestrationState::new("P", "diff", TaskInfo::new("abc", "msg"));
        state.record(AgentKind::Quality, AgentResult::success(json!({"quality_score": 80}), 1, 0.0));

        assert_eq!(
            state.analysis(AgentKind::Quality),
            Some(&json!({"quality_score": 80}))
        );
        assert!(state.result(AgentKind::Security).is_none());
    }
}
