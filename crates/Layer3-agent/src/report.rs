//! Analysis Report - 에이전트 결과 집계
//!
//! 점수 차원별 기본값:
//!
//! ```text
//! ┌───────────────┬──────────────────────┬─────────┐
//! │ dimension     │ analysis field       │ default │
//! ├───────────────┼──────────────────────┼─────────┤
//! │ security      │ security_score       │ 100     │
//! │ quality       │ quality_score        │ 70      │
//! │ documentation │ documentation_score  │ 50      │
//! └───────────────┴──────────────────────┴─────────┘
//! ```

use crate::state::{AgentResult, OrchestrationState, TaskInfo};
use brainlift_foundation::{AgentKind, ExecutionMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const NO_RESULTS_SUMMARY: &str = "No analysis results available";

/// Running totals for one `analyze_commit` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Agents that completed successfully
    pub agents_run: usize,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// Seconds
    pub execution_time: f64,
}

impl RunMetrics {
    pub fn record(&mut self, result: &AgentResult) {
        if result.is_success() {
            self.agents_run += 1;
            self.total_tokens += result.tokens_used();
            self.total_cost += result.cost();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub task_info: TaskInfo,
    pub execution_mode: ExecutionMode,
    pub agents: BTreeMap<AgentKind, AgentResult>,
    pub summary: String,
    pub overall_scores: BTreeMap<AgentKind, f64>,
    pub metrics: RunMetrics,
}

impl AnalysisReport {
    pub fn agent(&self, kind: AgentKind) -> Option<&AgentResult> {
        self.agents.get(&kind)
    }

    pub fn score(&self, kind: AgentKind) -> f64 {
        self.overall_scores
            .get(&kind)
            .copied()
            .unwrap_or_else(|| default_score(kind))
    }
}

pub(crate) fn aggregate(
    state: OrchestrationState,
    metrics: RunMetrics,
    execution_mode: ExecutionMode,
) -> AnalysisReport {
    let summary = summarize(&state.results);
    let overall_scores = overall_scores(&state.results);

    AnalysisReport {
        project_id: state.project_id,
        timestamp: state.timestamp,
        task_info: state.task_info,
        execution_mode,
        agents: state.results,
        summary,
        overall_scores,
        metrics,
    }
}

pub fn score_field(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Security => "security_score",
        AgentKind::Quality => "quality_score",
        AgentKind::Documentation => "documentation_score",
    }
}

pub fn default_score(kind: AgentKind) -> f64 {
    match kind {
        AgentKind::Security => 100.0,
        AgentKind::Quality => 70.0,
        AgentKind::Documentation => 50.0,
    }
}

/// One score per dimension; missing or failed agents get the default
pub fn overall_scores(results: &BTreeMap<AgentKind, AgentResult>) -> BTreeMap<AgentKind, f64> {
    AgentKind::ALL
        .iter()
        .map(|kind| {
            let score = results
                .get(kind)
                .and_then(AgentResult::analysis)
                .and_then(|a| a.get(score_field(*kind)))
                .and_then(Value::as_f64)
                .unwrap_or_else(|| default_score(*kind));
            (*kind, score)
        })
        .collect()
}

/// One-line summary joined with " | "
pub fn summarize(results: &BTreeMap<AgentKind, AgentResult>) -> String {
    let analysis = move |kind: AgentKind| results.get(&kind).and_then(AgentResult::analysis);
    let mut parts = Vec::new();

    if let Some(security) = analysis(AgentKind::Security) {
        let severity = security
            .get("severity")
            .map(display_value)
            .unwrap_or_else(|| "none".to_string());
        if severity != "none" {
            parts.push(format!("Security: {} severity issues found", severity));
        }
    }

    if let Some(quality) = analysis(AgentKind::Quality) {
        parts.push(format!(
            "Code Quality: {}/100",
            score_text(quality, AgentKind::Quality)
        ));
    }

    if let Some(docs) = analysis(AgentKind::Documentation) {
        parts.push(format!(
            "Documentation: {}/100",
            score_text(docs, AgentKind::Documentation)
        ));
    }

    if parts.is_empty() {
        NO_RESULTS_SUMMARY.to_string()
    } else {
        parts.join(" | ")
    }
}

fn score_text(analysis: &Value, kind: AgentKind) -> String {
    analysis
        .get(score_field(kind))
        .map(display_value)
        .unwrap_or_else(|| "0".to_string())
}

// 문자열은 따옴표 없이
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `severity` reported by the security agent, if any
pub fn reported_severity(results: &BTreeMap<AgentKind, AgentResult>) -> Option<&str> {
    results
        .get(&AgentKind::Security)
        .and_then(AgentResult::analysis)
        .and_then(|a| a.get("severity"))
        .and_then(Value::as_str)
}
