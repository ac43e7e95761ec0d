//! Orchestrator Configuration - 에이전트 실행 전략/설정
//!
//! ```json
//! {
//!   "execution_mode": "priority",
//!   "budgetEnabled": true,
//!   "commitTokenLimit": 10000,
//!   "agent_priorities": { "security": 1, "quality": 2 },
//!   "agents": { "documentation": { "enabled": false, "model": "gpt-4-turbo" } }
//! }
//! ```

use super::BudgetConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 기본 에이전트 모델
pub const DEFAULT_AGENT_MODEL: &str = "gpt-4-turbo";

/// 우선순위 맵에 없는 에이전트의 우선순위 (가장 마지막)
pub const UNLISTED_PRIORITY: u32 = 999;

// ============================================================================
// AgentKind
// ============================================================================

/// 에이전트 종류 (닫힌 집합)
///
/// Declaration order is registration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Security,
    Quality,
    Documentation,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [
        AgentKind::Security,
        AgentKind::Quality,
        AgentKind::Documentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Security => "security",
            AgentKind::Quality => "quality",
            AgentKind::Documentation => "documentation",
        }
    }

    pub fn default_priority(&self) -> u32 {
        match self {
            AgentKind::Security => 1,
            AgentKind::Quality => 2,
            AgentKind::Documentation => 3,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "security" => Ok(AgentKind::Security),
            "quality" => Ok(AgentKind::Quality),
            "documentation" => Ok(AgentKind::Documentation),
            other => Err(Error::Config(format!("Unknown agent: {}", other))),
        }
    }
}

// ============================================================================
// Execution mode / agent settings
// ============================================================================

/// 실행 전략
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Parallel,
    Sequential,
    Priority,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Parallel => "parallel",
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Priority => "priority",
        }
    }
}

/// 에이전트별 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_model")]
    pub model: String,
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    DEFAULT_AGENT_MODEL.to_string()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_model(),
        }
    }
}

impl AgentSettings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            enabled: true,
            model: model.into(),
        }
    }
}

// ============================================================================
// OrchestratorConfig
// ============================================================================

/// 오케스트레이터 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// 실행 전략
    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// 예산 설정 (budgetEnabled / commitTokenLimit / budgetPolicy)
    #[serde(flatten)]
    pub budget: BudgetConfig,

    /// 우선순위 (낮을수록 먼저)
    #[serde(default = "default_priorities")]
    pub agent_priorities: BTreeMap<AgentKind, u32>,

    /// 에이전트별 설정 (없는 항목은 기본값)
    #[serde(default = "default_agents")]
    pub agents: BTreeMap<AgentKind, AgentSettings>,

    /// 병렬 실행 최대 동시 수
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// 에이전트 하나의 타임아웃 (초)
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout_secs: u64,

    /// priority 모드에서 high severity 발견 시 중단
    #[serde(default)]
    pub stop_on_high_severity: bool,
}

fn default_priorities() -> BTreeMap<AgentKind, u32> {
    AgentKind::ALL
        .iter()
        .map(|kind| (*kind, kind.default_priority()))
        .collect()
}

fn default_agents() -> BTreeMap<AgentKind, AgentSettings> {
    AgentKind::ALL
        .iter()
        .map(|kind| (*kind, AgentSettings::default()))
        .collect()
}

fn default_max_workers() -> usize {
    3
}

fn default_agent_timeout_secs() -> u64 {
    30
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Parallel,
            budget: BudgetConfig::default(),
            agent_priorities: default_priorities(),
            agents: default_agents(),
            max_workers: default_max_workers(),
            agent_timeout_secs: default_agent_timeout_secs(),
            stop_on_high_severity: false,
        }
    }
}

impl OrchestratorConfig {
    /// 순차 실행 설정
    pub fn sequential() -> Self {
        Self {
            execution_mode: ExecutionMode::Sequential,
            ..Default::default()
        }
    }

    /// 우선순위 실행 설정
    pub fn priority() -> Self {
        Self {
            execution_mode: ExecutionMode::Priority,
            ..Default::default()
        }
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    /// 에이전트 설정 (미등록이면 기본값)
    pub fn settings_for(&self, kind: AgentKind) -> AgentSettings {
        self.agents.get(&kind).cloned().unwrap_or_default()
    }

    /// 에이전트 우선순위 (미등록이면 UNLISTED_PRIORITY)
    pub fn priority_of(&self, kind: AgentKind) -> u32 {
        self.agent_priorities
            .get(&kind)
            .copied()
            .unwrap_or(UNLISTED_PRIORITY)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::Validation("max_workers must be at least 1".into()));
        }
        if self.agent_timeout_secs == 0 {
            return Err(Error::Validation(
                "agent_timeout_secs must be at least 1".into(),
            ));
        }
        for (kind, settings) in &self.agents {
            if settings.model.trim().is_empty() {
                return Err(Error::Validation(format!("Agent {} has no model", kind)));
            }
        }
        self.budget.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.execution_mode, ExecutionMode::Parallel);
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.agent_timeout(), Duration::from_secs(30));
        assert_eq!(config.priority_of(AgentKind::Security), 1);
        assert_eq!(config.priority_of(AgentKind::Documentation), 3);
        assert!(config.settings_for(AgentKind::Quality).enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_reference_shape() {
        let json = r#"{
            "execution_mode": "priority",
            "budgetEnabled": true,
            "commitTokenLimit": 100,
            "agent_priorities": { "quality": 1 },
            "agents": { "documentation": { "enabled": false } }
        }"#;
        let config: OrchestratorConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.execution_mode, ExecutionMode::Priority);
        assert!(config.budget.budget_enabled);
        assert_eq!(config.budget.commit_token_limit, 100);
        assert_eq!(config.priority_of(AgentKind::Quality), 1);
        assert_eq!(config.priority_of(AgentKind::Security), UNLISTED_PRIORITY);

        let docs = config.settings_for(AgentKind::Documentation);
        assert!(!docs.enabled);
        assert_eq!(docs.model, DEFAULT_AGENT_MODEL);
        // 맵에 없는 에이전트는 기본 설정
        assert!(config.settings_for(AgentKind::Security).enabled);
    }

    #[test]
    fn test_unknown_agent_is_rejected() {
        let json = r#"{ "agents": { "style": { "enabled": true } } }"#;
        assert!(serde_json::from_str::<OrchestratorConfig>(json).is_err());
        assert!("style".parse::<AgentKind>().is_err());
        assert_eq!("Security".parse::<AgentKind>().unwrap(), AgentKind::Security);
    }

    #[test]
    fn test_validate() {
        let config = OrchestratorConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
