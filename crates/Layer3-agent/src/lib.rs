//! # brainlift-agent
//!
//! 변경 분석 에이전트 오케스트레이션.
//!
//! ## 핵심 원칙
//!
//! 1. **Fault isolation** - 에이전트 하나의 실패는 자기 결과 슬롯에만 기록
//! 2. **Typed state** - `AgentKind` → `AgentResult` 맵, 문자열 키 없음
//! 3. **Real cancellation** - 타임아웃 시 `CancellationToken` 취소 + task abort
//!
//! ## 핵심 컴포넌트
//!
//! - **Agent**: 분석 단위 트레이트
//! - **AgentRegistry**: `AgentKind` → `Agent` 매핑 (등록 순서 유지)
//! - **Orchestrator**: parallel / sequential / priority 실행과 보고서 집계
//! - **CachingAgent**: `CacheCoordinator` + `BudgetTracker` 를 거치는 LLM 에이전트
//!
//! ## 사용 예
//!
//! ```ignore
//! use brainlift_agent::{CachingAgent, Orchestrator, TaskInfo};
//!
//! let security = CachingAgent::new(AgentKind::Security, client.clone(), security_prompt, cache.clone())
//!     .with_budget(budget.clone());
//!
//! let orchestrator = Orchestrator::new("my-project", config.orchestrator, vec![Arc::new(security)])?
//!     .with_budget(budget);
//!
//! let report = orchestrator
//!     .analyze_commit(&diff, TaskInfo::new("abc123", "Fix login"))
//!     .await;
//! println!("{}", report.summary);
//! ```

pub mod agent;
pub mod caching_agent;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod response;
pub mod state;

// ============================================================================
// Primary Exports
// ============================================================================

pub use agent::{Agent, AgentOutput, AnalysisContext};
pub use caching_agent::{CachingAgent, PromptBuilder, MAX_CHANGE_CHARS};
pub use orchestrator::{AgentStatus, Orchestrator, SettingsUpdate, NO_INPUT_REASON};
pub use registry::{AgentRegistry, RegisteredAgent};
pub use report::{AnalysisReport, RunMetrics};
pub use response::{parse_analysis, ResponseDefaults};
pub use state::{AgentResult, OrchestrationState, TaskInfo};

pub use brainlift_foundation::AgentKind;
