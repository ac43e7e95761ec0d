//! Config - 통합 설정 관리
//!
//! - `cache.rs` - exact/semantic 캐시 설정
//! - `budget.rs` - 토큰 예산 설정
//! - `orchestrator.rs` - 에이전트 실행 전략 및 에이전트 설정
//! - `settings.rs` - BrainliftConfig 통합 설정

mod budget;
mod cache;
mod orchestrator;
mod settings;

pub use budget::{BudgetConfig, BudgetPolicy};
pub use cache::{CacheConfig, DEFAULT_EMBEDDING_MODEL};
pub use orchestrator::{
    AgentKind, AgentSettings, ExecutionMode, OrchestratorConfig, DEFAULT_AGENT_MODEL,
    UNLISTED_PRIORITY,
};
pub use settings::BrainliftConfig;
