//! # Budget
//!
//! 토큰 추정, 모델별 단가, 프로젝트별 사용량 추적.
//!
//! - [`estimate_tokens`]: 문자 수 기반 휴리스틱
//! - [`pricing`]: 1K 토큰당 단가 표
//! - [`BudgetTracker`]: `budget/usage.json` 누적/일별/모델별/작업별 집계

mod estimate;
pub mod pricing;
mod tracker;

pub use estimate::{estimate_tokens, looks_like_code};
pub use pricing::calculate_cost;
pub use tracker::{
    BudgetCheck, BudgetTracker, RecentTask, ResetPeriod, TaskUsage, UsageBucket, UsageRecord,
    UsageSummary, RECENT_TASK_LIMIT,
};
