//! # brainlift-foundation
//!
//! Foundation layer for Brainlift:
//! - Error: 공통 에러 타입과 Result
//! - Config: 캐시/예산/오케스트레이터 설정 (BrainliftConfig)
//! - Storage: 프로젝트 저장소 위치 (ProjectPaths), JsonStore
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  Layer3-agent    Orchestrator, Agent, Registry       │
//! │                     │                                │
//! │  Layer2-core     CacheCoordinator, BudgetTracker     │
//! │  Layer2-provider EmbeddingProvider, CompletionClient │
//! │                     │                                │
//! │  Layer1-foundation  Error, Config, ProjectPaths      │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    AgentKind, AgentSettings, BrainliftConfig, BudgetConfig, BudgetPolicy, CacheConfig,
    ExecutionMode, OrchestratorConfig,
};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{JsonStore, ProjectPaths};
