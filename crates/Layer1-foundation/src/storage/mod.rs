//! Storage module for Brainlift
//!
//! - `json`: JSON - 캐시 스냅샷, 사용량, 통계 파일 저장/로드
//! - `paths`: 프로젝트 단위 저장소 위치 (주입형)

mod json;
mod paths;

pub use json::JsonStore;
pub use paths::{
    ProjectPaths, EXACT_CACHE_FILE, SEMANTIC_DB_FILE, SETTINGS_FILE, STATS_FILE, USAGE_FILE,
};
