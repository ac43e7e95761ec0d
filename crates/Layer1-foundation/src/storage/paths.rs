//! Project storage layout
//!
//! 캐시/예산 파일 위치를 결정하는 주입형 설정. 코어 컴포넌트는 플랫폼 경로를
//! 직접 찾지 않고 항상 `ProjectPaths`를 전달받는다.
//!
//! ```text
//! <base>/<project_id>/
//! ├── settings.json
//! ├── cache/
//! │   ├── exact_cache.json
//! │   ├── semantic_cache.db
//! │   └── stats.json
//! └── budget/
//!     └── usage.json
//! ```

use crate::{Error, JsonStore, Result};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";
pub const EXACT_CACHE_FILE: &str = "exact_cache.json";
pub const SEMANTIC_DB_FILE: &str = "semantic_cache.db";
pub const STATS_FILE: &str = "stats.json";
pub const USAGE_FILE: &str = "usage.json";

const APP_DIR: &str = "brainlift";

/// 프로젝트 단위 저장소 위치
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    project_id: String,
    root: PathBuf,
}

impl ProjectPaths {
    /// `<base>/<project_id>` 를 루트로 사용
    pub fn new(base: impl AsRef<Path>, project_id: impl Into<String>) -> Result<Self> {
        let project_id = project_id.into();
        validate_project_id(&project_id)?;
        let root = base.as_ref().join(&project_id);
        Ok(Self { project_id, root })
    }

    /// 플랫폼 기본 데이터 디렉토리 (`<data_dir>/brainlift/projects/<project_id>`)
    pub fn platform_default(project_id: impl Into<String>) -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| Error::Config("Cannot find data directory".to_string()))?
            .join(APP_DIR)
            .join("projects");
        Self::new(base, project_id)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn budget_dir(&self) -> PathBuf {
        self.root.join("budget")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn exact_cache_file(&self) -> PathBuf {
        self.cache_dir().join(EXACT_CACHE_FILE)
    }

    pub fn semantic_db_file(&self) -> PathBuf {
        self.cache_dir().join(SEMANTIC_DB_FILE)
    }

    pub fn stats_file(&self) -> PathBuf {
        self.cache_dir().join(STATS_FILE)
    }

    pub fn usage_file(&self) -> PathBuf {
        self.budget_dir().join(USAGE_FILE)
    }

    /// 프로젝트 루트 저장소 (settings.json)
    pub fn root_store(&self) -> JsonStore {
        JsonStore::new(&self.root)
    }

    /// 캐시 디렉토리 저장소 (exact_cache.json, stats.json)
    pub fn cache_store(&self) -> JsonStore {
        JsonStore::new(self.cache_dir())
    }

    /// 예산 디렉토리 저장소 (usage.json)
    pub fn budget_store(&self) -> JsonStore {
        JsonStore::new(self.budget_dir())
    }
}

fn validate_project_id(project_id: &str) -> Result<()> {
    if project_id.trim().is_empty() {
        return Err(Error::Validation("project_id must not be empty".to_string()));
    }
    if project_id == "." || project_id == ".." || project_id.contains(['/', '\\']) {
        return Err(Error::Validation(format!(
            "project_id must be a single path segment: {}",
            project_id
        )));
    }
    Ok(())
}
