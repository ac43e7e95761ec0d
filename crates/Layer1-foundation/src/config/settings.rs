//! Brainlift Config - 통합 설정
//!
//! 프로젝트 루트의 `settings.json` 하나로 캐시/오케스트레이터/예산 설정을 관리

use super::{CacheConfig, OrchestratorConfig};
use crate::storage::{ProjectPaths, SETTINGS_FILE};
use crate::Result;
use serde::{Deserialize, Serialize};

/// 통합 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrainliftConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl BrainliftConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 프로젝트 설정 로드 (없으면 기본값), 검증 포함
    pub fn load(paths: &ProjectPaths) -> Result<Self> {
        let config = paths
            .root_store()
            .load_optional::<BrainliftConfig>(SETTINGS_FILE)?
            .unwrap_or_default();
        config.validate()?;
        tracing::debug!(
            project = paths.project_id(),
            mode = config.orchestrator.execution_mode.as_str(),
            "Loaded settings"
        );
        Ok(config)
    }

    /// 프로젝트 설정 저장
    pub fn save(&self, paths: &ProjectPaths) -> Result<()> {
        self.validate()?;
        paths.root_store().save(SETTINGS_FILE, self)
    }

    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.orchestrator.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_default() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), "proj").unwrap();

        let config = BrainliftConfig::load(&paths).unwrap();
        assert_eq!(config, BrainliftConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), "proj").unwrap();

        let mut config = BrainliftConfig::new();
        config.orchestrator.execution_mode = ExecutionMode::Sequential;
        config.orchestrator.budget.budget_enabled = true;
        config.cache.similarity_threshold = 0.9;
        config.save(&paths).unwrap();

        let raw = std::fs::read_to_string(paths.settings_file()).unwrap();
        assert!(raw.contains("\"budgetEnabled\": true"));

        let loaded = BrainliftConfig::load(&paths).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), "proj").unwrap();
        std::fs::create_dir_all(paths.root()).unwrap();
        std::fs::write(
            paths.settings_file(),
            r#"{ "orchestrator": { "max_workers": 0 } }"#,
        )
        .unwrap();

        assert!(BrainliftConfig::load(&paths).is_err());
    }
}
