//! Budget Configuration - 작업별 토큰 예산 설정

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// 예산 초과 시 동작
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPolicy {
    /// 경고만 기록하고 계속 진행
    #[default]
    Warn,
    /// 생성 자체를 막음
    Enforce,
}

/// 예산 설정
///
/// Key names follow the settings file written by the editor integration
/// (`budgetEnabled`, `commitTokenLimit`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetConfig {
    /// 예산 검사 활성화
    #[serde(default)]
    pub budget_enabled: bool,

    /// 작업(커밋) 하나당 토큰 한도
    #[serde(default = "default_commit_token_limit")]
    pub commit_token_limit: u64,

    /// 한도 초과 시 정책
    #[serde(default)]
    pub budget_policy: BudgetPolicy,
}

fn default_commit_token_limit() -> u64 {
    10_000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            budget_enabled: false,
            commit_token_limit: default_commit_token_limit(),
            budget_policy: BudgetPolicy::Warn,
        }
    }
}

impl BudgetConfig {
    /// 한도를 강제하는 설정
    pub fn enforcing(commit_token_limit: u64) -> Self {
        Self {
            budget_enabled: true,
            commit_token_limit,
            budget_policy: BudgetPolicy::Enforce,
        }
    }

    pub fn is_enforced(&self) -> bool {
        self.budget_enabled && self.budget_policy == BudgetPolicy::Enforce
    }

    pub fn validate(&self) -> Result<()> {
        if self.budget_enabled && self.commit_token_limit == 0 {
            return Err(Error::Validation(
                "commitTokenLimit must be positive when budgetEnabled".into(),
            ));
        }
        Ok(())
    }
}
