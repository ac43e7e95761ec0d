//! Budget Tracker - 프로젝트별 토큰/비용 사용량
//!
//! `budget/usage.json` 에 누적, 일별, 모델별, 작업별 사용량을 기록한다.
//! 모든 기록 후 즉시 저장하며, 저장 실패는 로그만 남긴다. 저장은 사용량
//! 락을 쥔 채로 하므로 디스크에는 항상 가장 최근 기록이 남는다.

use super::{estimate, pricing};
use brainlift_foundation::storage::{ProjectPaths, USAGE_FILE};
use brainlift_foundation::{BudgetConfig, BudgetPolicy, Error, JsonStore, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of task records in a usage summary
pub const RECENT_TASK_LIMIT: usize = 10;

// ============================================================================
// Usage record (budget/usage.json)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageBucket {
    pub tokens: u64,
    pub cost: f64,
}

impl UsageBucket {
    pub fn add(&mut self, tokens: u64, cost: f64) {
        self.tokens += tokens;
        self.cost += cost;
    }
}

/// 작업(커밋) 하나의 사용량
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUsage {
    pub tokens: u64,
    pub cost: f64,
    pub model: String,
    /// Unix seconds of the last recording
    pub timestamp: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageRecord {
    pub total_tokens: u64,
    pub total_cost: f64,
    #[serde(rename = "commits")]
    pub tasks: HashMap<String, TaskUsage>,
    /// `YYYY-MM-DD` → bucket
    pub daily_usage: BTreeMap<String, UsageBucket>,
    pub model_breakdown: BTreeMap<String, UsageBucket>,
}

// ============================================================================
// Check / summary types
// ============================================================================

/// Pre-flight budget check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCheck {
    pub budget_enabled: bool,
    pub within_budget: bool,
    pub estimated_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_limit: Option<u64>,
    pub estimated_cost: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTask {
    pub task_id: String,
    #[serde(flatten)]
    pub usage: TaskUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total: UsageBucket,
    pub today: UsageBucket,
    pub week: UsageBucket,
    pub month: UsageBucket,
    pub by_model: BTreeMap<String, UsageBucket>,
    pub recent_tasks: Vec<RecentTask>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPeriod {
    All,
    Daily,
}

// ============================================================================
// BudgetTracker
// ============================================================================

pub struct BudgetTracker {
    project_id: String,
    config: BudgetConfig,
    store: JsonStore,
    usage: Mutex<UsageRecord>,
}

impl BudgetTracker {
    /// Load `budget/usage.json`; an unreadable file starts a fresh record
    pub fn open(paths: &ProjectPaths, config: BudgetConfig) -> Self {
        let store = paths.budget_store();
        let usage: UsageRecord = store.load_or_default(USAGE_FILE);

        info!(
            project = paths.project_id(),
            total_tokens = usage.total_tokens,
            "Budget tracker loaded"
        );

        Self {
            project_id: paths.project_id().to_string(),
            config,
            store,
            usage: Mutex::new(usage),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    pub fn estimate_tokens(&self, text: &str) -> u64 {
        estimate::estimate_tokens(text)
    }

    pub fn calculate_cost(&self, tokens: u64, model: &str) -> f64 {
        pricing::calculate_cost(tokens, model)
    }

    /// Compare an estimate against the per-task limit.
    ///
    /// Informational only; see [`BudgetTracker::guard`] for policy.
    pub fn check_budget(&self, estimated_tokens: u64, model: &str) -> BudgetCheck {
        let estimated_cost = self.calculate_cost(estimated_tokens, model);

        if !self.config.budget_enabled {
            return BudgetCheck {
                budget_enabled: false,
                within_budget: true,
                estimated_tokens,
                task_limit: None,
                estimated_cost,
                message: "Budget checking disabled".to_string(),
            };
        }

        let limit = self.config.commit_token_limit;
        let within_budget = estimated_tokens <= limit;
        BudgetCheck {
            budget_enabled: true,
            within_budget,
            estimated_tokens,
            task_limit: Some(limit),
            estimated_cost,
            message: if within_budget {
                "Within budget limit".to_string()
            } else {
                "Exceeds budget limit".to_string()
            },
        }
    }

    /// Check and apply the configured policy: `Warn` logs, `Enforce` fails
    pub fn guard(&self, estimated_tokens: u64, model: &str) -> Result<BudgetCheck> {
        let check = self.check_budget(estimated_tokens, model);
        if check.within_budget {
            return Ok(check);
        }

        match self.config.budget_policy {
            BudgetPolicy::Enforce => Err(Error::Budget(format!(
                "{} estimated tokens exceed limit of {}",
                estimated_tokens, self.config.commit_token_limit
            ))),
            BudgetPolicy::Warn => {
                warn!(
                    project = %self.project_id,
                    estimated_tokens,
                    limit = self.config.commit_token_limit,
                    "Exceeds budget limit, continuing"
                );
                Ok(check)
            }
        }
    }

    /// Record actual usage and persist; returns the cost charged
    pub fn record_usage(&self, tokens: u64, model: &str, task_id: Option<&str>) -> f64 {
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        self.record_on(tokens, model, task_id, Local::now().date_naive(), now)
    }

    fn record_on(
        &self,
        tokens: u64,
        model: &str,
        task_id: Option<&str>,
        day: NaiveDate,
        timestamp: f64,
    ) -> f64 {
        let cost = self.calculate_cost(tokens, model);

        {
            let mut usage = self.usage.lock();
            usage.total_tokens += tokens;
            usage.total_cost += cost;
            usage
                .daily_usage
                .entry(day.format(DATE_FORMAT).to_string())
                .or_default()
                .add(tokens, cost);
            usage
                .model_breakdown
                .entry(model.to_string())
                .or_default()
                .add(tokens, cost);

            if let Some(task_id) = task_id {
                let task = usage
                    .tasks
                    .entry(task_id.to_string())
                    .or_insert_with(|| TaskUsage {
                        tokens: 0,
                        cost: 0.0,
                        model: model.to_string(),
                        timestamp,
                    });
                task.tokens += tokens;
                task.cost += cost;
                task.model = model.to_string();
                task.timestamp = timestamp;
            }
            self.persist(&usage);
        }

        info!(tokens, cost, model, "Recorded usage");
        cost
    }

    pub fn usage_summary(&self) -> UsageSummary {
        self.usage_summary_on(Local::now().date_naive())
    }

    /// Summary relative to `today`; windows compare `YYYY-MM-DD` strings
    pub fn usage_summary_on(&self, today: NaiveDate) -> UsageSummary {
        let usage = self.usage.lock();

        let today_key = today.format(DATE_FORMAT).to_string();
        let week_ago = (today - ChronoDuration::days(7)).format(DATE_FORMAT).to_string();
        let month_ago = (today - ChronoDuration::days(30)).format(DATE_FORMAT).to_string();

        let window = |since: &str| {
            usage
                .daily_usage
                .iter()
                .filter(|(date, _)| date.as_str() >= since)
                .fold(UsageBucket::default(), |mut acc, (_, b)| {
                    acc.add(b.tokens, b.cost);
                    acc
                })
        };

        let mut recent_tasks: Vec<RecentTask> = usage
            .tasks
            .iter()
            .map(|(id, task)| RecentTask {
                task_id: id.clone(),
                usage: task.clone(),
            })
            .collect();
        recent_tasks.sort_by(|a, b| {
            b.usage
                .timestamp
                .total_cmp(&a.usage.timestamp)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        recent_tasks.truncate(RECENT_TASK_LIMIT);

        UsageSummary {
            total: UsageBucket {
                tokens: usage.total_tokens,
                cost: usage.total_cost,
            },
            today: usage.daily_usage.get(&today_key).copied().unwrap_or_default(),
            week: window(&week_ago),
            month: window(&month_ago),
            by_model: usage.model_breakdown.clone(),
            recent_tasks,
        }
    }

    pub fn reset_usage(&self, period: ResetPeriod) {
        self.reset_on(period, Local::now().date_naive());
    }

    fn reset_on(&self, period: ResetPeriod, today: NaiveDate) {
        {
            let mut usage = self.usage.lock();
            match period {
                ResetPeriod::All => *usage = UsageRecord::default(),
                ResetPeriod::Daily => {
                    usage.daily_usage.remove(&today.format(DATE_FORMAT).to_string());
                }
            }
            self.persist(&usage);
        }

        info!(project = %self.project_id, ?period, "Reset usage");
    }

    /// Snapshot of the current record
    pub fn usage(&self) -> UsageRecord {
        self.usage.lock().clone()
    }

    fn persist(&self, usage: &UsageRecord) {
        if let Err(e) = self.store.save(USAGE_FILE, usage) {
            warn!("Failed to save usage data: {}", e);
        }
    }
}
