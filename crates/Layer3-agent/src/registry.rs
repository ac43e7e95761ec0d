//! Agent Registry
//!
//! `AgentKind` → `Agent` 구현 매핑. 등록 순서가 순차 실행 순서이자
//! 우선순위 동률의 기준이 된다.

use crate::agent::Agent;
use brainlift_foundation::{AgentKind, AgentSettings, Error, OrchestratorConfig, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Registered agent with its runtime settings
#[derive(Clone)]
pub struct RegisteredAgent {
    pub agent: Arc<dyn Agent>,
    pub settings: AgentSettings,
}

impl RegisteredAgent {
    pub fn kind(&self) -> AgentKind {
        self.agent.kind()
    }
}

#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<RegisteredAgent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from validated configuration; settings come from `config.agents`
    pub fn from_config(agents: Vec<Arc<dyn Agent>>, config: &OrchestratorConfig) -> Self {
        let mut registry = Self::new();
        for agent in agents {
            let settings = config.settings_for(agent.kind());
            registry.register(agent, settings);
        }
        info!("Initialized {} agents", registry.len());
        registry
    }

    /// Register an agent; re-registering a kind replaces it in place
    pub fn register(&mut self, agent: Arc<dyn Agent>, settings: AgentSettings) {
        let kind = agent.kind();
        let entry = RegisteredAgent { agent, settings };
        match self.agents.iter_mut().find(|r| r.kind() == kind) {
            Some(existing) => {
                debug!("Replacing {} agent", kind);
                *existing = entry;
            }
            None => self.agents.push(entry),
        }
    }

    pub fn get(&self, kind: AgentKind) -> Option<&RegisteredAgent> {
        self.agents.iter().find(|r| r.kind() == kind)
    }

    pub fn settings(&self, kind: AgentKind) -> Option<&AgentSettings> {
        self.get(kind).map(|r| &r.settings)
    }

    pub fn update_settings(&mut self, kind: AgentKind, settings: AgentSettings) -> Result<()> {
        let entry = self
            .agents
            .iter_mut()
            .find(|r| r.kind() == kind)
            .ok_or_else(|| Error::Config(format!("Agent {} not registered", kind)))?;
        entry.settings = settings;
        Ok(())
    }

    /// Registered agents in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredAgent> {
        self.agents.iter()
    }

    /// Enabled agents in registration order
    pub fn enabled(&self) -> Vec<RegisteredAgent> {
        self.agents
            .iter()
            .filter(|r| r.settings.enabled)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentOutput, AnalysisContext};
    use async_trait::async_trait;
    use serde_json::json;

    struct Named(AgentKind);

    #[async_trait]
    impl Agent for Named {
        fn kind(&self) -> AgentKind {
            self.0
        }

        async fn analyze(&self, _ctx: AnalysisContext) -> Result<AgentOutput> {
            Ok(AgentOutput::new(json!({})))
        }
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(Named(AgentKind::Documentation)), AgentSettings::default());
        registry.register(Arc::new(Named(AgentKind::Security)), AgentSettings::default());

        let kinds: Vec<_> = registry.iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec![AgentKind::Documentation, AgentKind::Security]);
    }

    #[test]
    fn test_from_config_applies_settings() {
        let mut config = OrchestratorConfig::default();
        config
            .agents
            .insert(AgentKind::Quality, AgentSettings::disabled());

        let registry = AgentRegistry::from_config(
            vec![
                Arc::new(Named(AgentKind::Security)),
                Arc::new(Named(AgentKind::Quality)),
            ],
            &config,
        );

        let enabled: Vec<_> = registry.enabled().iter().map(|r| r.kind()).collect();
        assert_eq!(enabled, vec![AgentKind::Security]);
    }

    #[test]
    fn test_update_settings() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(Named(AgentKind::Security)), AgentSettings::default());

        registry
            .update_settings(AgentKind::Security, AgentSettings::with_model("gpt-4"))
            .unwrap();
        assert_eq!(registry.settings(AgentKind::Security).unwrap().model, "gpt-4");

        assert!(registry
            .update_settings(AgentKind::Quality, AgentSettings::default())
            .is_err());
    }

    #[test]
    fn test_register_replaces_same_kind() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(Named(AgentKind::Security)), AgentSettings::default());
        registry.register(Arc::new(Named(AgentKind::Security)), AgentSettings::disabled());

        assert_eq!(registry.len(), 1);
        assert!(registry.enabled().is_empty());
    }
}
