use std::collections::BTreeSet;
use std::sync::Arc;

use agent_llm::ModelClient;
use agent_loop::{AgentLoopConfig, Conversation};
use agent_policy::{PolicyEnforcer, PolicyError};
use agent_tools::{Medication, PharmacyStore, ToolRegistry};

/// Everything a conversation shares with every other conversation.
#[derive(Clone)]
pub struct Assistant {
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    policy: Arc<PolicyEnforcer>,
    store: Arc<dyn PharmacyStore>,
    config: AgentLoopConfig,
}

impl Assistant {
    /// Fails when a policy rule requires a tool the registry does not have.
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        policy: Arc<PolicyEnforcer>,
        store: Arc<dyn PharmacyStore>,
        config: AgentLoopConfig,
    ) -> Result<Self, PolicyError> {
        let tool_names = tools.list_tool_names();
        policy.validate_tools(tool_names.iter().map(String::as_str))?;

        Ok(Self {
            model,
            tools,
            policy,
            store,
            config,
        })
    }

    pub fn conversation(&self) -> Conversation {
        Conversation::new(
            Arc::clone(&self.model),
            Arc::clone(&self.tools),
            Arc::clone(&self.policy),
            self.config.clone(),
        )
    }

    pub fn conversation_with_id(&self, id: impl Into<String>) -> Conversation {
        self.conversation().with_id(id)
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn policy(&self) -> &PolicyEnforcer {
        &self.policy
    }

    /// The record store behind the tools, for operator updates.
    pub fn store(&self) -> &Arc<dyn PharmacyStore> {
        &self.store
    }

    pub fn config(&self) -> &AgentLoopConfig {
        &self.config
    }
}

/// Brand and generic names the dispensing rule watches for.
pub fn medication_terms(medications: &[Medication]) -> Vec<String> {
    medications
        .iter()
        .flat_map(|medication| {
            std::iter::once(medication.name.clone()).chain(medication.generic_name.clone())
        })
        .filter(|name| !name.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
