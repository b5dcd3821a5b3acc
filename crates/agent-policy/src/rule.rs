use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::trigger::{Trigger, TriggerSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRuleSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub trigger: TriggerSpec,
    pub required_tools: Vec<String>,
}

impl PolicyRuleSpec {
    pub fn compile(&self) -> Result<PolicyRule, PolicyError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PolicyError::UnnamedRule);
        }

        let required_tools: BTreeSet<String> = self
            .required_tools
            .iter()
            .map(|tool| tool.trim())
            .filter(|tool| !tool.is_empty())
            .map(str::to_string)
            .collect();
        if required_tools.is_empty() {
            return Err(PolicyError::EmptyRule(name.to_string()));
        }

        Ok(PolicyRule {
            name: name.to_string(),
            trigger: self.trigger.compile()?,
            required_tools,
        })
    }
}

/// A trigger and the tools that must run whenever it fires.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    pub name: String,
    pub trigger: Trigger,
    pub required_tools: BTreeSet<String>,
}

impl PolicyRule {
    pub fn applies_to(&self, user_text: &str) -> bool {
        self.trigger.is_match(user_text)
    }
}
