use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::rule::{PolicyRule, PolicyRuleSpec};

/// On-disk shape of a rule table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    #[serde(default)]
    pub rules: Vec<PolicyRuleSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allowed,
    /// The reply must wait until `missing_tools` have been invoked.
    MustDefer {
        missing_tools: Vec<String>,
        rules: Vec<String>,
    },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn missing_tools(&self) -> &[String] {
        match self {
            Self::Allowed => &[],
            Self::MustDefer { missing_tools, .. } => missing_tools,
        }
    }

    /// Instruction handed to the model when its reply was held back.
    pub fn corrective_note(&self) -> Option<String> {
        match self {
            Self::Allowed => None,
            Self::MustDefer {
                missing_tools,
                rules,
            } => Some(format!(
                "Do not answer yet. This request falls under the {} policy; call these tools first and base your reply on their results: {}.",
                rules.join(", "),
                missing_tools.join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyEnforcer {
    rules: Vec<PolicyRule>,
}

impl PolicyEnforcer {
    /// Enforcer with no rules; every reply is allowed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: Vec<PolicyRule>) -> Result<Self, PolicyError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name.clone()) {
                return Err(PolicyError::DuplicateRule(rule.name.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn from_specs(specs: &[PolicyRuleSpec]) -> Result<Self, PolicyError> {
        let rules = specs
            .iter()
            .map(PolicyRuleSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rules(rules)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, PolicyError> {
        let spec: PolicySpec =
            serde_yaml::from_str(content).map_err(|e| PolicyError::Parse(e.to_string()))?;
        Self::from_specs(&spec.rules)
    }

    pub fn from_json_str(content: &str) -> Result<Self, PolicyError> {
        let spec: PolicySpec =
            serde_json::from_str(content).map_err(|e| PolicyError::Parse(e.to_string()))?;
        Self::from_specs(&spec.rules)
    }

    /// Loads a rule table; `.json` files are read as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let enforcer = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_yaml_str(&content)?,
        };
        log::info!(
            "Loaded {} policy rule(s) from {}",
            enforcer.rules.len(),
            path.display()
        );
        Ok(enforcer)
    }

    /// Merges another table into this one. Rule names must stay unique.
    pub fn extend(&mut self, other: PolicyEnforcer) -> Result<(), PolicyError> {
        for rule in other.rules {
            if self.rules.iter().any(|existing| existing.name == rule.name) {
                return Err(PolicyError::DuplicateRule(rule.name));
            }
            self.rules.push(rule);
        }
        Ok(())
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fails when a rule requires a tool that is not in `known_tools`.
    pub fn validate_tools<'a, I>(&self, known_tools: I) -> Result<(), PolicyError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: HashSet<&str> = known_tools.into_iter().collect();
        for rule in &self.rules {
            if let Some(tool) = rule
                .required_tools
                .iter()
                .find(|tool| !known.contains(tool.as_str()))
            {
                return Err(PolicyError::UnknownTool {
                    rule: rule.name.clone(),
                    tool: tool.clone(),
                });
            }
        }
        Ok(())
    }

    /// Decides whether a reply to `user_text` may be delivered given the tools
    /// already invoked for it.
    pub fn evaluate<'a, I>(&self, user_text: &str, invoked_tools: I) -> Verdict
    where
        I: IntoIterator<Item = &'a str>,
    {
        let invoked: HashSet<&str> = invoked_tools.into_iter().collect();

        let mut missing = BTreeSet::new();
        let mut rules = Vec::new();
        for rule in self.rules.iter().filter(|rule| rule.applies_to(user_text)) {
            let unmet: Vec<&String> = rule
                .required_tools
                .iter()
                .filter(|tool| !invoked.contains(tool.as_str()))
                .collect();
            if unmet.is_empty() {
                continue;
            }
            rules.push(rule.name.clone());
            missing.extend(unmet.into_iter().cloned());
        }

        if missing.is_empty() {
            return Verdict::Allowed;
        }

        log::debug!(
            "Policy deferral: rules [{}] still need [{}]",
            rules.join(", "),
            missing.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        Verdict::MustDefer {
            missing_tools: missing.into_iter().collect(),
            rules,
        }
    }
}
