use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Serializable description of a trigger, as written in a rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerSpec {
    /// Any of the terms appears as a whole word, ignoring case.
    MentionsAny { terms: Vec<String> },
    /// The regular expression matches somewhere in the text.
    Matches { pattern: String },
    All { of: Vec<TriggerSpec> },
    Any { of: Vec<TriggerSpec> },
    Not { of: Box<TriggerSpec> },
    Always,
}

impl TriggerSpec {
    pub fn mentions_any<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MentionsAny {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(pattern: impl Into<String>) -> Self {
        Self::Matches {
            pattern: pattern.into(),
        }
    }

    pub fn compile(&self) -> Result<Trigger, PolicyError> {
        match self {
            Self::MentionsAny { terms } => {
                let mut alternatives: Vec<String> = terms
                    .iter()
                    .map(|term| term.trim())
                    .filter(|term| !term.is_empty())
                    .map(regex::escape)
                    .collect();
                if alternatives.is_empty() {
                    return Err(PolicyError::EmptyTerms);
                }
                alternatives.sort_by(|a, b| b.len().cmp(&a.len()));
                alternatives.dedup();
                compile_regex(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
                    .map(Trigger::Pattern)
            }
            Self::Matches { pattern } => compile_regex(pattern).map(Trigger::Pattern),
            Self::All { of } => of
                .iter()
                .map(TriggerSpec::compile)
                .collect::<Result<Vec<_>, _>>()
                .map(Trigger::All),
            Self::Any { of } => of
                .iter()
                .map(TriggerSpec::compile)
                .collect::<Result<Vec<_>, _>>()
                .map(Trigger::Any),
            Self::Not { of } => Ok(Trigger::Not(Box::new(of.compile()?))),
            Self::Always => Ok(Trigger::Always),
        }
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, PolicyError> {
    Regex::new(pattern).map_err(|error| PolicyError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: error.to_string(),
    })
}

/// Compiled predicate over a user message.
#[derive(Debug, Clone)]
pub enum Trigger {
    Pattern(Regex),
    All(Vec<Trigger>),
    Any(Vec<Trigger>),
    Not(Box<Trigger>),
    Always,
}

impl Trigger {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Pattern(regex) => regex.is_match(text),
            Self::All(triggers) => triggers.iter().all(|trigger| trigger.is_match(text)),
            Self::Any(triggers) => triggers.iter().any(|trigger| trigger.is_match(text)),
            Self::Not(trigger) => !trigger.is_match(text),
            Self::Always => true,
        }
    }
}
