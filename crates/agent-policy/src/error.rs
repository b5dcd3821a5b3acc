use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("trigger has no terms")]
    EmptyTerms,

    #[error("rule '{0}' requires no tools")]
    EmptyRule(String),

    #[error("rule name cannot be empty")]
    UnnamedRule,

    #[error("duplicate rule '{0}'")]
    DuplicateRule(String),

    #[error("rule '{rule}' requires unknown tool '{tool}'")]
    UnknownTool { rule: String, tool: String },

    #[error("failed to parse rule table: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
