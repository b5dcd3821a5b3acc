use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::Execution(_) => "execution_failed",
        }
    }

    /// Whether the call got as far as the tool handler.
    pub fn reached_handler(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Structured payload recorded as the tool result for a failed call.
    pub fn to_payload(&self) -> Value {
        json!({
            "success": false,
            "error": self.to_string(),
            "error_kind": self.kind(),
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool with name '{0}' already registered")]
    DuplicateTool(String),

    #[error("invalid tool: {0}")]
    InvalidTool(String),
}
