use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolCallRequest;

/// One atomic transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    User {
        text: String,
    },

    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },

    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: Value,
    },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::Assistant {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    /// Text of a user turn or a final assistant answer.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::User { text } => Some(text),
            Self::Assistant { text, .. } => text.as_deref(),
            Self::ToolResult { .. } => None,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Outcome of one dispatched tool call, recorded as a `Turn::ToolResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResultEntry {
    pub tool_call_id: String,
    pub tool_name: String,
    pub result: Value,
}

impl From<ToolResultEntry> for Turn {
    fn from(entry: ToolResultEntry) -> Self {
        Turn::ToolResult {
            tool_call_id: entry.tool_call_id,
            tool_name: entry.tool_name,
            result: entry.result,
        }
    }
}
