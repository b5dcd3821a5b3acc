use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::TurnStatus;
use crate::tools::ToolCallRequest;

/// Events delivered to a streaming caller, tagged `content | tool | done | error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Content {
        data: String,
    },

    Tool {
        #[serde(flatten)]
        activity: ToolActivity,
    },

    Done {
        final_text: String,
        status: TurnStatus,
        tool_calls_observed: Vec<ToolCallRequest>,
    },

    Error {
        data: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ToolActivity {
    /// Start of a tool round. Content delivered earlier in the same round was
    /// provisional and is superseded.
    Requested { tool_calls: Vec<ToolCallRequest> },

    Completed {
        tool_call_id: String,
        tool_name: String,
        success: bool,
        result: Value,
    },
}

impl AgentEvent {
    pub fn content(data: impl Into<String>) -> Self {
        Self::Content { data: data.into() }
    }

    pub fn error(data: impl Into<String>) -> Self {
        Self::Error { data: data.into() }
    }

    pub fn tools_requested(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::Tool {
            activity: ToolActivity::Requested { tool_calls },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
