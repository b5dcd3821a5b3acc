use serde::{Deserialize, Serialize};

use crate::tools::ToolCallRequest;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Completed,
    /// The round budget was spent without an allowed answer; `final_text`
    /// explains that the request could not be completed.
    RoundLimitExceeded,
}

/// Result of one user turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnOutcome {
    pub final_text: String,
    pub status: TurnStatus,
    pub tool_calls_observed: Vec<ToolCallRequest>,
    pub rounds: usize,
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == TurnStatus::Completed
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls_observed
            .iter()
            .map(|call| call.name.as_str())
            .collect()
    }
}
