use serde::Serialize;

/// Where a conversation is within its current user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingUserInput,
    ModelInvocation,
    ToolDispatch,
    Finalizing,
}

impl LoopState {
    pub fn is_idle(self) -> bool {
        self == Self::AwaitingUserInput
    }
}

impl Default for LoopState {
    fn default() -> Self {
        Self::AwaitingUserInput
    }
}
