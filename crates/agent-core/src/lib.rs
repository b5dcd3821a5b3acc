pub mod agent;
pub mod tools;
pub mod transcript;

pub use agent::{AgentError, AgentEvent, ToolActivity, TurnOutcome, TurnStatus};
pub use tools::{
    parse_tool_args, ToolCall, ToolCallAccumulator, ToolCallDelta, ToolCallParseError,
    ToolCallRequest, ToolSchema,
};
pub use transcript::{
    ToolResultEntry, Transcript, TranscriptError, TranscriptSnapshot, TranscriptView, Turn,
};
