pub mod accumulator;
pub mod types;

pub use accumulator::{PartialToolCall, ToolCallAccumulator, ToolCallDelta};
pub use types::{
    parse_tool_args, FunctionCall, FunctionSchema, ToolCall, ToolCallParseError, ToolCallRequest,
    ToolSchema,
};
