//! Orchestration loop for the pharmacy assistant.
//!
//! A [`Conversation`] owns its transcript and drives user turns through the
//! model, the tool registry and the safety policy.

pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod state;
pub mod stream;

pub use config::{AgentLoopConfig, DEFAULT_MAX_ROUNDS, DEFAULT_ROUND_LIMIT_MESSAGE};
pub use conversation::{Conversation, ConversationControl};
pub use dispatch::{dispatch_tool_calls, DispatchedCall};
pub use state::LoopState;
pub use stream::handler::consume_model_stream;
