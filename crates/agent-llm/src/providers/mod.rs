//! Model client implementations.

pub(crate) mod common;
pub mod openai;
pub mod scripted;

pub use openai::OpenAIProvider;
pub use scripted::{RecordedRequest, ScriptedModelClient, ScriptedReply, ScriptedToolCall};
