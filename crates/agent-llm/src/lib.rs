//! Model client adapter.
//!
//! [`ModelClient`] hides the model backend behind two call modes: a single
//! [`Decision`] or a stream of [`ModelEvent`]s. Backend failures are reported
//! as [`ModelError`] and never partially applied.

pub mod error;
pub mod provider;
pub mod providers;

pub use error::ModelError;
pub use provider::{Decision, ModelClient, ModelEvent, ModelEventStream, Result};
pub use providers::{
    OpenAIProvider, RecordedRequest, ScriptedModelClient, ScriptedReply, ScriptedToolCall,
};
