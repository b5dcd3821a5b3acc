use std::pin::Pin;

use agent_core::{ToolCallRequest, ToolSchema, TranscriptView};
use async_trait::async_trait;
use futures::Stream;

use crate::error::ModelError;

pub type Result<T> = std::result::Result<T, ModelError>;

/// What the model decided to do with a non-streaming request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Final {
        text: String,
    },
    ToolCallsRequested {
        tool_calls: Vec<ToolCallRequest>,
        /// Text the backend sent next to the calls, if any.
        assistant_text: Option<String>,
    },
}

/// One step of a streamed model response.
///
/// A well-formed stream is any number of `TextDelta`s, at most one
/// `ToolCallsRequested`, then `Done`.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    TextDelta(String),
    ToolCallsRequested(Vec<ToolCallRequest>),
    Done,
}

pub type ModelEventStream = Pin<Box<dyn Stream<Item = Result<ModelEvent>> + Send>>;

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Requests one complete decision for the given view.
    async fn complete(&self, view: &TranscriptView<'_>, tools: &[ToolSchema]) -> Result<Decision>;

    /// Requests a decision delivered incrementally.
    async fn complete_streaming(
        &self,
        view: &TranscriptView<'_>,
        tools: &[ToolSchema],
    ) -> Result<ModelEventStream>;

    fn model_name(&self) -> &str;
}
