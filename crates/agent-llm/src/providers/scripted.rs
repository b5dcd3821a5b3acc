//! A model client that replays a fixed script.
//!
//! Each request consumes the next [`ScriptedReply`]. Every request is recorded
//! so callers can inspect exactly what the model was shown.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use agent_core::{ToolCallRequest, ToolSchema, TranscriptView, Turn};
use async_trait::async_trait;
use futures::stream;
use futures_util::StreamExt;
use serde_json::Value;

use crate::error::ModelError;
use crate::provider::{Decision, ModelClient, ModelEvent, ModelEventStream, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedToolCall {
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    /// A final answer, streamed chunk by chunk.
    Text(Vec<String>),
    ToolCalls(Vec<ScriptedToolCall>),
    /// The request fails before anything is produced.
    Fail(ModelError),
    /// Streams the chunks, then fails.
    FailAfter(Vec<String>, ModelError),
    /// Streams the chunks, then never finishes.
    Stall(Vec<String>),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(vec![text.into()])
    }

    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Text(chunks.into_iter().map(Into::into).collect())
    }

    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        Self::tool_calls([(name, arguments)])
    }

    pub fn tool_calls<I, N>(calls: I) -> Self
    where
        I: IntoIterator<Item = (N, Value)>,
        N: Into<String>,
    {
        Self::ToolCalls(
            calls
                .into_iter()
                .map(|(name, arguments)| ScriptedToolCall {
                    id: None,
                    name: name.into(),
                    arguments,
                })
                .collect(),
        )
    }

    pub fn stall<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stall(chunks.into_iter().map(Into::into).collect())
    }
}

/// What the client was asked, captured per request.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub system_prompt: Option<String>,
    pub turns: Vec<Turn>,
    pub notes: Vec<String>,
    pub tools: Vec<String>,
    pub streaming: bool,
}

pub struct ScriptedModelClient {
    model: String,
    script: Mutex<VecDeque<ScriptedReply>>,
    last: Mutex<Option<ScriptedReply>>,
    repeat_last: bool,
    requests: Mutex<Vec<RecordedRequest>>,
    next_call_id: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedModelClient {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = ScriptedReply>,
    {
        Self {
            model: "scripted".to_string(),
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            repeat_last: false,
            requests: Mutex::new(Vec::new()),
            next_call_id: AtomicUsize::new(0),
        }
    }

    /// Keeps serving the final reply once the script runs out.
    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.script).push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }

    fn record(&self, view: &TranscriptView<'_>, tools: &[ToolSchema], streaming: bool) {
        lock(&self.requests).push(RecordedRequest {
            system_prompt: view.system_prompt().map(str::to_string),
            turns: view.turns().to_vec(),
            notes: view.notes().to_vec(),
            tools: tools.iter().map(|tool| tool.function.name.clone()).collect(),
            streaming,
        });
    }

    fn next_reply(&self) -> Result<ScriptedReply> {
        let next = lock(&self.script).pop_front();
        match next {
            Some(reply) => {
                if self.repeat_last {
                    *lock(&self.last) = Some(reply.clone());
                }
                Ok(reply)
            }
            None => lock(&self.last).clone().ok_or_else(|| {
                ModelError::BackendProtocol("scripted model has no replies left".to_string())
            }),
        }
    }

    /// Object arguments are used as is; a string stands for the raw argument
    /// text a backend would send, so it may be malformed.
    fn materialize(&self, calls: Vec<ScriptedToolCall>) -> Vec<ToolCallRequest> {
        calls
            .into_iter()
            .map(|call| {
                let id = call.id.unwrap_or_else(|| {
                    format!("call_{}", self.next_call_id.fetch_add(1, Ordering::SeqCst) + 1)
                });
                match call.arguments {
                    Value::Object(arguments) => ToolCallRequest::new(id, call.name, arguments),
                    Value::String(raw) => ToolCallRequest::from_raw_arguments(id, call.name, &raw),
                    other => ToolCallRequest::from_raw_arguments(id, call.name, &other.to_string()),
                }
            })
            .collect()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn complete(&self, view: &TranscriptView<'_>, tools: &[ToolSchema]) -> Result<Decision> {
        self.record(view, tools, false);

        match self.next_reply()? {
            ScriptedReply::Text(chunks) => Ok(Decision::Final {
                text: chunks.concat(),
            }),
            ScriptedReply::ToolCalls(calls) => Ok(Decision::ToolCallsRequested {
                tool_calls: self.materialize(calls),
                assistant_text: None,
            }),
            ScriptedReply::Fail(error) | ScriptedReply::FailAfter(_, error) => Err(error),
            ScriptedReply::Stall(_) => std::future::pending().await,
        }
    }

    async fn complete_streaming(
        &self,
        view: &TranscriptView<'_>,
        tools: &[ToolSchema],
    ) -> Result<ModelEventStream> {
        self.record(view, tools, true);

        let text = |chunks: Vec<String>| -> Vec<Result<ModelEvent>> {
            chunks
                .into_iter()
                .map(|chunk| Ok(ModelEvent::TextDelta(chunk)))
                .collect()
        };

        let stream: ModelEventStream = match self.next_reply()? {
            ScriptedReply::Text(chunks) => {
                let mut events = text(chunks);
                events.push(Ok(ModelEvent::Done));
                Box::pin(stream::iter(events))
            }
            ScriptedReply::ToolCalls(calls) => {
                let calls = self.materialize(calls);
                Box::pin(stream::iter(vec![
                    Ok(ModelEvent::ToolCallsRequested(calls)),
                    Ok(ModelEvent::Done),
                ]))
            }
            ScriptedReply::Fail(error) => return Err(error),
            ScriptedReply::FailAfter(chunks, error) => {
                let mut events = text(chunks);
                events.push(Err(error));
                Box::pin(stream::iter(events))
            }
            ScriptedReply::Stall(chunks) => {
                Box::pin(stream::iter(text(chunks)).chain(stream::pending()))
            }
        };

        Ok(stream)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
