//! Append-only conversation transcript.
//!
//! The transcript is owned by exactly one orchestration loop. Tool-call rounds
//! are committed in one step (assistant turn plus every result), so readers
//! never observe a half-finished round. Every mutation publishes an immutable
//! [`TranscriptSnapshot`] on a watch channel for observers.

mod turn;
mod view;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tokio::sync::watch;

use crate::tools::ToolCallRequest;

pub use turn::{ToolResultEntry, Turn};
pub use view::TranscriptView;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("tool-call round has no calls")]
    EmptyRound,

    #[error("round has {calls} tool calls but {results} results")]
    ResultCountMismatch { calls: usize, results: usize },

    #[error("tool result '{found}' recorded where '{expected}' was expected")]
    ResultOrderMismatch { expected: String, found: String },

    #[error("duplicate tool call id '{0}' in one round")]
    DuplicateToolCallId(String),
}

/// Immutable, cheaply cloneable view of the transcript at one point in time.
#[derive(Debug, Clone, Default)]
pub struct TranscriptSnapshot {
    turns: Arc<Vec<Turn>>,
}

impl TranscriptSnapshot {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Serialize for TranscriptSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.turns.iter())
    }
}

#[derive(Debug)]
pub struct Transcript {
    turns: Vec<Turn>,
    publisher: watch::Sender<TranscriptSnapshot>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        let (publisher, _) = watch::channel(TranscriptSnapshot::default());
        Self {
            turns: Vec::new(),
            publisher,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::user(text));
        self.publish();
    }

    /// Appends a final assistant answer (no tool calls).
    pub fn append_final(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::assistant_text(text));
        self.publish();
    }

    /// Appends an assistant tool-call batch together with its results.
    ///
    /// Results must match the calls one to one, in request order. Nothing is
    /// appended when validation fails.
    pub fn commit_round(
        &mut self,
        tool_calls: Vec<ToolCallRequest>,
        results: Vec<ToolResultEntry>,
    ) -> Result<(), TranscriptError> {
        validate_round(&tool_calls, &results)?;

        self.turns.reserve(results.len() + 1);
        self.turns.push(Turn::Assistant {
            text: None,
            tool_calls,
        });
        self.turns.extend(results.into_iter().map(Turn::from));
        self.publish();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.publish();
    }

    pub fn view<'a>(&'a self, system_prompt: Option<&'a str>, notes: &'a [String]) -> TranscriptView<'a> {
        TranscriptView::new(system_prompt, &self.turns, notes)
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        self.publisher.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TranscriptSnapshot> {
        self.publisher.subscribe()
    }

    fn publish(&self) {
        self.publisher.send_replace(TranscriptSnapshot {
            turns: Arc::new(self.turns.clone()),
        });
    }
}

fn validate_round(
    tool_calls: &[ToolCallRequest],
    results: &[ToolResultEntry],
) -> Result<(), TranscriptError> {
    if tool_calls.is_empty() {
        return Err(TranscriptError::EmptyRound);
    }

    if tool_calls.len() != results.len() {
        return Err(TranscriptError::ResultCountMismatch {
            calls: tool_calls.len(),
            results: results.len(),
        });
    }

    let mut seen = HashSet::with_capacity(tool_calls.len());
    for (call, result) in tool_calls.iter().zip(results) {
        if !seen.insert(call.id.as_str()) {
            return Err(TranscriptError::DuplicateToolCallId(call.id.clone()));
        }
        if call.id != result.tool_call_id {
            return Err(TranscriptError::ResultOrderMismatch {
                expected: call.id.clone(),
                found: result.tool_call_id.clone(),
            });
        }
    }

    Ok(())
}
