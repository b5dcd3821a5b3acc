//! A single conversation driven by the orchestration loop.
//!
//! One user message runs up to `max_rounds` model invocations. Each round
//! either ends the turn with an answer the safety policy allows, or commits a
//! batch of tool calls together with their results and goes around again.
//! Batch and streaming delivery share the same loop; streaming only adds
//! events on the way.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use agent_core::{
    AgentError, AgentEvent, ToolActivity, ToolCallRequest, ToolSchema, Transcript,
    TranscriptSnapshot, TurnOutcome, TurnStatus,
};
use agent_llm::{Decision, ModelClient};
use agent_policy::{PolicyEnforcer, Verdict};
use agent_tools::ToolRegistry;

use crate::config::AgentLoopConfig;
use crate::dispatch::dispatch_tool_calls;
use crate::state::LoopState;
use crate::stream::handler::consume_model_stream;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Default)]
struct ControlFlags {
    reset_requested: AtomicBool,
    busy: AtomicBool,
}

/// Cloneable handle for observing and steering a conversation from outside
/// the task that owns it.
#[derive(Debug, Clone)]
pub struct ConversationControl {
    flags: Arc<ControlFlags>,
    snapshots: watch::Receiver<TranscriptSnapshot>,
}

impl ConversationControl {
    /// Queues a reset. It is applied when the running turn ends, or before the
    /// next turn starts if the conversation is idle. Returns `true` when a
    /// turn was in flight.
    pub fn request_reset(&self) -> bool {
        self.flags.reset_requested.store(true, Ordering::SeqCst);
        self.is_busy()
    }

    pub fn reset_pending(&self) -> bool {
        self.flags.reset_requested.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.flags.busy.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        self.snapshots.borrow().clone()
    }
}

struct BusyGuard(Arc<ControlFlags>);

impl BusyGuard {
    fn acquire(flags: &Arc<ControlFlags>) -> Self {
        flags.busy.store(true, Ordering::SeqCst);
        Self(Arc::clone(flags))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::SeqCst);
    }
}

pub struct Conversation {
    id: String,
    transcript: Transcript,
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    tool_schemas: Vec<ToolSchema>,
    policy: Arc<PolicyEnforcer>,
    config: AgentLoopConfig,
    state: LoopState,
    round_counter: usize,
    notes: Vec<String>,
    control: ConversationControl,
}

impl Conversation {
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        policy: Arc<PolicyEnforcer>,
        mut config: AgentLoopConfig,
    ) -> Self {
        if config.max_rounds == 0 {
            log::warn!("max_rounds must be at least 1, using 1");
            config.max_rounds = 1;
        }

        let transcript = Transcript::new();
        let control = ConversationControl {
            flags: Arc::new(ControlFlags::default()),
            snapshots: transcript.subscribe(),
        };
        let tool_schemas = tools.list_tools();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transcript,
            model,
            tools,
            tool_schemas,
            policy,
            config,
            state: LoopState::default(),
            round_counter: 0,
            notes: Vec::new(),
            control,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &AgentLoopConfig {
        &self.config
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn round_counter(&self) -> usize {
        self.round_counter
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        self.transcript.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<TranscriptSnapshot> {
        self.transcript.subscribe()
    }

    pub fn control(&self) -> ConversationControl {
        self.control.clone()
    }

    /// Runs one user turn and returns the final answer.
    pub async fn send(&mut self, text: impl Into<String>) -> Result<TurnOutcome> {
        self.send_cancellable(text, &CancellationToken::new()).await
    }

    pub async fn send_cancellable(
        &mut self,
        text: impl Into<String>,
        cancel_token: &CancellationToken,
    ) -> Result<TurnOutcome> {
        self.run_turn(text.into(), None, cancel_token).await
    }

    /// Runs one user turn, reporting progress on `event_tx`.
    ///
    /// Every turn ends with exactly one terminal event: `done` on success,
    /// `error` otherwise (cancellation included).
    pub async fn send_streaming(
        &mut self,
        text: impl Into<String>,
        event_tx: mpsc::Sender<AgentEvent>,
        cancel_token: CancellationToken,
    ) -> Result<TurnOutcome> {
        self.run_turn(text.into(), Some(&event_tx), &cancel_token)
            .await
    }

    /// Clears the transcript, round counter and pending notes.
    pub fn reset(&mut self) {
        log::info!("[{}] Conversation reset", self.id);
        self.control
            .flags
            .reset_requested
            .store(false, Ordering::SeqCst);
        self.transcript.clear();
        self.round_counter = 0;
        self.notes.clear();
        self.state = LoopState::AwaitingUserInput;
    }

    /// Applies a reset queued through [`ConversationControl::request_reset`].
    pub fn apply_pending_reset(&mut self) -> bool {
        if !self.control.reset_pending() {
            return false;
        }
        log::debug!("[{}] Applying queued reset", self.id);
        self.reset();
        true
    }

    async fn run_turn(
        &mut self,
        text: String,
        event_tx: Option<&mpsc::Sender<AgentEvent>>,
        cancel_token: &CancellationToken,
    ) -> Result<TurnOutcome> {
        self.apply_pending_reset();

        let busy = BusyGuard::acquire(&self.control.flags);
        log::debug!("[{}] User turn: {}", self.id, text);

        self.transcript.append_user(text.clone());
        self.round_counter = 0;
        self.notes.clear();

        let result = self.run_rounds(&text, event_tx, cancel_token).await;

        self.state = LoopState::AwaitingUserInput;
        self.notes.clear();
        drop(busy);

        match &result {
            Ok(outcome) => log::info!(
                "[{}] Turn finished ({:?}) after {} round(s), {} tool call(s)",
                self.id,
                outcome.status,
                outcome.rounds,
                outcome.tool_calls_observed.len()
            ),
            Err(AgentError::Cancelled) => log::info!("[{}] Turn cancelled", self.id),
            Err(error) => log::error!("[{}] Turn failed: {}", self.id, error),
        }

        if let (Err(error), Some(event_tx)) = (&result, event_tx) {
            let _ = event_tx.send(AgentEvent::error(error.to_string())).await;
        }

        self.apply_pending_reset();
        result
    }

    async fn run_rounds(
        &mut self,
        user_text: &str,
        event_tx: Option<&mpsc::Sender<AgentEvent>>,
        cancel_token: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let mut invoked: Vec<String> = Vec::new();
        let mut observed: Vec<ToolCallRequest> = Vec::new();

        loop {
            let verdict = self
                .policy
                .evaluate(user_text, invoked.iter().map(String::as_str));

            if self.round_counter >= self.config.max_rounds {
                return Ok(self
                    .finish_over_limit(&verdict, observed, event_tx)
                    .await);
            }

            if cancel_token.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            self.round_counter += 1;
            self.state = LoopState::ModelInvocation;
            log::debug!(
                "[{}] Round {}/{}",
                self.id,
                self.round_counter,
                self.config.max_rounds
            );

            let decision = self
                .invoke_model(event_tx, cancel_token, verdict.is_allowed())
                .await?;

            match decision {
                Decision::Final { text } => {
                    if let Some(note) = verdict.corrective_note() {
                        log::info!(
                            "[{}] Answer held back, missing checks: {}",
                            self.id,
                            verdict.missing_tools().join(", ")
                        );
                        if !self.notes.contains(&note) {
                            self.notes.push(note);
                        }
                        continue;
                    }

                    self.state = LoopState::Finalizing;
                    self.transcript.append_final(text.clone());
                    if let Some(event_tx) = event_tx {
                        let _ = event_tx
                            .send(AgentEvent::Done {
                                final_text: text.clone(),
                                status: TurnStatus::Completed,
                                tool_calls_observed: observed.clone(),
                            })
                            .await;
                    }

                    return Ok(TurnOutcome {
                        final_text: text,
                        status: TurnStatus::Completed,
                        tool_calls_observed: observed,
                        rounds: self.round_counter,
                    });
                }
                Decision::ToolCallsRequested {
                    tool_calls,
                    assistant_text,
                } => {
                    if let Some(text) = assistant_text {
                        log::debug!(
                            "[{}] Dropping text sent alongside tool calls: {}",
                            self.id,
                            text
                        );
                    }
                    ensure_unique_call_ids(&tool_calls)?;

                    let reached = self
                        .run_tool_round(tool_calls.clone(), event_tx, cancel_token)
                        .await?;
                    invoked.extend(reached);
                    observed.extend(tool_calls);
                }
            }
        }
    }

    async fn invoke_model(
        &self,
        event_tx: Option<&mpsc::Sender<AgentEvent>>,
        cancel_token: &CancellationToken,
        forward_text: bool,
    ) -> Result<Decision> {
        let view = self
            .transcript
            .view(self.config.system_prompt.as_deref(), &self.notes);

        let Some(event_tx) = event_tx else {
            return tokio::select! {
                biased;
                _ = cancel_token.cancelled() => Err(AgentError::Cancelled),
                decision = self.model.complete(&view, &self.tool_schemas) => Ok(decision?),
            };
        };

        let stream = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Err(AgentError::Cancelled),
            stream = self.model.complete_streaming(&view, &self.tool_schemas) => stream?,
        };

        if !forward_text {
            log::debug!("[{}] Holding back streamed text while checks are pending", self.id);
        }

        consume_model_stream(stream, Some(event_tx), cancel_token, forward_text, &self.id).await
    }

    /// Dispatches one batch and commits it. Returns the names of the calls
    /// that reached their handler.
    async fn run_tool_round(
        &mut self,
        tool_calls: Vec<ToolCallRequest>,
        event_tx: Option<&mpsc::Sender<AgentEvent>>,
        cancel_token: &CancellationToken,
    ) -> Result<Vec<String>> {
        if let Some(event_tx) = event_tx {
            let _ = event_tx
                .send(AgentEvent::tools_requested(tool_calls.clone()))
                .await;
        }

        self.state = LoopState::ToolDispatch;
        let dispatched =
            dispatch_tool_calls(&self.tools, &tool_calls, cancel_token, &self.id).await?;

        let mut reached = Vec::new();
        let mut entries = Vec::with_capacity(dispatched.len());
        for call in &dispatched {
            if call.reached_handler() {
                reached.push(call.call.name.clone());
            }
            let entry = call.to_entry();
            if let Some(event_tx) = event_tx {
                let _ = event_tx
                    .send(AgentEvent::Tool {
                        activity: ToolActivity::Completed {
                            tool_call_id: entry.tool_call_id.clone(),
                            tool_name: entry.tool_name.clone(),
                            success: call.succeeded(),
                            result: entry.result.clone(),
                        },
                    })
                    .await;
            }
            entries.push(entry);
        }

        self.transcript.commit_round(tool_calls, entries)?;
        Ok(reached)
    }

    async fn finish_over_limit(
        &mut self,
        verdict: &Verdict,
        observed: Vec<ToolCallRequest>,
        event_tx: Option<&mpsc::Sender<AgentEvent>>,
    ) -> TurnOutcome {
        log::warn!(
            "[{}] Round limit of {} reached without an answer",
            self.id,
            self.config.max_rounds
        );

        let mut message = self.config.round_limit_message.clone();
        if !verdict.is_allowed() {
            message.push_str(&format!(
                " The following checks could not be completed: {}.",
                verdict.missing_tools().join(", ")
            ));
        }

        self.state = LoopState::Finalizing;
        self.transcript.append_final(message.clone());

        if let Some(event_tx) = event_tx {
            let _ = event_tx.send(AgentEvent::content(message.clone())).await;
            let _ = event_tx
                .send(AgentEvent::Done {
                    final_text: message.clone(),
                    status: TurnStatus::RoundLimitExceeded,
                    tool_calls_observed: observed.clone(),
                })
                .await;
        }

        TurnOutcome {
            final_text: message,
            status: TurnStatus::RoundLimitExceeded,
            tool_calls_observed: observed,
            rounds: self.round_counter,
        }
    }
}

fn ensure_unique_call_ids(tool_calls: &[ToolCallRequest]) -> Result<()> {
    if tool_calls.is_empty() {
        return Err(AgentError::BackendProtocol(
            "tool-call decision without calls".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for call in tool_calls {
        if call.id.trim().is_empty() {
            return Err(AgentError::BackendProtocol(format!(
                "tool call '{}' has no id",
                call.name
            )));
        }
        if !seen.insert(call.id.as_str()) {
            return Err(AgentError::BackendProtocol(format!(
                "duplicate tool call id '{}'",
                call.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
