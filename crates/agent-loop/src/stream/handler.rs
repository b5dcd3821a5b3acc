use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use agent_core::{AgentError, AgentEvent, ToolCallRequest};
use agent_llm::{Decision, ModelEvent, ModelEventStream};

/// Drains a model stream into a [`Decision`].
///
/// Text deltas are forwarded as `content` events only when `forward_text` is
/// set. The stream must end with `Done`; ending early is a protocol error.
pub async fn consume_model_stream(
    mut stream: ModelEventStream,
    event_tx: Option<&mpsc::Sender<AgentEvent>>,
    cancel_token: &CancellationToken,
    forward_text: bool,
    session_id: &str,
) -> Result<Decision, AgentError> {
    let mut content = String::new();
    let mut tool_calls: Vec<ToolCallRequest> = Vec::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Err(AgentError::Cancelled),
            next = stream.next() => next,
        };

        match next {
            Some(Ok(ModelEvent::TextDelta(text))) => {
                content.push_str(&text);
                if forward_text {
                    if let Some(event_tx) = event_tx {
                        let _ = event_tx.send(AgentEvent::content(text)).await;
                    }
                }
            }
            Some(Ok(ModelEvent::ToolCallsRequested(calls))) => {
                log::debug!("[{}] Received {} tool call(s)", session_id, calls.len());
                tool_calls.extend(calls);
            }
            Some(Ok(ModelEvent::Done)) => {
                log::debug!("[{}] Model stream completed", session_id);
                break;
            }
            Some(Err(error)) => return Err(error.into()),
            None => {
                return Err(AgentError::BackendProtocol(
                    "model stream ended without completing".to_string(),
                ))
            }
        }
    }

    if tool_calls.is_empty() {
        return Ok(Decision::Final { text: content });
    }

    Ok(Decision::ToolCallsRequested {
        tool_calls,
        assistant_text: (!content.trim().is_empty()).then_some(content),
    })
}
