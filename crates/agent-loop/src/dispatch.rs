use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use agent_core::{AgentError, ToolCallRequest, ToolResultEntry};
use agent_tools::{ToolError, ToolRegistry};

/// Result of one call in a dispatched batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedCall {
    pub call: ToolCallRequest,
    pub result: Result<Value, ToolError>,
}

impl DispatchedCall {
    /// Whether the call got as far as its handler (success or a handler error).
    pub fn reached_handler(&self) -> bool {
        match &self.result {
            Ok(_) => true,
            Err(error) => error.reached_handler(),
        }
    }

    pub fn succeeded(&self) -> bool {
        match &self.result {
            Ok(value) => value.get("success").and_then(Value::as_bool).unwrap_or(true),
            Err(_) => false,
        }
    }

    pub fn payload(&self) -> Value {
        match &self.result {
            Ok(value) => value.clone(),
            Err(error) => error.to_payload(),
        }
    }

    pub fn to_entry(&self) -> ToolResultEntry {
        ToolResultEntry {
            tool_call_id: self.call.id.clone(),
            tool_name: self.call.name.clone(),
            result: self.payload(),
        }
    }
}

/// Runs every call of a batch on its own task and waits for all of them.
///
/// Results come back in request order. A failing or panicking call becomes
/// an error result; the other calls are unaffected. On cancellation the
/// spawned tasks are detached and their results dropped.
pub async fn dispatch_tool_calls(
    registry: &Arc<ToolRegistry>,
    calls: &[ToolCallRequest],
    cancel_token: &CancellationToken,
    session_id: &str,
) -> Result<Vec<DispatchedCall>, AgentError> {
    log::debug!(
        "[{}] Dispatching {} tool call(s): {}",
        session_id,
        calls.len(),
        calls
            .iter()
            .map(|call| call.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let handles: Vec<_> = calls
        .iter()
        .map(|call| {
            let registry = Arc::clone(registry);
            let name = call.name.clone();
            let arguments = call.arguments.clone();
            let argument_error = call.argument_error.clone();
            tokio::spawn(async move {
                if let Some(reason) = argument_error {
                    return Err(ToolError::InvalidArguments(format!(
                        "arguments for '{}' are not a valid JSON object: {}",
                        name, reason
                    )));
                }
                registry.invoke(&name, &arguments).await
            })
        })
        .collect();

    let joined = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => {
            log::debug!("[{}] Tool dispatch cancelled", session_id);
            return Err(AgentError::Cancelled);
        }
        joined = join_all(handles) => joined,
    };

    Ok(calls
        .iter()
        .zip(joined)
        .map(|(call, joined)| {
            let result = joined.unwrap_or_else(|join_error| {
                log::error!(
                    "[{}] Tool '{}' ({}) aborted: {}",
                    session_id,
                    call.name,
                    call.id,
                    join_error
                );
                Err(ToolError::Execution(format!(
                    "tool '{}' aborted: {}",
                    call.name, join_error
                )))
            });
            DispatchedCall {
                call: call.clone(),
                result,
            }
        })
        .collect())
}
