//! OpenAI-compatible request serialization and response parsing.
//!
//! The transcript view is flattened into the chat-completions `messages`
//! array: system prompt first, then every committed turn, then pending
//! corrective notes as trailing system messages.

use agent_core::{ToolCallAccumulator, ToolCallDelta, ToolSchema, TranscriptView, Turn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ModelError;
use crate::provider::{Decision, Result};

pub fn view_to_openai_compat_messages(view: &TranscriptView<'_>) -> Vec<Value> {
    let mut messages = Vec::with_capacity(view.turns().len() + view.notes().len() + 1);

    if let Some(system_prompt) = view.system_prompt() {
        messages.push(json!({ "role": "system", "content": system_prompt }));
    }

    for turn in view.turns() {
        let message = match turn {
            Turn::User { text } => json!({ "role": "user", "content": text }),
            Turn::Assistant { text, tool_calls } => {
                let mut message = json!({ "role": "assistant", "content": text });
                if !tool_calls.is_empty() {
                    let wire: Vec<_> = tool_calls.iter().map(|call| call.to_wire()).collect();
                    message["tool_calls"] = json!(wire);
                }
                message
            }
            Turn::ToolResult {
                tool_call_id,
                tool_name,
                result,
            } => json!({
                "role": "tool",
                "tool_call_id": tool_call_id,
                "name": tool_name,
                "content": result.to_string(),
            }),
        };
        messages.push(message);
    }

    for note in view.notes() {
        messages.push(json!({ "role": "system", "content": note }));
    }

    messages
}

/// Convert [`ToolSchema`] values to the OpenAI `tools` array JSON.
pub fn tools_to_openai_compat_json(tools: &[ToolSchema]) -> Vec<Value> {
    tools.iter().map(|t| json!(t)).collect()
}

/// Build a chat-completions request body. `tools` and `tool_choice` are
/// omitted when no tools are offered.
pub fn build_openai_compat_body(
    model: &str,
    view: &TranscriptView<'_>,
    tools: &[ToolSchema],
    stream: bool,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": view_to_openai_compat_messages(view),
        "stream": stream,
    });

    if !tools.is_empty() {
        body["tools"] = json!(tools_to_openai_compat_json(tools));
        body["tool_choice"] = json!("auto");
    }

    body
}

// --- Non-streaming response ---

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<CompatToolCall>>,
}

#[derive(Debug, Deserialize)]
struct CompatToolCall {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<CompatFunction>,
}

#[derive(Debug, Deserialize)]
struct CompatFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

impl CompatToolCall {
    fn into_delta(self, position: usize) -> ToolCallDelta {
        let (name, arguments) = match self.function {
            Some(function) => (function.name, function.arguments),
            None => (None, None),
        };
        ToolCallDelta {
            index: self.index.unwrap_or(position),
            id: self.id,
            name,
            arguments,
        }
    }
}

/// Parse a complete chat-completions response body into a [`Decision`].
pub fn parse_openai_compat_completion(body: &str) -> Result<Decision> {
    let response: CompletionResponse = serde_json::from_str(body)?;
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(ModelError::BackendProtocol(
            "response contained no choices".to_string(),
        ));
    };

    let CompletionMessage {
        content,
        tool_calls,
    } = choice.message;

    let tool_calls = tool_calls.unwrap_or_default();
    if tool_calls.is_empty() {
        return Ok(Decision::Final {
            text: content.unwrap_or_default(),
        });
    }

    if let Some(position) = tool_calls.iter().position(|call| {
        call.function
            .as_ref()
            .and_then(|function| function.name.as_deref())
            .map_or(true, |name| name.trim().is_empty())
    }) {
        return Err(ModelError::BackendProtocol(format!(
            "tool call #{} has no function name",
            position
        )));
    }

    // Batch responses carry whole calls; positions stand in for stream indices.
    let mut accumulator = ToolCallAccumulator::new();
    accumulator.extend(
        tool_calls
            .into_iter()
            .enumerate()
            .map(|(position, call)| call.into_delta(position)),
    );
    let tool_calls = accumulator.finish();

    Ok(Decision::ToolCallsRequested {
        tool_calls,
        assistant_text: content.filter(|text| !text.trim().is_empty()),
    })
}

// --- Streaming chunks ---

#[derive(Debug, Deserialize)]
struct CompatStreamChunk {
    #[serde(default)]
    choices: Vec<CompatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct CompatStreamChoice {
    #[serde(default)]
    delta: CompatDelta,
}

#[derive(Debug, Deserialize, Default)]
struct CompatDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<CompatToolCall>>,
}

/// Parsed SSE `data:` payload of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum CompatChunk {
    Delta {
        content: Option<String>,
        tool_calls: Vec<ToolCallDelta>,
    },
    Done,
}

/// Parse an SSE `data:` payload in strict mode.
///
/// - `"[DONE]"` -> `CompatChunk::Done`
/// - Invalid JSON -> error
pub fn parse_openai_compat_sse_data_strict(data: &str) -> Result<CompatChunk> {
    if data.trim() == "[DONE]" {
        return Ok(CompatChunk::Done);
    }

    let chunk: CompatStreamChunk = serde_json::from_str(data)?;
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(CompatChunk::Delta {
            content: None,
            tool_calls: Vec::new(),
        });
    };

    let tool_calls = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(position, call)| call.into_delta(position))
        .collect();

    Ok(CompatChunk::Delta {
        content: choice.delta.content.filter(|text| !text.is_empty()),
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tools::FunctionSchema;
    use agent_core::ToolCallRequest;

    fn inventory_tool() -> ToolSchema {
        ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: "check_inventory".to_string(),
                description: "Check stock".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
        }
    }

    #[test]
    fn view_flattens_turns_and_notes() {
        let call = ToolCallRequest::with_json(
            "call_1",
            "check_inventory",
            json!({"medication_name": "Aspirin"}),
        );
        let turns = vec![
            Turn::user("Do you have Aspirin?"),
            Turn::Assistant {
                text: None,
                tool_calls: vec![call],
            },
            Turn::ToolResult {
                tool_call_id: "call_1".to_string(),
                tool_name: "check_inventory".to_string(),
                result: json!({"success": true, "in_stock": true}),
            },
        ];
        let notes = vec!["call get_user_allergies first".to_string()];
        let view = TranscriptView::new(Some("You are a pharmacy assistant."), &turns, &notes);

        let out = view_to_openai_compat_messages(&view);

        assert_eq!(out.len(), 5);
        assert_eq!(out[0]["role"], "system");
        assert_eq!(out[1]["content"], "Do you have Aspirin?");
        assert_eq!(out[2]["role"], "assistant");
        assert!(out[2]["content"].is_null());
        assert_eq!(out[2]["tool_calls"][0]["function"]["name"], "check_inventory");
        assert_eq!(
            out[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"medication_name":"Aspirin"}"#
        );
        assert_eq!(out[3]["role"], "tool");
        assert_eq!(out[3]["tool_call_id"], "call_1");
        let content: Value = serde_json::from_str(out[3]["content"].as_str().unwrap()).unwrap();
        assert_eq!(content["in_stock"], true);
        assert_eq!(out[4]["role"], "system");
        assert_eq!(out[4]["content"], "call get_user_allergies first");
    }

    #[test]
    fn body_omits_tools_when_none_offered() {
        let turns = vec![Turn::user("hi")];
        let view = TranscriptView::new(None, &turns, &[]);

        let body = build_openai_compat_body("gpt-4o", &view, &[], false);
        assert_eq!(body["stream"], false);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());

        let body = build_openai_compat_body("gpt-4o", &view, &[inventory_tool()], true);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn completion_with_text_is_final() {
        let decision = parse_openai_compat_completion(
            r#"{"choices":[{"message":{"role":"assistant","content":"We open at 9."}}]}"#,
        )
        .unwrap();
        assert_eq!(
            decision,
            Decision::Final {
                text: "We open at 9.".to_string()
            }
        );
    }

    #[test]
    fn completion_with_tool_calls() {
        let decision = parse_openai_compat_completion(
            r#"{"choices":[{"message":{"content":"Let me check.","tool_calls":[
                {"id":"call_a","type":"function","function":{"name":"get_medication_info","arguments":"{\"medication_name\":\"Aspirin\"}"}},
                {"id":"call_b","type":"function","function":{"name":"check_inventory","arguments":""}}
            ]}}]}"#,
        )
        .unwrap();

        let Decision::ToolCallsRequested {
            tool_calls,
            assistant_text,
        } = decision
        else {
            panic!("expected tool calls");
        };
        assert_eq!(tool_calls.len(), 2);
        assert_eq!(tool_calls[0].id, "call_a");
        assert_eq!(tool_calls[0].arguments["medication_name"], "Aspirin");
        assert!(tool_calls[1].arguments.is_empty());
        assert_eq!(assistant_text.as_deref(), Some("Let me check."));
    }

    #[test]
    fn unparseable_arguments_stay_with_their_call() {
        let decision = parse_openai_compat_completion(
            r#"{"choices":[{"message":{"tool_calls":[
                {"id":"call_1","type":"function","function":{"name":"get_medication_info","arguments":"{\"medication_name\": \"Amox"}},
                {"id":"call_2","type":"function","function":{"name":"get_user_allergies","arguments":"{\"user_name\":\"Jalen Brunson\"}"}}
            ]}}]}"#,
        )
        .unwrap();

        let Decision::ToolCallsRequested { tool_calls, .. } = decision else {
            panic!("expected tool calls");
        };
        assert_eq!(tool_calls.len(), 2);
        assert_eq!(tool_calls[0].id, "call_1");
        assert!(tool_calls[0].argument_error.is_some());
        assert_eq!(tool_calls[1].arguments["user_name"], "Jalen Brunson");
        assert!(tool_calls[1].argument_error.is_none());
    }

    #[test]
    fn completion_errors_are_protocol_errors() {
        for body in [
            "not json",
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"tool_calls":[{"id":"x","function":{"arguments":"{}"}}]}}]}"#,
        ] {
            assert!(
                matches!(
                    parse_openai_compat_completion(body),
                    Err(ModelError::BackendProtocol(_))
                ),
                "{body}"
            );
        }
    }

    #[test]
    fn stream_chunk_parsing() {
        assert_eq!(
            parse_openai_compat_sse_data_strict("[DONE]").unwrap(),
            CompatChunk::Done
        );

        let chunk = parse_openai_compat_sse_data_strict(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_z","function":{"name":"check_inventory","arguments":"{\"med"}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            chunk,
            CompatChunk::Delta {
                content: None,
                tool_calls: vec![ToolCallDelta {
                    index: 1,
                    id: Some("call_z".to_string()),
                    name: Some("check_inventory".to_string()),
                    arguments: Some("{\"med".to_string()),
                }],
            }
        );

        assert!(parse_openai_compat_sse_data_strict("{oops").is_err());
    }
}
