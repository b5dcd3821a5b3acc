use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agent_core::{AgentError, TurnOutcome, TurnStatus};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// The trimmed message, or `None` when there is nothing to send.
    pub fn message(&self) -> Option<&str> {
        Some(self.message.trim()).filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCallSummary {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub status: TurnStatus,
    pub tool_calls: Vec<ToolCallSummary>,
    pub rounds: usize,
}

impl ChatResponse {
    fn new(session_id: String, outcome: TurnOutcome) -> Self {
        Self {
            session_id,
            response: outcome.final_text,
            status: outcome.status,
            tool_calls: outcome
                .tool_calls_observed
                .into_iter()
                .map(|call| ToolCallSummary {
                    name: call.name,
                    arguments: Value::Object(call.arguments),
                })
                .collect(),
            rounds: outcome.rounds,
        }
    }
}

pub fn no_message() -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": "No message provided" }))
}

pub async fn handler(state: web::Data<AppState>, req: web::Json<ChatRequest>) -> impl Responder {
    let Some(message) = req.message() else {
        return no_message();
    };

    let (session_id, session) = state.session(req.session_id.as_deref());
    log::info!("[{}] Chat request", session_id);

    let mut conversation = session.conversation.lock().await;
    match conversation.send(message).await {
        Ok(outcome) => HttpResponse::Ok().json(ChatResponse::new(session_id, outcome)),
        Err(error) => error_response(&session_id, error),
    }
}

fn error_response(session_id: &str, error: AgentError) -> HttpResponse {
    log::error!("[{}] Chat failed: {}", session_id, error);
    let body = serde_json::json!({
        "error": error.to_string(),
        "session_id": session_id,
    });

    if error.is_backend() {
        HttpResponse::BadGateway().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::ToolCallRequest;
    use serde_json::json;

    #[test]
    fn chat_request_without_session() {
        let request: ChatRequest = serde_json::from_str(r#"{"message": "  Hello "}"#).unwrap();
        assert_eq!(request.message(), Some("Hello"));
        assert_eq!(request.session_id, None);
    }

    #[test]
    fn blank_message_is_treated_as_missing() {
        let request: ChatRequest = serde_json::from_str(r#"{"message": "   "}"#).unwrap();
        assert_eq!(request.message(), None);

        let request: ChatRequest = serde_json::from_str(r#"{"session_id": "s1"}"#).unwrap();
        assert_eq!(request.message(), None);
    }

    #[test]
    fn response_lists_tool_calls_with_parsed_arguments() {
        let outcome = TurnOutcome {
            final_text: "Aspirin is in stock.".to_string(),
            status: TurnStatus::Completed,
            tool_calls_observed: vec![ToolCallRequest::with_json(
                "call_1",
                "check_inventory",
                json!({"medication_name": "Aspirin"}),
            )],
            rounds: 2,
        };

        let value = serde_json::to_value(ChatResponse::new("s1".to_string(), outcome)).unwrap();
        assert_eq!(
            value,
            json!({
                "session_id": "s1",
                "response": "Aspirin is in stock.",
                "status": "completed",
                "tool_calls": [{"name": "check_inventory", "arguments": {"medication_name": "Aspirin"}}],
                "rounds": 2,
            })
        );
    }
}
