use std::time::Duration;

use agent_core::{ToolCallAccumulator, ToolSchema, TranscriptView};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;

use crate::error::ModelError;
use crate::provider::{Decision, ModelClient, ModelEvent, ModelEventStream, Result};

use super::common::openai_compat::{
    build_openai_compat_body, parse_openai_compat_completion, CompatChunk,
};
use super::common::sse::completion_chunks;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for any OpenAI chat-completions compatible backend.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn post(
        &self,
        view: &TranscriptView<'_>,
        tools: &[ToolSchema],
        stream: bool,
    ) -> Result<reqwest::Response> {
        let body = build_openai_compat_body(&self.model, view, tools, stream);

        log::debug!(
            "POST {}/chat/completions model={} turns={} notes={} stream={}",
            self.base_url,
            self.model,
            view.turns().len(),
            view.notes().len(),
            stream
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            log::warn!("Model backend returned {}", status);
            return Err(ModelError::from_status(status, &text));
        }

        Ok(response)
    }
}

#[async_trait]
impl ModelClient for OpenAIProvider {
    async fn complete(&self, view: &TranscriptView<'_>, tools: &[ToolSchema]) -> Result<Decision> {
        let response = self.post(view, tools, false).await?;
        let body = response.text().await?;
        parse_openai_compat_completion(&body)
    }

    async fn complete_streaming(
        &self,
        view: &TranscriptView<'_>,
        tools: &[ToolSchema],
    ) -> Result<ModelEventStream> {
        let response = self.post(view, tools, true).await?;

        let mut chunks = completion_chunks(response);

        let stream = async_stream::stream! {
            let mut accumulator = ToolCallAccumulator::new();
            let mut finished = false;

            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(CompatChunk::Done) => {
                        finished = true;
                        break;
                    }
                    Ok(CompatChunk::Delta { content, tool_calls }) => {
                        if let Some(text) = content {
                            yield Ok(ModelEvent::TextDelta(text));
                        }
                        accumulator.extend(tool_calls);
                    }
                    Err(error) => {
                        yield Err(error);
                        return;
                    }
                }
            }

            if !finished {
                yield Err(ModelError::BackendProtocol(
                    "stream ended before the [DONE] marker".to_string(),
                ));
                return;
            }

            let tool_calls = accumulator.finish();
            if !tool_calls.is_empty() {
                yield Ok(ModelEvent::ToolCallsRequested(tool_calls));
            }

            yield Ok(ModelEvent::Done);
        };

        Ok(Box::pin(stream))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tools::FunctionSchema;
    use agent_core::Turn;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tools() -> Vec<ToolSchema> {
        vec![ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: "get_medication_info".to_string(),
                description: "Look up a medication".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
        }]
    }

    async fn collect(stream: ModelEventStream) -> Vec<Result<ModelEvent>> {
        stream.collect().await
    }

    async fn mount_sse(server: &MockServer, body: String) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(server)
            .await;
    }

    fn provider(server: &MockServer) -> OpenAIProvider {
        OpenAIProvider::new("sk-test").with_base_url(server.uri())
    }

    #[test]
    fn builder_defaults() {
        let provider = OpenAIProvider::new("k");
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
        assert_eq!(provider.model_name(), "gpt-4o");

        let provider = provider
            .with_base_url("http://localhost:8080/v1/")
            .with_model("gpt-4o-mini");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn complete_sends_tools_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "stream": false,
                "tool_choice": "auto",
                "messages": [{"role": "user", "content": "What is Aspirin?"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "A pain reliever."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let turns = vec![Turn::user("What is Aspirin?")];
        let view = TranscriptView::new(None, &turns, &[]);

        let decision = provider(&server).complete(&view, &tools()).await.unwrap();
        assert_eq!(
            decision,
            Decision::Final {
                text: "A pain reliever.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn http_status_maps_to_error_kind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let turns = vec![Turn::user("hi")];
        let view = TranscriptView::new(None, &turns, &[]);
        let client = provider(&server);

        assert!(matches!(
            client.complete(&view, &[]).await,
            Err(ModelError::BackendUnavailable(_))
        ));
        assert!(matches!(
            client.complete(&view, &[]).await,
            Err(ModelError::BackendProtocol(message)) if message.contains("bad request")
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        let client = OpenAIProvider::new("k").with_base_url("http://127.0.0.1:9");
        let turns = vec![Turn::user("hi")];
        let view = TranscriptView::new(None, &turns, &[]);

        assert!(matches!(
            client.complete(&view, &[]).await,
            Err(ModelError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn streaming_text_then_done() {
        let server = MockServer::start().await;
        mount_sse(
            &server,
            [
                r#"data: {"choices":[{"delta":{"role":"assistant","content":"We "}}]}"#,
                r#"data: {"choices":[{"delta":{"content":"open at 9."}}]}"#,
                "data: [DONE]",
            ]
            .map(|line| format!("{line}\n\n"))
            .concat(),
        )
        .await;

        let turns = vec![Turn::user("hours?")];
        let view = TranscriptView::new(None, &turns, &[]);
        let events = collect(provider(&server).complete_streaming(&view, &[]).await.unwrap()).await;

        let events: Vec<ModelEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![
                ModelEvent::TextDelta("We ".to_string()),
                ModelEvent::TextDelta("open at 9.".to_string()),
                ModelEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn streaming_merges_tool_call_fragments() {
        let server = MockServer::start().await;
        mount_sse(
            &server,
            [
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"get_medication_info","arguments":""}}]}}]}"#,
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"medication_name\":"}}]}}]}"#,
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"Aspirin\"}"}}]}}]}"#,
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_2","function":{"name":"check_inventory","arguments":"{\"medication_name\":\"Aspirin\"}"}}]}}]}"#,
                r#"data: {"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
                "data: [DONE]",
            ]
            .map(|line| format!("{line}\n\n"))
            .concat(),
        )
        .await;

        let turns = vec![Turn::user("Aspirin?")];
        let view = TranscriptView::new(None, &turns, &[]);
        let mut events = collect(
            provider(&server)
                .complete_streaming(&view, &tools())
                .await
                .unwrap(),
        )
        .await
        .into_iter();

        let Some(Ok(ModelEvent::ToolCallsRequested(calls))) = events.next() else {
            panic!("expected tool calls first");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].arguments["medication_name"], "Aspirin");
        assert_eq!(calls[1].name, "check_inventory");
        assert_eq!(events.next(), Some(Ok(ModelEvent::Done)));
    }

    #[tokio::test]
    async fn streaming_without_done_marker_is_protocol_error() {
        let server = MockServer::start().await;
        mount_sse(
            &server,
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n".to_string(),
        )
        .await;

        let turns = vec![Turn::user("hi")];
        let view = TranscriptView::new(None, &turns, &[]);
        let events = collect(provider(&server).complete_streaming(&view, &[]).await.unwrap()).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(ModelError::BackendProtocol(_))));
    }

    #[tokio::test]
    async fn streaming_malformed_arguments_reach_the_loop() {
        let server = MockServer::start().await;
        mount_sse(
            &server,
            [
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c","function":{"name":"check_inventory","arguments":"{not json"}}]}}]}"#,
                "data: [DONE]",
            ]
            .map(|line| format!("{line}\n\n"))
            .concat(),
        )
        .await;

        let turns = vec![Turn::user("hi")];
        let view = TranscriptView::new(None, &turns, &[]);
        let events = collect(provider(&server).complete_streaming(&view, &[]).await.unwrap()).await;

        assert_eq!(events.len(), 2);
        match &events[0] {
            Ok(ModelEvent::ToolCallsRequested(calls)) => {
                assert_eq!(calls[0].id, "c");
                assert!(calls[0].argument_error.is_some());
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
        assert!(matches!(events[1], Ok(ModelEvent::Done)));
    }
}
