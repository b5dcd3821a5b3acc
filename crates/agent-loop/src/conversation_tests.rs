use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use agent_core::{AgentError, AgentEvent, ToolActivity, Turn, TurnStatus};
use agent_llm::{ModelError, ScriptedModelClient, ScriptedReply, ScriptedToolCall};
use agent_policy::pharmacy_rules;
use agent_tools::{pharmacy_registry, MemoryStore, PharmacyStore};

use super::*;
use crate::config::DEFAULT_ROUND_LIMIT_MESSAGE;

const MEDICATIONS: [&str; 8] = [
    "Aspirin",
    "Metformin",
    "Semaglutide",
    "Ibuprofen",
    "Amoxicillin",
    "Warfarin",
    "Glyburide",
    "Probenecid",
];

const JALEN_ASKS: &str = "Hi, I'm Jalen Brunson. Can I get Amoxicillin?";

fn conversation_with(client: Arc<ScriptedModelClient>, config: AgentLoopConfig) -> Conversation {
    let store: Arc<dyn PharmacyStore> = Arc::new(MemoryStore::reference().unwrap());
    let tools = Arc::new(pharmacy_registry(store).unwrap());
    let policy = Arc::new(pharmacy_rules(MEDICATIONS).unwrap());
    Conversation::new(client, tools, policy, config).with_id("test")
}

fn conversation(client: Arc<ScriptedModelClient>) -> Conversation {
    conversation_with(
        client,
        AgentLoopConfig::default().with_system_prompt("You are a pharmacy assistant."),
    )
}

fn deferral_script() -> Vec<ScriptedReply> {
    vec![
        ScriptedReply::tool_call("get_medication_info", json!({"medication_name": "Amoxicillin"})),
        ScriptedReply::chunks(["Yes, ", "we have it."]),
        ScriptedReply::tool_call("get_user_allergies", json!({"user_name": "Jalen Brunson"})),
        ScriptedReply::chunks(["You are allergic to Penicillin, ", "so please talk to a pharmacist."]),
    ]
}

/// Every assistant turn with calls is followed by one result per call, in order.
fn assert_rounds_well_formed(turns: &[Turn]) {
    let mut index = 0;
    while index < turns.len() {
        let calls = turns[index].tool_calls();
        for (offset, call) in calls.iter().enumerate() {
            match &turns[index + 1 + offset] {
                Turn::ToolResult { tool_call_id, .. } => assert_eq!(tool_call_id, &call.id),
                other => panic!("expected tool result, got {other:?}"),
            }
        }
        index += 1 + calls.len();
    }
}

async fn collect_events(mut event_rx: mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    while let Some(event) = event_rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn plain_question_is_answered_in_one_round() {
    let client = Arc::new(ScriptedModelClient::new([ScriptedReply::text(
        "We are open from 9 to 5.",
    )]));
    let mut conversation = conversation(client.clone());

    let outcome = conversation.send("When are you open?").await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.final_text, "We are open from 9 to 5.");
    assert_eq!(outcome.rounds, 1);
    assert_eq!(
        conversation.transcript().turns(),
        &[
            Turn::user("When are you open?"),
            Turn::assistant_text("We are open from 9 to 5."),
        ]
    );
    assert_eq!(conversation.state(), LoopState::AwaitingUserInput);

    let request = &client.requests()[0];
    assert_eq!(request.system_prompt.as_deref(), Some("You are a pharmacy assistant."));
    assert_eq!(request.tools.len(), 6);
    assert!(!request.streaming);
}

#[tokio::test]
async fn unchecked_answer_for_named_customer_is_deferred() {
    let client = Arc::new(ScriptedModelClient::new(deferral_script()));
    let mut conversation = conversation(client.clone());

    let outcome = conversation.send(JALEN_ASKS).await.unwrap();

    assert!(outcome.is_completed());
    assert!(outcome.final_text.starts_with("You are allergic to Penicillin"));
    assert_eq!(outcome.rounds, 4);
    assert_eq!(
        outcome.tool_names(),
        vec!["get_medication_info", "get_user_allergies"]
    );
    assert_eq!(conversation.round_counter(), 4);

    let requests = client.requests();
    assert!(requests[1].notes.is_empty());
    assert_eq!(requests[2].notes.len(), 1);
    assert!(requests[2].notes[0].contains("get_user_allergies"));
    assert!(!requests[2].notes[0].contains("get_medication_info"));

    let turns = conversation.transcript().turns();
    assert_eq!(turns.len(), 6);
    assert!(turns
        .iter()
        .all(|turn| turn.text() != Some("Yes, we have it.")));
    assert_rounds_well_formed(turns);
}

#[tokio::test]
async fn streaming_holds_back_deferred_text() {
    let client = Arc::new(ScriptedModelClient::new(deferral_script()));
    let mut conversation = conversation(client.clone());
    let (event_tx, event_rx) = mpsc::channel(64);

    let outcome = conversation
        .send_streaming(JALEN_ASKS, event_tx, CancellationToken::new())
        .await
        .unwrap();
    let events = collect_events(event_rx).await;

    let content: String = events
        .iter()
        .filter_map(|event| match event {
            AgentEvent::Content { data } => Some(data.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(content, outcome.final_text);
    assert!(!content.contains("we have it"));

    let requested = events
        .iter()
        .filter(|event| {
            matches!(
                event,
                AgentEvent::Tool {
                    activity: ToolActivity::Requested { .. }
                }
            )
        })
        .count();
    assert_eq!(requested, 2);

    assert!(matches!(
        events.last(),
        Some(AgentEvent::Done {
            status: TurnStatus::Completed,
            ..
        })
    ));
    assert!(client.requests().iter().all(|request| request.streaming));
}

#[tokio::test]
async fn batch_and_streaming_build_the_same_transcript() {
    let batch_client = Arc::new(ScriptedModelClient::new(deferral_script()));
    let mut batch = conversation(batch_client);
    batch.send(JALEN_ASKS).await.unwrap();

    let streaming_client = Arc::new(ScriptedModelClient::new(deferral_script()));
    let mut streaming = conversation(streaming_client);
    let (event_tx, _event_rx) = mpsc::channel(64);
    streaming
        .send_streaming(JALEN_ASKS, event_tx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(batch.transcript().turns(), streaming.transcript().turns());
}

#[tokio::test]
async fn unknown_tool_result_is_recorded_and_turn_continues() {
    let client = Arc::new(ScriptedModelClient::new([
        ScriptedReply::tool_call("get_weather", json!({"city": "Haifa"})),
        ScriptedReply::text("I can only help with pharmacy questions."),
    ]));
    let mut conversation = conversation(client);

    let outcome = conversation.send("What's the weather?").await.unwrap();

    assert!(outcome.is_completed());
    let turns = conversation.transcript().turns();
    assert_eq!(turns.len(), 4);
    let Turn::ToolResult {
        tool_name, result, ..
    } = &turns[2]
    else {
        panic!("expected tool result");
    };
    assert_eq!(tool_name, "get_weather");
    assert_eq!(result["success"], false);
    assert_eq!(result["error_kind"], "unknown_tool");
}

#[tokio::test]
async fn rejected_calls_do_not_satisfy_the_policy() {
    let client = Arc::new(ScriptedModelClient::new([
        ScriptedReply::tool_calls([
            ("get_medication_info", json!({"medication_name": "Amoxicillin"})),
            ("get_user_allergies", json!({"name": "Jalen Brunson"})),
        ]),
        ScriptedReply::text("Sure, here you go."),
        ScriptedReply::tool_call("get_user_allergies", json!({"user_name": "Jalen Brunson"})),
        ScriptedReply::text("Please speak to a pharmacist first."),
    ]));
    let mut conversation = conversation(client.clone());

    let outcome = conversation.send(JALEN_ASKS).await.unwrap();

    assert_eq!(outcome.final_text, "Please speak to a pharmacist first.");
    assert_eq!(client.request_count(), 4);
    let Turn::ToolResult { result, .. } = &conversation.transcript().turns()[3] else {
        panic!("expected tool result");
    };
    assert_eq!(result["error_kind"], "invalid_arguments");
}

#[tokio::test]
async fn unparseable_arguments_become_a_tool_error_and_the_turn_completes() {
    let client = Arc::new(ScriptedModelClient::new([
        ScriptedReply::tool_calls([
            ("get_medication_info", json!("{\"medication_name\": \"Amox")),
            ("check_inventory", json!({"medication_name": "Amoxicillin"})),
        ]),
        ScriptedReply::text("Amoxicillin is in stock."),
    ]));
    let mut conversation = conversation(client.clone());

    let outcome = conversation.send("Do you have Amoxicillin?").await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.final_text, "Amoxicillin is in stock.");
    assert_eq!(client.request_count(), 2);

    let turns = conversation.transcript().turns();
    assert_eq!(turns.len(), 5);
    assert_rounds_well_formed(turns);
    let Turn::ToolResult { tool_name, result, .. } = &turns[2] else {
        panic!("expected tool result");
    };
    assert_eq!(tool_name, "get_medication_info");
    assert_eq!(result["success"], false);
    assert_eq!(result["error_kind"], "invalid_arguments");
    let Turn::ToolResult { result, .. } = &turns[3] else {
        panic!("expected tool result");
    };
    assert_eq!(result["success"], true);
}

#[tokio::test]
async fn parallel_results_follow_request_order() {
    let client = Arc::new(ScriptedModelClient::new([
        ScriptedReply::tool_calls([
            ("get_all_medications_list", json!({})),
            ("get_medication_info", json!({"medication_name": "Aspirin"})),
            ("check_inventory", json!({"medication_name": "Aspirin"})),
        ]),
        ScriptedReply::text("Aspirin is available."),
    ]));
    let mut conversation = conversation(client);

    conversation.send("Tell me about Aspirin").await.unwrap();

    let turns = conversation.transcript().turns();
    assert_eq!(turns.len(), 6);
    let ids: Vec<&str> = turns[1].tool_calls().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["call_1", "call_2", "call_3"]);
    assert_rounds_well_formed(turns);
}

#[tokio::test]
async fn round_limit_fails_closed() {
    let client = Arc::new(
        ScriptedModelClient::new([ScriptedReply::tool_call(
            "check_inventory",
            json!({"medication_name": "Aspirin"}),
        )])
        .repeat_last(),
    );
    let mut conversation = conversation(client.clone());

    let outcome = conversation.send("Do you have Aspirin?").await.unwrap();

    assert_eq!(outcome.status, TurnStatus::RoundLimitExceeded);
    assert_eq!(outcome.final_text, DEFAULT_ROUND_LIMIT_MESSAGE);
    assert_eq!(outcome.rounds, 6);
    assert_eq!(client.request_count(), 6);

    let turns = conversation.transcript().turns();
    assert_eq!(turns.len(), 1 + 6 * 2 + 1);
    assert_eq!(turns.last(), Some(&Turn::assistant_text(DEFAULT_ROUND_LIMIT_MESSAGE)));
    assert_rounds_well_formed(turns);
}

#[tokio::test]
async fn closing_answer_counts_against_the_budget() {
    let script = || {
        vec![
            ScriptedReply::tool_call("check_inventory", json!({"medication_name": "Aspirin"})),
            ScriptedReply::tool_call("get_medication_info", json!({"medication_name": "Aspirin"})),
            ScriptedReply::text("Aspirin is in stock."),
        ]
    };

    let client = Arc::new(ScriptedModelClient::new(script()));
    let mut conversation =
        conversation_with(client.clone(), AgentLoopConfig::default().with_max_rounds(3));
    let outcome = conversation.send("Do you have Aspirin?").await.unwrap();
    assert!(outcome.is_completed());
    assert_eq!(outcome.rounds, 3);

    let client = Arc::new(ScriptedModelClient::new(script()));
    let mut conversation =
        conversation_with(client.clone(), AgentLoopConfig::default().with_max_rounds(2));
    let outcome = conversation.send("Do you have Aspirin?").await.unwrap();
    assert_eq!(outcome.status, TurnStatus::RoundLimitExceeded);
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn round_limit_names_missing_checks() {
    let client = Arc::new(ScriptedModelClient::new([ScriptedReply::text("Yes, we have it.")]).repeat_last());
    let mut conversation =
        conversation_with(client.clone(), AgentLoopConfig::default().with_max_rounds(2));
    let (event_tx, event_rx) = mpsc::channel(16);

    let outcome = conversation
        .send_streaming(JALEN_ASKS, event_tx, CancellationToken::new())
        .await
        .unwrap();
    let events = collect_events(event_rx).await;

    assert_eq!(outcome.status, TurnStatus::RoundLimitExceeded);
    assert!(outcome
        .final_text
        .ends_with("The following checks could not be completed: get_medication_info, get_user_allergies."));
    assert_eq!(client.request_count(), 2);
    assert_eq!(
        events,
        vec![
            AgentEvent::content(outcome.final_text.clone()),
            AgentEvent::Done {
                final_text: outcome.final_text.clone(),
                status: TurnStatus::RoundLimitExceeded,
                tool_calls_observed: vec![],
            },
        ]
    );
}

#[tokio::test]
async fn cancelled_stream_appends_no_assistant_turn() {
    let client = Arc::new(ScriptedModelClient::new([ScriptedReply::stall(["Asp", "irin is"])]));
    let mut conversation = conversation(client);
    let (event_tx, mut event_rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();

    let watcher = {
        let cancel = cancel.clone();
        async move {
            let mut events = Vec::new();
            let mut chunks = 0;
            while let Some(event) = event_rx.recv().await {
                if matches!(event, AgentEvent::Content { .. }) {
                    chunks += 1;
                    if chunks == 2 {
                        cancel.cancel();
                    }
                }
                events.push(event);
            }
            events
        }
    };

    let (result, events) = tokio::join!(
        conversation.send_streaming("Do you have Aspirin?", event_tx, cancel.clone()),
        watcher
    );

    assert!(matches!(result, Err(AgentError::Cancelled)));
    assert_eq!(events.len(), 3);
    assert!(matches!(events.last(), Some(AgentEvent::Error { .. })));
    assert_eq!(
        conversation.transcript().turns(),
        &[Turn::user("Do you have Aspirin?")]
    );
    assert_eq!(conversation.state(), LoopState::AwaitingUserInput);
}

#[tokio::test]
async fn backend_failure_appends_nothing_for_the_attempt() {
    let client = Arc::new(ScriptedModelClient::new([
        ScriptedReply::tool_call("check_inventory", json!({"medication_name": "Ibuprofen"})),
        ScriptedReply::Fail(ModelError::BackendUnavailable("connection refused".to_string())),
    ]));
    let mut conversation = conversation(client);

    let error = conversation.send("Is Ibuprofen in stock?").await.unwrap_err();

    assert!(matches!(error, AgentError::BackendUnavailable(_)));
    let turns = conversation.transcript().turns();
    assert_eq!(turns.len(), 3);
    assert!(matches!(turns[2], Turn::ToolResult { .. }));
}

#[tokio::test]
async fn streaming_backend_failure_ends_with_error_event() {
    let client = Arc::new(ScriptedModelClient::new([ScriptedReply::FailAfter(
        vec!["Partial".to_string()],
        ModelError::BackendProtocol("bad chunk".to_string()),
    )]));
    let mut conversation = conversation(client);
    let (event_tx, event_rx) = mpsc::channel(16);

    let result = conversation
        .send_streaming("Hello", event_tx, CancellationToken::new())
        .await;
    let events = collect_events(event_rx).await;

    assert!(matches!(result, Err(AgentError::BackendProtocol(_))));
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], AgentEvent::Error { .. }));
    assert_eq!(conversation.transcript().len(), 1);
}

#[tokio::test]
async fn duplicate_call_ids_are_a_protocol_error() {
    let duplicate = |name: &str| ScriptedToolCall {
        id: Some("dup".to_string()),
        name: name.to_string(),
        arguments: json!({"medication_name": "Aspirin"}),
    };
    let client = Arc::new(ScriptedModelClient::new([ScriptedReply::ToolCalls(vec![
        duplicate("get_medication_info"),
        duplicate("check_inventory"),
    ])]));
    let mut conversation = conversation(client);

    let error = conversation.send("Aspirin?").await.unwrap_err();

    assert!(matches!(error, AgentError::BackendProtocol(_)));
    assert_eq!(conversation.transcript().len(), 1);
}

#[tokio::test]
async fn blank_call_id_is_a_protocol_error() {
    let client = Arc::new(ScriptedModelClient::new([ScriptedReply::ToolCalls(vec![
        ScriptedToolCall {
            id: Some(" ".to_string()),
            name: "check_inventory".to_string(),
            arguments: json!({"medication_name": "Aspirin"}),
        },
    ])]));
    let mut conversation = conversation(client);

    let error = conversation.send("Aspirin?").await.unwrap_err();

    assert!(matches!(error, AgentError::BackendProtocol(_)));
    assert_eq!(conversation.transcript().len(), 1);
}

#[tokio::test]
async fn reset_clears_everything() {
    let client = Arc::new(ScriptedModelClient::new(deferral_script()));
    let mut conversation = conversation(client);
    conversation.send(JALEN_ASKS).await.unwrap();
    let mut snapshots = conversation.subscribe();

    conversation.reset();

    assert!(conversation.transcript().is_empty());
    assert_eq!(conversation.round_counter(), 0);
    assert!(snapshots.has_changed().unwrap());
    assert!(snapshots.borrow_and_update().is_empty());
}

#[tokio::test]
async fn reset_requested_mid_turn_is_applied_when_turn_ends() {
    let client = Arc::new(ScriptedModelClient::new([ScriptedReply::stall(Vec::<String>::new())]));
    let mut conversation = conversation(client);
    let control = conversation.control();
    let cancel = CancellationToken::new();

    let driver = {
        let control = control.clone();
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let busy = control.is_busy();
            let queued = control.request_reset();
            let visible = control.snapshot().len();
            cancel.cancel();
            (busy, queued, visible)
        }
    };

    let (result, (busy, queued, visible)) =
        tokio::join!(conversation.send_cancellable("Hello", &cancel), driver);

    assert!(matches!(result, Err(AgentError::Cancelled)));
    assert!(busy);
    assert!(queued);
    assert_eq!(visible, 1);
    assert!(conversation.transcript().is_empty());
    assert!(!control.is_busy());
    assert!(!control.reset_pending());
}

#[tokio::test]
async fn reset_requested_while_idle_applies_before_next_turn() {
    let client = Arc::new(ScriptedModelClient::new([
        ScriptedReply::text("First answer"),
        ScriptedReply::text("Second answer"),
    ]));
    let mut conversation = conversation(client.clone());
    conversation.send("First").await.unwrap();

    assert!(!conversation.control().request_reset());
    conversation.send("Second").await.unwrap();

    assert_eq!(
        conversation.transcript().turns(),
        &[Turn::user("Second"), Turn::assistant_text("Second answer")]
    );
    assert_eq!(client.requests()[1].turns, vec![Turn::user("Second")]);
}

#[tokio::test]
async fn transcript_grows_across_turns() {
    let client = Arc::new(ScriptedModelClient::new([
        ScriptedReply::text("Hi there"),
        ScriptedReply::text("Aspirin is a pain reliever."),
    ]));
    let mut conversation = conversation(client.clone());

    conversation.send("Hello").await.unwrap();
    conversation.send("What is Aspirin?").await.unwrap();

    assert_eq!(conversation.transcript().len(), 4);
    assert_eq!(client.requests()[1].turns.len(), 3);
}
