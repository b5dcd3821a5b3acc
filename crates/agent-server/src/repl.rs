//! Terminal front ends: an interactive chat and a one-shot question.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use agent_core::{AgentError, AgentEvent, ToolActivity, ToolCallRequest, TurnOutcome, TurnStatus};

use crate::assistant::Assistant;

const QUIT_COMMANDS: [&str; 3] = ["quit", "exit", "q"];

const DRAFT_DISCARDED: &str = "[draft discarded, checking records]";

/// Turns streamed events into terminal text.
///
/// Text streamed before a tool round is provisional; when the round starts
/// the renderer says so instead of leaving the draft looking like an answer.
#[derive(Debug, Default)]
pub struct EventRenderer {
    draft_printed: bool,
}

impl EventRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, event: &AgentEvent) -> Option<String> {
        match event {
            AgentEvent::Content { data } => {
                self.draft_printed |= !data.is_empty();
                Some(data.clone())
            }
            AgentEvent::Tool {
                activity: ToolActivity::Requested { tool_calls },
            } => {
                let marker = if std::mem::take(&mut self.draft_printed) {
                    format!("\n{}", DRAFT_DISCARDED)
                } else {
                    String::new()
                };
                Some(format!(
                    "{}\n{}\n",
                    marker,
                    tool_calls
                        .iter()
                        .map(|call| format!("  -> {}", describe_call(call)))
                        .collect::<Vec<_>>()
                        .join("\n")
                ))
            }
            AgentEvent::Tool {
                activity:
                    ToolActivity::Completed {
                        tool_name, success, ..
                    },
            } => Some(format!(
                "  <- {} {}\n",
                tool_name,
                if *success { "ok" } else { "failed" }
            )),
            AgentEvent::Done { status, .. } => {
                self.draft_printed = false;
                Some(match status {
                    TurnStatus::Completed => "\n".to_string(),
                    TurnStatus::RoundLimitExceeded => "\n(round limit reached)\n".to_string(),
                })
            }
            AgentEvent::Error { data } => {
                self.draft_printed = false;
                Some(format!("\n[error] {}\n", data))
            }
        }
    }
}

fn describe_call(call: &ToolCallRequest) -> String {
    format!("{}({})", call.name, serde_json::Value::Object(call.arguments.clone()))
}

/// Writes the tool calls and the answer of a finished turn.
pub fn write_outcome(out: &mut impl Write, outcome: &TurnOutcome) -> std::io::Result<()> {
    if !outcome.tool_calls_observed.is_empty() {
        writeln!(out, "Tool calls:")?;
        for call in &outcome.tool_calls_observed {
            writeln!(out, "  {}", describe_call(call))?;
        }
        writeln!(out)?;
    }
    writeln!(out, "Assistant: {}", outcome.final_text)?;
    if !outcome.is_completed() {
        writeln!(out, "(round limit of {} reached)", outcome.rounds)?;
    }
    Ok(())
}

/// Runs a single batch turn and prints the result.
pub async fn run_ask(assistant: &Assistant, message: &str) -> anyhow::Result<()> {
    let mut conversation = assistant.conversation();
    let outcome = conversation.send(message).await?;
    write_outcome(&mut std::io::stdout().lock(), &outcome)?;
    Ok(())
}

/// Interactive chat on stdin/stdout. Ctrl-C cancels the running turn.
pub async fn run_repl(assistant: &Assistant) -> anyhow::Result<()> {
    let mut conversation = assistant.conversation();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Pharmacy assistant ({})", assistant.model_name());
    println!("Type 'reset' to start over, 'quit' to leave.\n");

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if QUIT_COMMANDS.contains(&input.to_lowercase().as_str()) {
            break;
        }
        if input.eq_ignore_ascii_case("reset") {
            conversation.reset();
            println!("Conversation reset.\n");
            continue;
        }

        let (event_tx, mut event_rx) = mpsc::channel::<AgentEvent>(100);
        let printer = tokio::spawn(async move {
            let mut renderer = EventRenderer::new();
            print!("Assistant: ");
            while let Some(event) = event_rx.recv().await {
                if let Some(text) = renderer.render(&event) {
                    print!("{}", text);
                    let _ = std::io::stdout().flush();
                }
            }
        });

        let cancel_token = CancellationToken::new();
        let turn = conversation.send_streaming(input.to_string(), event_tx, cancel_token.clone());
        tokio::pin!(turn);

        let result = loop {
            tokio::select! {
                result = &mut turn => break result,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Cancelling current turn");
                    cancel_token.cancel();
                }
            }
        };
        let _ = printer.await;

        match result {
            Ok(_) => println!(),
            Err(AgentError::Cancelled) => println!("(cancelled)\n"),
            Err(error) if error.is_backend() => println!("The model is unavailable right now.\n"),
            Err(error) => return Err(error.into()),
        }
    }

    println!("Goodbye.");
    Ok(())
}
