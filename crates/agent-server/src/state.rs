use std::sync::Arc;

use actix_web::web::Bytes;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use agent_core::AgentEvent;
use agent_loop::{Conversation, ConversationControl};

use crate::assistant::Assistant;

/// One conversation as seen by the HTTP layer. The mutex queues concurrent
/// requests for the same session.
#[derive(Clone)]
pub struct SessionHandle {
    pub conversation: Arc<Mutex<Conversation>>,
    pub control: ConversationControl,
}

impl SessionHandle {
    fn new(conversation: Conversation) -> Self {
        let control = conversation.control();
        Self {
            conversation: Arc::new(Mutex::new(conversation)),
            control,
        }
    }
}

pub struct AppState {
    pub assistant: Assistant,
    pub sessions: DashMap<String, SessionHandle>,
    pub cancel_tokens: DashMap<String, CancellationToken>,
}

impl AppState {
    pub fn new(assistant: Assistant) -> Self {
        Self {
            assistant,
            sessions: DashMap::new(),
            cancel_tokens: DashMap::new(),
        }
    }

    /// Returns the named session, creating it if needed. Without an id a new
    /// session is started.
    pub fn session(&self, session_id: Option<&str>) -> (String, SessionHandle) {
        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let handle = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| {
                log::info!("[{}] New session", session_id);
                SessionHandle::new(self.assistant.conversation_with_id(session_id.clone()))
            })
            .clone();

        (session_id, handle)
    }

    pub fn existing_session(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }
}

/// Forwards agent events to an SSE body as `data: <json>\n\n` frames.
///
/// Cancels `cancel_token` when the client goes away, so an abandoned turn
/// stops at its next suspension point.
pub fn spawn_sse_sender(
    mut rx: mpsc::Receiver<AgentEvent>,
    tx: mpsc::Sender<Bytes>,
    cancel_token: CancellationToken,
    session_id: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = tx.closed() => {
                    log::info!("[{}] SSE client disconnected, cancelling turn", session_id);
                    cancel_token.cancel();
                    break;
                }
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let event_json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(_) => continue,
            };

            if tx
                .send(Bytes::from(format!("data: {}\n\n", event_json)))
                .await
                .is_err()
            {
                cancel_token.cancel();
                break;
            }

            if event.is_terminal() {
                break;
            }
        }
    })
}
