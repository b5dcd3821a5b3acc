use actix_web::http::header;
use actix_web::{web, HttpResponse, Responder};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use agent_core::AgentEvent;

use crate::handlers::chat::{no_message, ChatRequest};
use crate::state::{spawn_sse_sender, AppState};

pub const SESSION_HEADER: &str = "x-session-id";

pub async fn handler(state: web::Data<AppState>, req: web::Json<ChatRequest>) -> impl Responder {
    let Some(message) = req.message().map(str::to_string) else {
        return no_message();
    };

    let (session_id, session) = state.session(req.session_id.as_deref());
    log::info!("[{}] Stream started", session_id);

    let (sse_tx, mut sse_rx) = mpsc::channel::<web::Bytes>(100);
    let (event_tx, event_rx) = mpsc::channel::<AgentEvent>(100);
    let cancel_token = CancellationToken::new();

    let _sse_handle = spawn_sse_sender(event_rx, sse_tx, cancel_token.clone(), session_id.clone());

    let state = state.clone();
    let turn_session_id = session_id.clone();
    tokio::spawn(async move {
        let mut conversation = session.conversation.lock().await;
        state
            .cancel_tokens
            .insert(turn_session_id.clone(), cancel_token.clone());

        if let Err(error) = conversation
            .send_streaming(message, event_tx, cancel_token)
            .await
        {
            log::warn!("[{}] Streaming turn ended: {}", turn_session_id, error);
        }

        state.cancel_tokens.remove(&turn_session_id);
    });

    HttpResponse::Ok()
        .append_header((header::CONTENT_TYPE, "text/event-stream"))
        .append_header((header::CACHE_CONTROL, "no-cache"))
        .append_header((header::CONNECTION, "keep-alive"))
        .append_header((SESSION_HEADER, session_id))
        .streaming(async_stream::stream! {
            while let Some(item) = sse_rx.recv().await {
                yield Ok::<_, actix_web::Error>(item);
            }
        })
}
