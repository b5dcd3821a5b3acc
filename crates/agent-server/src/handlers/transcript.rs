use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use agent_core::TranscriptSnapshot;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub busy: bool,
    pub turns: TranscriptSnapshot,
}

/// Reads the latest published snapshot; never waits for a running turn.
pub async fn handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let session_id = path.into_inner();

    match state.existing_session(&session_id) {
        Some(session) => HttpResponse::Ok().json(TranscriptResponse {
            busy: session.control.is_busy(),
            turns: session.control.snapshot(),
            session_id,
        }),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Session not found",
            "session_id": session_id,
        })),
    }
}
