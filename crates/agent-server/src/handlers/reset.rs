use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ResetResponse {
    /// `success` when cleared now, `queued` when a turn is still running.
    pub status: String,
}

pub async fn handler(state: web::Data<AppState>, req: web::Json<ResetRequest>) -> impl Responder {
    let session_id = req.session_id.trim();

    let Some(session) = state.existing_session(session_id) else {
        log::debug!("[{}] Reset of unknown session", session_id);
        return HttpResponse::Ok().json(ResetResponse {
            status: "success".to_string(),
        });
    };

    let status = match session.conversation.try_lock() {
        Ok(mut conversation) => {
            conversation.reset();
            "success"
        }
        Err(_) => {
            session.control.request_reset();
            log::info!("[{}] Turn in flight, reset queued", session_id);
            "queued"
        }
    };

    HttpResponse::Ok().json(ResetResponse {
        status: status.to_string(),
    })
}
