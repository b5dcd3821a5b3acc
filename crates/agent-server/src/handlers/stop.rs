use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StopResponse {
    pub success: bool,
    pub message: String,
}

pub async fn handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let session_id = path.into_inner();
    log::info!("[{}] Stop request received", session_id);

    match state.cancel_tokens.get(&session_id) {
        Some(token) => {
            token.cancel();
            HttpResponse::Ok().json(StopResponse {
                success: true,
                message: "Turn cancelled".to_string(),
            })
        }
        None => {
            log::warn!("[{}] No streaming turn in flight", session_id);
            HttpResponse::NotFound().json(StopResponse {
                success: false,
                message: "No streaming turn in flight".to_string(),
            })
        }
    }
}
