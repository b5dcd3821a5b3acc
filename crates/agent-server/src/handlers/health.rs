use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

pub async fn handler(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "model": state.assistant.model_name(),
        "tools": state.assistant.tools().list_tool_names(),
        "rules": state.assistant.policy().rules().len(),
        "sessions": state.sessions.len(),
    }))
}
