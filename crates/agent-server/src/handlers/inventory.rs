use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use agent_tools::{stock_status, StoreError};

use crate::state::AppState;

/// Operator stock update. Applies to the store every session reads from.
#[derive(Debug, Deserialize)]
pub struct StockUpdateRequest {
    pub medication_name: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StockUpdateResponse {
    pub medication: String,
    pub stock_quantity: u32,
    pub status: String,
}

pub async fn handler(
    state: web::Data<AppState>,
    req: web::Json<StockUpdateRequest>,
) -> impl Responder {
    let name = req.medication_name.trim();
    if name.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "No medication_name provided"
        }));
    }

    match state.assistant.store().update_stock(name, req.quantity).await {
        Ok(medication) => HttpResponse::Ok().json(StockUpdateResponse {
            status: stock_status(medication.stock_quantity).to_string(),
            stock_quantity: medication.stock_quantity,
            medication: medication.name,
        }),
        Err(error @ StoreError::MedicationNotFound(_)) => {
            HttpResponse::NotFound().json(serde_json::json!({ "error": error.to_string() }))
        }
        Err(error) => {
            log::error!("Stock update for '{}' failed: {}", name, error);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({ "error": error.to_string() }))
        }
    }
}
