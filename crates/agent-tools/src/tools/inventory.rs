use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    medication_not_found, medication_query_schema, store_failure, MedicationQuery, CHECK_INVENTORY,
};
use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ArgumentSchema, ToolArguments};
use crate::store::PharmacyStore;

/// Customer-facing availability label for a stock quantity.
pub fn stock_status(quantity: u32) -> &'static str {
    match quantity {
        0 => "Out of stock",
        1..=19 => "Low stock - limited availability",
        20..=49 => "Available - moderate stock",
        _ => "Available - good stock",
    }
}

pub struct CheckInventoryTool {
    store: Arc<dyn PharmacyStore>,
}

impl CheckInventoryTool {
    pub fn new(store: Arc<dyn PharmacyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CheckInventoryTool {
    fn name(&self) -> &str {
        CHECK_INVENTORY
    }

    fn description(&self) -> &str {
        "Check if a medication is currently in stock and how much is available. Use this when the customer asks about availability or stock status."
    }

    fn arguments(&self) -> ArgumentSchema {
        medication_query_schema("Name of the medication")
    }

    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let query: MedicationQuery = args.parse()?;

        let Some(medication) = self
            .store
            .find_medication(&query.medication_name)
            .await
            .map_err(store_failure)?
        else {
            return Ok(medication_not_found(&query.medication_name));
        };

        let mut response = json!({
            "success": true,
            "medication": medication.name,
            "in_stock": medication.stock_quantity > 0,
            "stock_quantity": medication.stock_quantity,
            "status": stock_status(medication.stock_quantity),
            "requires_prescription": medication.requires_prescription,
        });

        if medication.requires_prescription {
            response["note"] = json!("This medication requires a valid prescription.");
        }

        Ok(response)
    }
}
