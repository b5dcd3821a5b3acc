use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{store_failure, LIST_MEDICATIONS};
use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ArgumentSchema, ToolArguments};
use crate::store::PharmacyStore;

pub struct ListMedicationsTool {
    store: Arc<dyn PharmacyStore>,
}

impl ListMedicationsTool {
    pub fn new(store: Arc<dyn PharmacyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListMedicationsTool {
    fn name(&self) -> &str {
        LIST_MEDICATIONS
    }

    fn description(&self) -> &str {
        "List every medication the pharmacy carries with its prescription requirement and whether it is in stock. Use this when the customer asks what medications are available."
    }

    fn arguments(&self) -> ArgumentSchema {
        ArgumentSchema::new()
    }

    async fn execute(&self, _args: ToolArguments) -> Result<Value, ToolError> {
        let medications = self.store.list_medications().await.map_err(store_failure)?;

        let entries: Vec<Value> = medications
            .iter()
            .map(|medication| {
                json!({
                    "name": medication.name,
                    "requires_prescription": medication.requires_prescription,
                    "in_stock": medication.stock_quantity > 0,
                })
            })
            .collect();

        Ok(json!({
            "success": true,
            "count": entries.len(),
            "medications": entries,
        }))
    }
}
