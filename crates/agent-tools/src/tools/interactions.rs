use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    medication_not_found, medication_query_schema, store_failure, MedicationQuery,
    CHECK_INTERACTIONS,
};
use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ArgumentSchema, ToolArguments};
use crate::store::PharmacyStore;

const INTERACTION_WARNING: &str = "Always inform your healthcare provider about all medications you are taking. This is informational only and not medical advice.";

pub struct CheckInteractionsTool {
    store: Arc<dyn PharmacyStore>,
}

impl CheckInteractionsTool {
    pub fn new(store: Arc<dyn PharmacyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CheckInteractionsTool {
    fn name(&self) -> &str {
        CHECK_INTERACTIONS
    }

    fn description(&self) -> &str {
        "Get active ingredients and potential drug interactions for a medication. Use this when the customer asks what is in a medication or what it might interact with."
    }

    fn arguments(&self) -> ArgumentSchema {
        medication_query_schema("Name of the medication")
    }

    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let query: MedicationQuery = args.parse()?;

        match self
            .store
            .find_medication(&query.medication_name)
            .await
            .map_err(store_failure)?
        {
            Some(medication) => Ok(json!({
                "success": true,
                "medication": medication.name,
                "active_ingredients": medication.active_ingredients,
                "interactions": medication.interactions,
                "warning": INTERACTION_WARNING,
            })),
            None => Ok(medication_not_found(&query.medication_name)),
        }
    }
}
