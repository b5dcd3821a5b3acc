use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{medication_query_schema, store_failure, MedicationQuery, GET_MEDICATION_INFO};
use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ArgumentSchema, ToolArguments};
use crate::store::PharmacyStore;

pub struct GetMedicationInfoTool {
    store: Arc<dyn PharmacyStore>,
}

impl GetMedicationInfoTool {
    pub fn new(store: Arc<dyn PharmacyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetMedicationInfoTool {
    fn name(&self) -> &str {
        GET_MEDICATION_INFO
    }

    fn description(&self) -> &str {
        "Get comprehensive information about a medication including description, dosage forms, side effects, and contraindications. Use this when the customer asks what a medication is, what it is used for, or for general information about it."
    }

    fn arguments(&self) -> ArgumentSchema {
        medication_query_schema("Name of the medication (e.g., 'Aspirin', 'Metformin', 'Ibuprofen')")
    }

    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let query: MedicationQuery = args.parse()?;

        let Some(medication) = self
            .store
            .find_medication(&query.medication_name)
            .await
            .map_err(store_failure)?
        else {
            return Ok(json!({
                "success": false,
                "error": format!("Medication '{}' not found in our database.", query.medication_name),
                "suggestion": "Please check the spelling or ask about a different medication.",
            }));
        };

        Ok(json!({
            "success": true,
            "medication": {
                "medication_id": medication.medication_id,
                "name": medication.name,
                "generic_name": medication.generic_name,
                "active_ingredients": medication.active_ingredients,
                "dosage_forms": medication.dosage_forms,
                "common_dosages": medication.common_dosages,
                "description": medication.description,
                "requires_prescription": medication.requires_prescription,
                "side_effects": medication.side_effects,
                "contraindications": medication.contraindications,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{reference_store, UnreachableStore};

    fn args(name: &str) -> ToolArguments {
        ToolArguments::new(
            json!({ "medication_name": name })
                .as_object()
                .cloned()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn returns_medication_details() {
        let tool = GetMedicationInfoTool::new(reference_store());
        let result = tool.execute(args("amoxicillin")).await.unwrap();

        assert_eq!(result["success"], true);
        assert_eq!(result["medication"]["name"], "Amoxicillin");
        assert_eq!(result["medication"]["requires_prescription"], true);
        assert!(result["medication"]["contraindications"]
            .as_str()
            .unwrap()
            .contains("Penicillin allergy"));
    }

    #[tokio::test]
    async fn unknown_medication_is_a_domain_failure() {
        let tool = GetMedicationInfoTool::new(reference_store());
        let result = tool.execute(args("Tylenol")).await.unwrap();

        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "Medication 'Tylenol' not found in our database.");
        assert!(result["suggestion"].is_string());
    }

    #[tokio::test]
    async fn store_outage_is_an_execution_error() {
        let tool = GetMedicationInfoTool::new(Arc::new(UnreachableStore));
        let error = tool.execute(args("Aspirin")).await.unwrap_err();
        assert!(matches!(error, ToolError::Execution(message) if message.contains("connection refused")));
    }
}
