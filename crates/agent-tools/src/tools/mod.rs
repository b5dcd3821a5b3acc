//! Pharmacy tools exposed to the model.

mod allergies;
mod catalog;
mod interactions;
mod inventory;
mod medication_info;
mod referral;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{RegistryError, ToolError};
use crate::registry::ToolRegistry;
use crate::schema::{ArgumentKind, ArgumentSchema};
use crate::store::{PharmacyStore, StoreError};

pub use allergies::GetUserAllergiesTool;
pub use catalog::ListMedicationsTool;
pub use interactions::CheckInteractionsTool;
pub use inventory::{stock_status, CheckInventoryTool};
pub use medication_info::GetMedicationInfoTool;
pub use referral::{QueryType, ReferToProfessionalTool};

pub const GET_MEDICATION_INFO: &str = "get_medication_info";
pub const CHECK_INTERACTIONS: &str = "check_active_ingredients_and_interactions";
pub const CHECK_INVENTORY: &str = "check_inventory";
pub const REFER_TO_PROFESSIONAL: &str = "refer_to_professional";
pub const GET_USER_ALLERGIES: &str = "get_user_allergies";
pub const LIST_MEDICATIONS: &str = "get_all_medications_list";

/// Registry holding every pharmacy tool, backed by `store`.
pub fn pharmacy_registry(store: Arc<dyn PharmacyStore>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(GetMedicationInfoTool::new(store.clone()))?;
    registry.register(CheckInteractionsTool::new(store.clone()))?;
    registry.register(CheckInventoryTool::new(store.clone()))?;
    registry.register(GetUserAllergiesTool::new(store.clone()))?;
    registry.register(ListMedicationsTool::new(store))?;
    registry.register(ReferToProfessionalTool)?;
    Ok(registry)
}

#[derive(Debug, Deserialize)]
struct MedicationQuery {
    medication_name: String,
}

fn medication_query_schema(description: &str) -> ArgumentSchema {
    ArgumentSchema::new().required("medication_name", ArgumentKind::String, description)
}

fn medication_not_found(name: &str) -> Value {
    json!({
        "success": false,
        "error": format!("Medication '{}' not found in our database.", name),
    })
}

fn store_failure(error: StoreError) -> ToolError {
    ToolError::Execution(format!("record store error: {}", error))
}
