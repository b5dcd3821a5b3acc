use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{store_failure, GET_USER_ALLERGIES};
use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ArgumentKind, ArgumentSchema, ToolArguments};
use crate::store::PharmacyStore;

#[derive(Debug, Deserialize)]
struct AllergyQuery {
    user_name: String,
}

pub struct GetUserAllergiesTool {
    store: Arc<dyn PharmacyStore>,
}

impl GetUserAllergiesTool {
    pub fn new(store: Arc<dyn PharmacyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetUserAllergiesTool {
    fn name(&self) -> &str {
        GET_USER_ALLERGIES
    }

    fn description(&self) -> &str {
        "Look up the allergies and current medications on file for a customer. Call this whenever someone identifies themselves by name or asks for medication for a named person, before confirming availability."
    }

    fn arguments(&self) -> ArgumentSchema {
        ArgumentSchema::new().required(
            "user_name",
            ArgumentKind::String,
            "Full or partial name of the customer",
        )
    }

    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let query: AllergyQuery = args.parse()?;

        match self
            .store
            .find_customer(&query.user_name)
            .await
            .map_err(store_failure)?
        {
            Some(customer) => Ok(json!({
                "success": true,
                "user": customer.name,
                "allergies": customer.allergies,
                "current_medications": customer.current_medications,
            })),
            None => Ok(json!({
                "success": false,
                "error": format!("User '{}' not found in our system.", query.user_name),
            })),
        }
    }
}
