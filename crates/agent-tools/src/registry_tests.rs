//! Dispatch tests for the pharmacy registry

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::tools::test_support::{reference_store, UnreachableStore};
use crate::{pharmacy_registry, ToolError, ToolRegistry};

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn registry() -> ToolRegistry {
    pharmacy_registry(reference_store()).unwrap()
}

#[tokio::test]
async fn unknown_tool_is_rejected_before_any_handler() {
    let error = registry()
        .invoke("get_weather", &args(json!({"city": "Tel Aviv"})))
        .await
        .unwrap_err();

    assert_eq!(error, ToolError::UnknownTool("get_weather".to_string()));
    assert!(!error.reached_handler());
}

#[tokio::test]
async fn missing_required_argument() {
    let error = registry()
        .invoke("get_medication_info", &Map::new())
        .await
        .unwrap_err();

    assert!(matches!(error, ToolError::InvalidArguments(ref message) if message.contains("medication_name")));
    assert!(!error.reached_handler());
}

#[tokio::test]
async fn wrongly_typed_argument() {
    let error = registry()
        .invoke("check_inventory", &args(json!({"medication_name": 42})))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        ToolError::InvalidArguments("argument 'medication_name' must be of type string".to_string())
    );
}

#[tokio::test]
async fn referral_rejects_unlisted_query_type() {
    let error = registry()
        .invoke("refer_to_professional", &args(json!({"query_type": "horoscope"})))
        .await
        .unwrap_err();

    assert!(matches!(error, ToolError::InvalidArguments(ref message) if message.contains("one of")));
}

#[tokio::test]
async fn not_found_is_a_successful_invocation() {
    let result = registry()
        .invoke("get_user_allergies", &args(json!({"user_name": "Nobody Here"})))
        .await
        .unwrap();

    assert_eq!(result["success"], false);
}

#[tokio::test]
async fn store_outage_surfaces_as_execution_error() {
    let registry = pharmacy_registry(Arc::new(UnreachableStore)).unwrap();
    let error = registry
        .invoke("get_all_medications_list", &Map::new())
        .await
        .unwrap_err();

    assert!(error.reached_handler());
    assert_eq!(error.to_payload()["error_kind"], "execution_failed");
}

#[tokio::test]
async fn amoxicillin_lookup_and_allergy_check() {
    let registry = registry();

    let info = registry
        .invoke("get_medication_info", &args(json!({"medication_name": "Amoxicillin"})))
        .await
        .unwrap();
    let allergies = registry
        .invoke("get_user_allergies", &args(json!({"user_name": "Jalen Brunson"})))
        .await
        .unwrap();

    assert_eq!(info["medication"]["generic_name"], "Amoxicillin");
    assert_eq!(allergies["allergies"], "Penicillin");
}
