use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{Customer, Medication, PharmacyStore, StoreError};

const REFERENCE_RECORDS: &str = include_str!("reference_records.yaml");

#[derive(Debug, Default, Deserialize)]
struct Records {
    #[serde(default)]
    customers: Vec<Customer>,
    #[serde(default)]
    medications: Vec<Medication>,
}

/// In-process record store loaded from a YAML or JSON fixture.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store seeded with the reference customers and medications.
    pub fn reference() -> Result<Self, StoreError> {
        Self::from_yaml_str(REFERENCE_RECORDS)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, StoreError> {
        let records: Records = serde_yaml::from_str(content)
            .map_err(|error| StoreError::InvalidData(error.to_string()))?;
        Self::from_records(records)
    }

    pub fn from_json_str(content: &str) -> Result<Self, StoreError> {
        let records: Records = serde_json::from_str(content)
            .map_err(|error| StoreError::InvalidData(error.to_string()))?;
        Self::from_records(records)
    }

    /// Loads a fixture file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    fn from_records(records: Records) -> Result<Self, StoreError> {
        let mut names = HashSet::new();
        for medication in &records.medications {
            if medication.name.trim().is_empty() {
                return Err(StoreError::InvalidData(format!(
                    "medication {} has an empty name",
                    medication.medication_id
                )));
            }
            if !names.insert(medication.name.to_lowercase()) {
                return Err(StoreError::InvalidData(format!(
                    "duplicate medication '{}'",
                    medication.name
                )));
            }
        }

        log::info!(
            "Loaded {} customers and {} medications",
            records.customers.len(),
            records.medications.len()
        );

        Ok(Self {
            records: RwLock::new(records),
        })
    }
}

#[async_trait]
impl PharmacyStore for MemoryStore {
    async fn find_medication(&self, name: &str) -> Result<Option<Medication>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .medications
            .iter()
            .find(|medication| medication.matches_name(name))
            .cloned())
    }

    async fn find_customer(&self, name: &str) -> Result<Option<Customer>, StoreError> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let records = self.records.read().await;
        Ok(records
            .customers
            .iter()
            .find(|customer| customer.name.to_lowercase().contains(&needle))
            .cloned())
    }

    async fn list_medications(&self) -> Result<Vec<Medication>, StoreError> {
        let records = self.records.read().await;
        let mut medications = records.medications.clone();
        medications.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(medications)
    }

    async fn update_stock(&self, medication: &str, quantity: u32) -> Result<Medication, StoreError> {
        let mut records = self.records.write().await;
        let entry = records
            .medications
            .iter_mut()
            .find(|candidate| candidate.matches_name(medication))
            .ok_or_else(|| StoreError::MedicationNotFound(medication.to_string()))?;

        log::info!(
            "Stock for '{}' updated: {} -> {}",
            entry.name,
            entry.stock_quantity,
            quantity
        );
        entry.stock_quantity = quantity;
        Ok(entry.clone())
    }
}
