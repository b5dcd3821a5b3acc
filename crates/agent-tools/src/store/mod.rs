//! Record store behind the pharmacy tools.
//!
//! Tools only read through [`PharmacyStore`]; `update_stock` exists for
//! operators and is never reachable from the model.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid record data: {0}")]
    InvalidData(String),

    #[error("Medication '{0}' not found")]
    MedicationNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub medication_id: u32,
    pub name: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    pub active_ingredients: String,
    #[serde(default)]
    pub dosage_forms: String,
    #[serde(default)]
    pub common_dosages: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_requires_prescription")]
    pub requires_prescription: bool,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default)]
    pub interactions: String,
    #[serde(default)]
    pub side_effects: String,
    #[serde(default)]
    pub contraindications: String,
}

fn default_requires_prescription() -> bool {
    true
}

impl Medication {
    /// Case-insensitive match on the brand or generic name.
    pub fn matches_name(&self, query: &str) -> bool {
        let query = query.trim();
        self.name.eq_ignore_ascii_case(query)
            || self
                .generic_name
                .as_deref()
                .is_some_and(|generic| generic.eq_ignore_ascii_case(query))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub user_id: u32,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default = "none_on_file")]
    pub allergies: String,
    #[serde(default = "none_on_file")]
    pub current_medications: String,
}

fn none_on_file() -> String {
    "None".to_string()
}

#[async_trait]
pub trait PharmacyStore: Send + Sync {
    async fn find_medication(&self, name: &str) -> Result<Option<Medication>, StoreError>;

    /// First customer whose name contains `name`, case-insensitively.
    async fn find_customer(&self, name: &str) -> Result<Option<Customer>, StoreError>;

    /// All medications ordered by name.
    async fn list_medications(&self) -> Result<Vec<Medication>, StoreError>;

    async fn update_stock(&self, medication: &str, quantity: u32) -> Result<Medication, StoreError>;
}
