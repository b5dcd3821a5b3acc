//! Pharmacy tools and the registry that dispatches model tool calls to them.
//!
//! Every tool implements the [`Tool`] trait and is registered by name in a
//! [`ToolRegistry`]. Tools read customer and medication records through the
//! [`PharmacyStore`] trait.

pub mod error;
pub mod registry;
pub mod schema;
pub mod store;
pub mod tools;

pub use error::{RegistryError, ToolError};
pub use registry::{SharedTool, Tool, ToolRegistry};
pub use schema::{ArgumentKind, ArgumentSchema, ArgumentSpec, ToolArguments};
pub use store::{Customer, Medication, MemoryStore, PharmacyStore, StoreError};
pub use tools::{
    pharmacy_registry, stock_status, CHECK_INTERACTIONS, CHECK_INVENTORY, GET_MEDICATION_INFO,
    GET_USER_ALLERGIES, LIST_MEDICATIONS, REFER_TO_PROFESSIONAL,
};

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
