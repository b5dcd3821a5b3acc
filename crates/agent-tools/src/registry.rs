use std::collections::HashMap;
use std::sync::Arc;

use agent_core::tools::{FunctionSchema, ToolSchema};
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{RegistryError, ToolError};
use crate::schema::{ArgumentSchema, ToolArguments};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn arguments(&self) -> ArgumentSchema;
    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError>;

    fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.arguments().to_json_schema(),
            },
        }
    }
}

pub type SharedTool = Arc<dyn Tool>;

/// Name-keyed tool table.
///
/// Populated at startup through `&mut self` and then shared read-only
/// (usually behind an `Arc`) for the lifetime of the process.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, SharedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T) -> Result<(), RegistryError>
    where
        T: Tool + 'static,
    {
        self.register_shared(Arc::new(tool))
    }

    pub fn register_shared(&mut self, tool: SharedTool) -> Result<(), RegistryError> {
        let name = tool.name().trim().to_string();

        if name.is_empty() {
            return Err(RegistryError::InvalidTool(
                "tool name cannot be empty".to_string(),
            ));
        }

        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }

        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<SharedTool> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn list_tools(&self) -> Vec<ToolSchema> {
        let mut tools: Vec<ToolSchema> = self.tools.values().map(|tool| tool.to_schema()).collect();
        tools.sort_by(|left, right| left.function.name.cmp(&right.function.name));
        tools
    }

    pub fn list_tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validates `arguments` against the tool's schema and runs its handler.
    pub async fn invoke(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tool.arguments().validate(arguments)?;

        log::debug!("Invoking tool '{}' with {} argument(s)", name, arguments.len());
        let result = tool.execute(ToolArguments::new(arguments.clone())).await;

        if let Err(error) = &result {
            log::warn!("Tool '{}' failed: {}", name, error);
        }

        result
    }
}
