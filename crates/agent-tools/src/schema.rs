//! Typed argument schemas for tools.
//!
//! A schema renders the JSON-Schema object offered to the model and
//! validates the arguments the model sends back before a handler runs.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::error::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ArgumentKind {
    fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub kind: ArgumentKind,
    pub description: String,
    pub required: bool,
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSchema {
    args: Vec<ArgumentSpec>,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: &str, kind: ArgumentKind, description: &str) -> Self {
        self.push(name, kind, description, true)
    }

    pub fn optional(self, name: &str, kind: ArgumentKind, description: &str) -> Self {
        self.push(name, kind, description, false)
    }

    /// Restricts the most recently added string argument to a fixed set of values.
    pub fn one_of(mut self, values: &[&str]) -> Self {
        if let Some(last) = self.args.last_mut() {
            last.allowed = values.iter().map(|value| value.to_string()).collect();
        }
        self
    }

    fn push(mut self, name: &str, kind: ArgumentKind, description: &str, required: bool) -> Self {
        self.args.push(ArgumentSpec {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required,
            allowed: Vec::new(),
        });
        self
    }

    pub fn args(&self) -> &[ArgumentSpec] {
        &self.args
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for arg in &self.args {
            let mut property = json!({
                "type": arg.kind.json_type(),
                "description": arg.description,
            });
            if !arg.allowed.is_empty() {
                property["enum"] = json!(arg.allowed);
            }
            properties.insert(arg.name.clone(), property);
        }

        let required: Vec<&str> = self
            .args
            .iter()
            .filter(|arg| arg.required)
            .map(|arg| arg.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Checks presence, primitive type and allowed values. Unknown keys are ignored;
    /// an optional argument sent as `null` counts as absent.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<(), ToolError> {
        for arg in &self.args {
            let value = match arguments.get(&arg.name) {
                None | Some(Value::Null) if arg.required => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required argument '{}'",
                        arg.name
                    )));
                }
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            if !arg.kind.accepts(value) {
                return Err(ToolError::InvalidArguments(format!(
                    "argument '{}' must be of type {}",
                    arg.name,
                    arg.kind.json_type()
                )));
            }

            if !arg.allowed.is_empty() {
                let allowed = value
                    .as_str()
                    .is_some_and(|value| arg.allowed.iter().any(|candidate| candidate == value));
                if !allowed {
                    return Err(ToolError::InvalidArguments(format!(
                        "argument '{}' must be one of: {}",
                        arg.name,
                        arg.allowed.join(", ")
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Validated arguments handed to a tool handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    pub fn new(arguments: Map<String, Value>) -> Self {
        Self(arguments)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserializes the arguments into a handler-specific struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|error| ToolError::InvalidArguments(error.to_string()))
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}
