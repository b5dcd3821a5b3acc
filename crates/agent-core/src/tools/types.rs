use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Tool call in the OpenAI-compatible wire shape (arguments as a JSON string).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A model's request to invoke one tool.
///
/// Identity is the `id`: two requests in the same round are distinct even
/// when `name` and `arguments` are identical.
///
/// When the model's argument text does not parse, `arguments` is empty and
/// `argument_error` says why. Such a call is still part of the round; it is
/// answered with an `invalid_arguments` result instead of being invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_error: Option<String>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            argument_error: None,
        }
    }

    /// Builds a request from the raw argument text sent by the model.
    pub fn from_raw_arguments(id: impl Into<String>, name: impl Into<String>, raw: &str) -> Self {
        match parse_tool_args(raw) {
            Ok(arguments) => Self::new(id, name, arguments),
            Err(reason) => Self {
                argument_error: Some(reason),
                ..Self::new(id, name, Map::new())
            },
        }
    }

    /// Builds a request from a `json!({...})` literal. Non-object values yield empty arguments.
    pub fn with_json(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, name, arguments)
    }

    pub fn to_wire(&self) -> ToolCall {
        ToolCall {
            id: self.id.clone(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: self.name.clone(),
                arguments: Value::Object(self.arguments.clone()).to_string(),
            },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolCallParseError {
    #[error("tool call '{id}' has no function name")]
    MissingName { id: String },
}

/// Parses the raw argument string of a wire tool call into a JSON object.
///
/// Blank input is treated as "no arguments".
pub fn parse_tool_args(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(error) => Err(error.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl TryFrom<ToolCall> for ToolCallRequest {
    type Error = ToolCallParseError;

    fn try_from(call: ToolCall) -> Result<Self, Self::Error> {
        let ToolCall { id, function, .. } = call;

        if function.name.trim().is_empty() {
            return Err(ToolCallParseError::MissingName { id });
        }

        Ok(Self::from_raw_arguments(id, function.name, &function.arguments))
    }
}
