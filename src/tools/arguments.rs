//! Typed access to tool call arguments.

use crate::error::ToolmeshError;

/// Wrapper around tool call arguments providing typed extraction.
///
/// Always holds a JSON object; build it with [`ToolArguments::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    tool_name: String,
    value: serde_json::Value,
}

impl ToolArguments {
    /// Parse model-supplied arguments for `tool_name`.
    ///
    /// Accepts a JSON object or the raw text of one. Null and blank text
    /// become `{}`. Anything else is [`ToolmeshError::MalformedArguments`].
    pub fn parse(tool_name: &str, raw: &serde_json::Value) -> Result<Self, ToolmeshError> {
        let malformed = |message: String| ToolmeshError::MalformedArguments {
            tool_name: tool_name.to_string(),
            message,
        };

        let value = match raw {
            serde_json::Value::Null => serde_json::json!({}),
            serde_json::Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str::<serde_json::Value>(trimmed)
                        .map_err(|e| malformed(format!("invalid JSON: {e}")))?
                }
            }
            other => other.clone(),
        };

        if !value.is_object() {
            return Err(malformed(format!(
                "expected a JSON object, got {}",
                super::validation::json_type_name(&value)
            )));
        }

        Ok(Self {
            tool_name: tool_name.to_string(),
            value,
        })
    }

    /// Tool these arguments were parsed for.
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn into_value(self) -> serde_json::Value {
        self.value
    }

    fn missing(&self, kind: &str, key: &str) -> ToolmeshError {
        ToolmeshError::MalformedArguments {
            tool_name: self.tool_name.clone(),
            message: format!("Missing {kind} argument: {key}"),
        }
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, ToolmeshError> {
        self.get_str_opt(key)
            .ok_or_else(|| self.missing("string", key))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, ToolmeshError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| self.missing("integer", key))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, ToolmeshError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| self.missing("boolean", key))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, ToolmeshError> {
        serde_json::from_value(self.value.clone()).map_err(|e| ToolmeshError::MalformedArguments {
            tool_name: self.tool_name.clone(),
            message: format!("Failed to deserialize arguments: {e}"),
        })
    }
}
