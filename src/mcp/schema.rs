//! Tool-server catalog types.

use serde::{Deserialize, Serialize};

use crate::tools::ToolDescriptor;

/// Schema for a tool exposed by a tool-server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolSchema {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
}

impl McpToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema,
        }
    }

    /// Descriptor for this tool, owned by `server_id`.
    pub fn to_descriptor(&self, server_id: &str) -> ToolDescriptor {
        ToolDescriptor::new(
            self.name.clone(),
            self.description.clone().unwrap_or_default(),
            self.input_schema.clone(),
        )
        .owned_by(server_id)
    }
}

/// One server's catalog, as returned by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerTools {
    pub server_id: String,
    pub tools: Vec<McpToolSchema>,
}
