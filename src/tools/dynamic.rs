//! Tools discovered at runtime from tool-servers.

use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::tool::Tool;
use super::types::{ToolDescriptor, ToolParameters};
use crate::error::ToolmeshError;
use crate::mcp::ToolAggregator;
use crate::types::ToolCallResult;

/// Exposes an aggregated tool-server tool through the [`Tool`] trait.
pub struct RemoteTool {
    descriptor: ToolDescriptor,
    parameters: ToolParameters,
    aggregator: Arc<ToolAggregator>,
}

impl RemoteTool {
    pub fn new(descriptor: ToolDescriptor, aggregator: Arc<ToolAggregator>) -> Self {
        let parameters = ToolParameters::from_schema(descriptor.parameters.clone());
        Self {
            descriptor,
            parameters,
            aggregator,
        }
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn owner_server_id(&self) -> Option<&str> {
        self.descriptor.owner_server_id.as_deref()
    }

    async fn execute(&self, args: &ToolArguments) -> Result<ToolCallResult, ToolmeshError> {
        self.aggregator
            .execute_tool(&self.descriptor.name, args.raw().clone())
            .await
    }
}

impl std::fmt::Debug for RemoteTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTool")
            .field("name", &self.descriptor.name)
            .field("owner_server_id", &self.descriptor.owner_server_id)
            .finish()
    }
}
