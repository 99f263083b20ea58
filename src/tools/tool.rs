//! Tool trait and closure-based function tool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::types::{ToolDescriptor, ToolParameters};
use super::validation::validate_arguments;
use crate::error::ToolmeshError;
use crate::types::ToolCallResult;

/// Core tool trait.
///
/// Implemented by [`FunctionTool`] for in-process handlers and by
/// [`RemoteTool`](super::RemoteTool) for tools routed to a tool-server.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &ToolParameters;

    /// Server that owns this tool, if it is not in-process.
    fn owner_server_id(&self) -> Option<&str> {
        None
    }

    /// Descriptor advertised to the completion service.
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema.clone(),
            owner_server_id: self.owner_server_id().map(str::to_string),
        }
    }

    /// Execute the tool with parsed arguments.
    async fn execute(&self, args: &ToolArguments) -> Result<ToolCallResult, ToolmeshError>;
}

/// Type alias for the tool handler function.
type ToolHandler = dyn Fn(ToolArguments) -> Pin<Box<dyn Future<Output = Result<ToolCallResult, ToolmeshError>> + Send>>
    + Send
    + Sync;

/// Closure-based in-process tool.
///
/// Arguments are checked against the parameter schema before the handler
/// runs; a schema violation is returned as `MalformedArguments`. Handler
/// failures are logged and turned into an `{"error": ...}` result with
/// `is_error` set, so the model can see what went wrong.
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolCallResult, ToolmeshError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Create a tool whose handler returns a JSON value, wrapped as a single
    /// JSON content item.
    pub fn from_json<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, ToolmeshError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(name, description, parameters, move |args| {
            let handler = Arc::clone(&handler);
            async move { handler(args).await.map(ToolCallResult::json) }
        })
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, args: &ToolArguments) -> Result<ToolCallResult, ToolmeshError> {
        validate_arguments(args.raw(), &self.parameters.schema).map_err(|message| {
            ToolmeshError::MalformedArguments {
                tool_name: self.name.clone(),
                message,
            }
        })?;

        match (self.handler)(args.clone()).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::error!(tool = %self.name, error = %e, "Function tool failed");
                Ok(ToolCallResult::error(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
