//! rmcp-backed [`ToolServerClient`].

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, CallToolResult, Content, JsonObject, ResourceContents},
    service::{ClientInitializeError, DynService, Peer, RoleClient, RunningService, ServiceError},
};
use tokio::sync::Mutex;

use super::schema::McpToolSchema;
use super::transport::ToolServerClient;
use crate::error::ToolmeshError;
use crate::types::{ContentItem, ToolCallResult};

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type McpRunningService = RunningService<RoleClient, DynClientService>;

/// Client for one tool-server session.
///
/// Requests go through the session's [`Peer`]; the running service itself is
/// kept only so [`close`](ToolServerClient::close) can cancel it.
pub struct RmcpClient {
    server_id: String,
    peer: Peer<RoleClient>,
    session: Mutex<Option<McpRunningService>>,
    closed: AtomicBool,
}

impl RmcpClient {
    /// Wrap an initialized rmcp session.
    pub fn from_running_service(server_id: impl Into<String>, session: McpRunningService) -> Self {
        Self {
            server_id: server_id.into(),
            peer: session.peer().clone(),
            session: Mutex::new(Some(session)),
            closed: AtomicBool::new(false),
        }
    }

    /// Convert an rmcp initialization result into a client.
    pub fn from_running_service_result(
        server_id: &str,
        result: Result<McpRunningService, ClientInitializeError>,
    ) -> Result<Self, ToolmeshError> {
        result
            .map(|session| Self::from_running_service(server_id, session))
            .map_err(|e| map_client_initialize_error(server_id, e))
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    fn ensure_open(&self) -> Result<(), ToolmeshError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ToolmeshError::Transport(format!(
                "{}: session is closed",
                self.server_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ToolServerClient for RmcpClient {
    async fn list_tools(&self) -> Result<Vec<McpToolSchema>, ToolmeshError> {
        self.ensure_open()?;

        let tools = match self.peer.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                let page = self
                    .peer
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error("list_tools", e))?;
                page.tools
            }
            Err(e) => return Err(map_service_error("list_tools", e)),
        };

        Ok(tools.into_iter().map(map_mcp_tool_schema).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, ToolmeshError> {
        self.ensure_open()?;
        let arguments = coerce_tool_arguments(name, arguments)?;

        let result = self
            .peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| map_service_error("call_tool", e))?;

        Ok(map_call_result(result))
    }

    async fn close(&self) -> Result<(), ToolmeshError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        session.cancel().await.map_err(|e| {
            ToolmeshError::Transport(format!("{}: failed to stop session: {e}", self.server_id))
        })?;
        Ok(())
    }
}

impl std::fmt::Debug for RmcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RmcpClient")
            .field("server_id", &self.server_id)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

fn map_mcp_tool_schema(tool: rmcp::model::Tool) -> McpToolSchema {
    McpToolSchema {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
    }
}

fn coerce_tool_arguments(
    tool_name: &str,
    value: serde_json::Value,
) -> Result<Option<JsonObject>, ToolmeshError> {
    let malformed = |message: String| ToolmeshError::MalformedArguments {
        tool_name: tool_name.to_string(),
        message,
    };
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: serde_json::Value = serde_json::from_str(trimmed)
                .map_err(|e| malformed(format!("tool arguments must be valid JSON: {e}")))?;
            coerce_tool_arguments(tool_name, parsed)
        }
        other => Err(malformed(format!(
            "tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn map_content_item(item: &Content) -> ContentItem {
    if let Some(text) = item.as_text() {
        return ContentItem::Text {
            text: text.text.clone(),
        };
    }
    if let Some(image) = item.as_image() {
        return ContentItem::Image {
            data: image.data.clone(),
            mime_type: image.mime_type.clone(),
        };
    }
    if let Some(resource) = item.as_resource() {
        if let ResourceContents::TextResourceContents { uri, text, .. } = &resource.resource {
            return ContentItem::Resource {
                uri: uri.clone(),
                text: Some(text.clone()),
            };
        }
    }
    ContentItem::Json {
        value: serde_json::to_value(item).unwrap_or(serde_json::Value::Null),
    }
}

fn map_call_result(result: CallToolResult) -> ToolCallResult {
    let mut content = result.content.iter().map(map_content_item).collect::<Vec<_>>();
    if let Some(structured) = result.structured_content {
        content.push(ContentItem::Json { value: structured });
    }

    ToolCallResult {
        content,
        is_error: result.is_error.unwrap_or(false),
    }
}

fn map_client_initialize_error(server_id: &str, error: ClientInitializeError) -> ToolmeshError {
    let message = match error {
        ClientInitializeError::ConnectionClosed(context) => {
            format!("initialize connection closed: {context}")
        }
        ClientInitializeError::TransportError { error, context } => {
            format!("initialize transport error ({context}): {error}")
        }
        ClientInitializeError::JsonRpcError(error) => format!(
            "initialize JSON-RPC error {}: {}",
            error.code.0, error.message
        ),
        ClientInitializeError::Cancelled => "initialize cancelled".to_string(),
        other => format!("initialize error: {other}"),
    };
    ToolmeshError::connection(server_id, message)
}

fn map_service_error(context: &str, error: ServiceError) -> ToolmeshError {
    let message = match error {
        ServiceError::McpError(error) => {
            format!("{context}: MCP error {}: {}", error.code.0, error.message)
        }
        ServiceError::TransportSend(error) => format!("{context}: transport send failed: {error}"),
        ServiceError::TransportClosed => format!("{context}: transport closed"),
        ServiceError::UnexpectedResponse => format!("{context}: unexpected response"),
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            format!("{context}: request cancelled{suffix}")
        }
        ServiceError::Timeout { timeout } => {
            format!("{context}: timed out after {}ms", timeout.as_millis())
        }
        other => format!("{context}: service error: {other}"),
    };
    ToolmeshError::Transport(message)
}
