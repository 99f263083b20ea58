//! Tool-server transport layer.
//!
//! A [`TransportFactory`] turns a [`ServerConfig`] into a live
//! [`ToolServerClient`]. Factories are looked up per [`TransportKind`] in a
//! [`TransportFactories`] table owned by the connection registry.

#[cfg(feature = "mcp")]
mod http;
#[cfg(feature = "mcp")]
mod sse;
#[cfg(feature = "mcp")]
mod stdio;
#[cfg(test)]
pub(crate) mod test_support;
#[cfg(feature = "mcp")]
mod websocket;

#[cfg(feature = "mcp")]
pub use http::StreamableHttpTransportFactory;
#[cfg(feature = "mcp")]
pub use sse::{SseTransport, SseTransportError, SseTransportFactory};
#[cfg(feature = "mcp")]
pub use stdio::StdioTransportFactory;
#[cfg(feature = "mcp")]
pub use websocket::{WebSocketTransport, WebSocketTransportFactory};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::schema::McpToolSchema;
use crate::config::{ServerConfig, TransportKind};
use crate::error::ToolmeshError;
use crate::types::ToolCallResult;

/// Connected tool-server session.
#[async_trait]
pub trait ToolServerClient: Send + Sync {
    /// List the server's tool catalog.
    async fn list_tools(&self) -> Result<Vec<McpToolSchema>, ToolmeshError>;

    /// Invoke one tool.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, ToolmeshError>;

    /// Close the session. Calls after close fail.
    async fn close(&self) -> Result<(), ToolmeshError>;
}

/// Opens sessions for one transport kind.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Connect to `config` and complete the protocol handshake.
    async fn connect(
        &self,
        server_id: &str,
        config: &ServerConfig,
    ) -> Result<Arc<dyn ToolServerClient>, ToolmeshError>;
}

/// Transport factories keyed by transport kind.
#[derive(Clone, Default)]
pub struct TransportFactories {
    factories: HashMap<TransportKind, Arc<dyn TransportFactory>>,
}

impl TransportFactories {
    /// Empty table; register factories explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the rmcp-backed stdio, WebSocket, SSE and HTTP factories.
    #[cfg(feature = "mcp")]
    pub fn with_default_transports() -> Self {
        Self::new()
            .with(TransportKind::Stdio, Arc::new(StdioTransportFactory))
            .with(TransportKind::Websocket, Arc::new(WebSocketTransportFactory))
            .with(TransportKind::Sse, Arc::new(SseTransportFactory))
            .with(TransportKind::Http, Arc::new(StreamableHttpTransportFactory))
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register(&mut self, kind: TransportKind, factory: Arc<dyn TransportFactory>) {
        self.factories.insert(kind, factory);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, kind: TransportKind, factory: Arc<dyn TransportFactory>) -> Self {
        self.register(kind, factory);
        self
    }

    pub fn get(&self, kind: TransportKind) -> Option<Arc<dyn TransportFactory>> {
        self.factories.get(&kind).cloned()
    }

    pub fn supports(&self, kind: TransportKind) -> bool {
        self.factories.contains_key(&kind)
    }
}

impl std::fmt::Debug for TransportFactories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds = self.factories.keys().map(ToString::to_string).collect::<Vec<_>>();
        kinds.sort();
        f.debug_struct("TransportFactories")
            .field("kinds", &kinds)
            .finish()
    }
}
