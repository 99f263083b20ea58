//! Tool-server connections, transports and catalog aggregation.

pub mod aggregate;
#[cfg(feature = "mcp")]
pub mod client;
pub mod registry;
pub mod schema;
pub mod transport;

pub use aggregate::ToolAggregator;
#[cfg(feature = "mcp")]
pub use client::RmcpClient;
pub use registry::{ConnectionRegistry, ConnectionStatus, Launch, ServerConnection};
pub use schema::{McpToolSchema, ServerTools};
pub use transport::{ToolServerClient, TransportFactories, TransportFactory};
