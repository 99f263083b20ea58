//! toolmesh: an agent tool-use loop over aggregated MCP tool-servers.
//!
//! Tool-servers reachable over stdio, WebSocket, SSE or streamable HTTP are
//! launched through a shared [`ConnectionRegistry`](mcp::ConnectionRegistry),
//! merged into one tool namespace by a [`ToolAggregator`](mcp::ToolAggregator)
//! and driven by an [`Agent`](agent::Agent) that asks a completion service
//! for tool calls until it produces a final answer.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use toolmesh::prelude::*;
//!
//! # async fn example() -> toolmesh::error::Result<()> {
//! let registry = Arc::new(ConnectionRegistry::with_default_transports());
//! let llm = Arc::new(OpenAiProvider::from_config("gpt-4o-mini", &ProviderConfig::from_env())?);
//!
//! let config = AgentConfig::builder()
//!     .name("research assistant")
//!     .description("You answer questions using the available tools.")
//!     .server_configs(vec![ServerConfig::stdio(
//!         "fs",
//!         "npx",
//!         vec!["-y".into(), "@modelcontextprotocol/server-filesystem".into(), ".".into()],
//!     )])
//!     .llm(llm)
//!     .build();
//!
//! let mut agent = Agent::initialize(config, registry).await?;
//! println!("{}", agent.generate_str("List the files here", None).await?);
//! agent.close().await;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod mcp;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;
