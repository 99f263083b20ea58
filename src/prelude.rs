//! Convenience re-exports for common use.

pub use crate::agent::{Agent, AgentConfig, ConversationMemory, InMemoryConversation};
pub use crate::config::{MeshConfig, ProviderConfig, ServerConfig, TransportConfig, TransportKind};
pub use crate::error::{Result, ToolmeshError};
pub use crate::mcp::{ConnectionRegistry, ToolAggregator, TransportFactories};
pub use crate::provider::{ModelProvider, OpenAiProvider, ProviderRequest, ProviderResponse};
pub use crate::tools::{FunctionTool, Tool, ToolArguments, ToolDescriptor, ToolParameters};
pub use crate::types::{
    ContentItem, ConversationTurn, FinishReason, GenerationSettings, Role, ToolCallRequest,
    ToolCallResult,
};
pub use crate::util::retry::RetryPolicy;
