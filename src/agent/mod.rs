//! Agent system: multi-turn conversations with tool execution.

#[allow(clippy::module_inception)]
pub mod agent;
pub mod conversation;

pub use agent::{Agent, AgentConfig};
pub use conversation::{ConversationMemory, InMemoryConversation};
