//! Completion service interface and the bundled OpenAI-compatible client.

pub mod http;
pub mod openai;

use async_trait::async_trait;

use crate::error::ToolmeshError;
use crate::tools::ToolDescriptor;
use crate::types::{ConversationTurn, FinishReason, GenerationSettings, ToolCallRequest};

pub use openai::OpenAiProvider;

/// A request sent to a model provider.
///
/// `messages` starts with the system prompt, followed by the full history.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub messages: Vec<ConversationTurn>,
    pub settings: GenerationSettings,
    pub tools: Vec<ToolDescriptor>,
}

/// Response from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: Option<FinishReason>,
}

impl ProviderResponse {
    /// Terminal text answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
            finish_reason: Some(FinishReason::Stop),
        }
    }

    /// Tool-call request without text.
    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            text: None,
            tool_calls,
            finish_reason: Some(FinishReason::ToolCalls),
        }
    }

    /// The model asked for tools and named at least one.
    pub fn requests_tools(&self) -> bool {
        self.finish_reason.is_some_and(FinishReason::requests_tools) && !self.tool_calls.is_empty()
    }

    /// Assistant turn recording this response.
    pub fn to_turn(&self) -> ConversationTurn {
        ConversationTurn::assistant(self.text.clone(), self.tool_calls.clone())
    }
}

/// Core trait implemented by completion services.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &str;

    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate one completion (non-streaming).
    async fn generate_text(&self, request: &ProviderRequest)
        -> Result<ProviderResponse, ToolmeshError>;
}
