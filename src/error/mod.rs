//! Error types for toolmesh.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all toolmesh operations.
#[derive(Error, Debug)]
pub enum ToolmeshError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error ({server_id}): {message}")]
    Connection { server_id: String, message: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Malformed arguments for {tool_name}: {message}")]
    MalformedArguments { tool_name: String, message: String },

    #[error("Tool {0} call failed with empty content")]
    EmptyToolResult(String),

    #[error("Completion error: {provider}: {message}")]
    Completion { provider: String, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Structured output error: {0}")]
    StructuredOutput(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ToolmeshError {
    /// Create a connection error for a server id.
    pub fn connection(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            server_id: server_id.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool_execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Completion { .. } | Self::Api { .. } => ErrorCategory::Completion,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::ToolNotFound(_) => ErrorCategory::ToolNotFound,
            Self::ToolExecution { .. }
            | Self::MalformedArguments { .. }
            | Self::EmptyToolResult(_)
            | Self::Transport(_) => ErrorCategory::ToolExecution,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) | Self::StructuredOutput(_) => ErrorCategory::Serialization,
            Self::Io(_) | Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Connection and not-found errors escalate immediately, without retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Connection | ErrorCategory::ToolNotFound | ErrorCategory::Configuration
        )
    }

    /// Whether a failed tool call should be attempted again.
    pub fn is_retryable_tool_failure(&self) -> bool {
        !self.is_fatal()
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Completion | ErrorCategory::RateLimit | ErrorCategory::Network => {
                RecoverySuggestion::RetryWithBackoff
            }
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Connection => RecoverySuggestion::CheckServerAvailability,
            ErrorCategory::ToolNotFound => RecoverySuggestion::CheckToolCatalog,
            ErrorCategory::ToolExecution => RecoverySuggestion::CheckToolImplementation,
            ErrorCategory::Serialization | ErrorCategory::Unknown => RecoverySuggestion::Abort,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ToolmeshError>;
