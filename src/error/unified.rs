//! Error classification used by retry predicates and callers.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Completion service request failed.
    Completion,
    Authentication,
    RateLimit,
    Network,
    /// Tool-server could not be reached after bounded reconnects.
    Connection,
    /// Requested tool is not in any catalog.
    ToolNotFound,
    /// Tool invocation failed, returned empty content or had bad arguments.
    ToolExecution,
    Configuration,
    Serialization,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    CheckServerAvailability,
    CheckToolCatalog,
    CheckToolImplementation,
    Abort,
}
