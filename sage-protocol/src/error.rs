//! Error types for each protocol boundary.

use thiserror::Error;

/// Errors from the durable message broker.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Publish failed after the single reconnect-and-retry.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// A delivery could not be decoded as a valid envelope/message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the saga state store.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// No record exists for the given saga id.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the capability registry (service or client).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry is unreachable.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// The registry rejected the request.
    #[error("registry rejected request: {0}")]
    Rejected(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the tool-call runtime. These never escape a tool binding —
/// they are converted to an in-band `"Error: <reason>"` string for the
/// agent loop. The type exists so internal layers can distinguish and log.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolRuntimeError {
    /// The tool name is not present in the cached tool map.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The provider transport timed out.
    #[error("MCP call timed out")]
    Timeout,

    /// The provider transport returned an error.
    #[error("tool transport error: {0}")]
    Transport(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors a step worker can produce. Most of these terminate the saga
/// with an `error` state rather than propagating to a caller.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The LLM determined the question cannot be answered from available
    /// data. Not a bug — a terminal saga outcome.
    #[error("out of scope: {0}")]
    OutOfScope(String),

    /// An error from the LLM provider.
    #[error("model error: {0}")]
    Model(String),

    /// Uncaught failure in step logic.
    #[error("step failure: {0}")]
    StepFailure(String),

    /// A broker error propagated through a worker.
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    /// A state-store error propagated through a worker.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Hook errors. These are logged but do NOT halt the worker
/// (use [`crate::hook::HookAction::Halt`] to halt).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook execution failed.
    #[error("hook failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
